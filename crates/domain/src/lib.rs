//! Domain layer for the catalog backend.
//!
//! This crate provides:
//! - Product and category entities with request validation
//! - The category tree with cycle-safe traversal
//! - Cart and order aggregates that recompute their totals on every mutation
//! - The order status state machine

pub mod cart;
pub mod category;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod totals;
pub mod validation;

pub use cart::{Cart, CartItem};
pub use category::{Category, CategoryTree, NewCategory, slugify};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    Address, CheckoutDetails, Order, OrderItem, OrderParts, OrderStatus, PaymentMethod,
    PaymentStatus, UnknownVariant,
};
pub use product::{NewProduct, Product, ProductChanges};
pub use totals::{CartTotals, LineItem, OrderTotals, TAX_RATE};
pub use validation::{FieldError, ValidationErrors};
