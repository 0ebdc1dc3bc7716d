//! Application services for the catalog backend.
//!
//! Services are generic over the store and cache traits so the same code
//! runs against PostgreSQL and Redis in production and in-memory backends
//! in tests.

pub mod cart;
pub mod category;
pub mod error;
pub mod order;
pub mod product;
pub mod responses;

pub use cart::CartService;
pub use category::CategoryService;
pub use error::{CatalogError, Result};
pub use order::OrderService;
pub use product::ProductService;
pub use responses::{
    CartItemResponse, CartResponse, CategoryResponse, OrderItemResponse, OrderResponse,
    ProductResponse,
};
