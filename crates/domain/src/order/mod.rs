//! Order aggregate and related types.

mod aggregate;
mod status;

pub use aggregate::{
    Address, CheckoutDetails, Order, OrderItem, OrderParts, generate_order_number,
};
pub use status::{OrderStatus, PaymentMethod, PaymentStatus, UnknownVariant};
