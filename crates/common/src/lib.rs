//! Shared identifier types for the catalog backend.

mod types;

pub use types::{CartId, CategoryId, OrderId, ProductId, UserId};
