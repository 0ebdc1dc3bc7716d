//! Domain error types.

use common::{CategoryId, ProductId};
use thiserror::Error;

use crate::order::OrderStatus;
use crate::validation::ValidationErrors;

/// Errors raised by domain rules.
#[derive(Debug, Error)]
pub enum DomainError {
    /// One or more request fields violate their constraints.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The order is not in a state that allows the requested action.
    #[error("Invalid state transition: cannot {action} order with status {current_status}")]
    InvalidStateTransition {
        current_status: OrderStatus,
        action: &'static str,
    },

    /// Re-parenting would make a category its own ancestor.
    #[error("Category {category_id} cannot be placed under {parent_id}: it would create a cycle")]
    CategoryCycle {
        category_id: CategoryId,
        parent_id: CategoryId,
    },

    /// A stored parent chain never reaches a root.
    #[error("Category {category_id} has a cyclic parent chain")]
    CorruptCategoryTree { category_id: CategoryId },

    /// Item not found in a cart or order.
    #[error("Item not found: product {product_id}")]
    ItemNotFound { product_id: ProductId },

    /// Quantity must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// An order cannot be placed from an empty cart.
    #[error("Cart is empty")]
    EmptyCart,
}

impl DomainError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::Validation(ValidationErrors::single(field, message))
    }
}
