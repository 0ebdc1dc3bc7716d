use thiserror::Error;

use common::OrderId;
use domain::{Cart, DomainError, OrderStatus, UnknownVariant};

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The row changed between the caller's read and the conditional write.
    #[error("Concurrent update of {entity} {id}: expected {expected}, found {actual}")]
    Conflict {
        entity: &'static str,
        id: i64,
        expected: String,
        actual: String,
    },

    /// A domain rule checked under the write lock rejected the change.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be mapped back to a domain type.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl StoreError {
    pub(crate) fn stale_cart(cart: &Cart, actual_version: i64) -> Self {
        StoreError::Conflict {
            entity: "Cart of user",
            id: cart.user_id().as_i64(),
            expected: format!("version {}", cart.version()),
            actual: format!("version {actual_version}"),
        }
    }

    pub(crate) fn stale_order(id: OrderId, expected: OrderStatus, actual: OrderStatus) -> Self {
        StoreError::Conflict {
            entity: "Order",
            id: id.as_i64(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self {
        StoreError::CorruptRow(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
