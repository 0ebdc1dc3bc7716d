//! Service error types.

use cache::CacheError;
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors returned by the catalog services.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested row does not exist or is inactive.
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Another request changed the row between this request's read and
    /// its write. Retrying re-reads the current state.
    #[error("{0}")]
    Conflict(String),

    /// A domain rule rejected the request.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store failed.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// The cache failed where the failure cannot be ignored.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        CatalogError::Domain(DomainError::invalid(field, message))
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CatalogError::NotFound { entity, id },
            StoreError::Rejected(err) => CatalogError::Domain(err),
            conflict @ StoreError::Conflict { .. } => CatalogError::Conflict(conflict.to_string()),
            other => CatalogError::Store(other),
        }
    }
}

impl From<domain::ValidationErrors> for CatalogError {
    fn from(errors: domain::ValidationErrors) -> Self {
        CatalogError::Domain(DomainError::Validation(errors))
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
