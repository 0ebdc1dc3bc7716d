//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use domain::{DomainError, ValidationErrors};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable caller identity on a route that needs one.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller's role does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The request body is not valid JSON for the endpoint.
    #[error("Malformed request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),

    /// A service call failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ApiError {
    /// Maps the error to its status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::InvalidBody(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Catalog(CatalogError::Conflict(msg)) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Catalog(CatalogError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Catalog(CatalogError::Domain(err)) => domain_error_to_response(err),
            ApiError::Catalog(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let mut body = serde_json::json!({
            "status": status.as_u16(),
            "error": message,
        });
        if let ApiError::Catalog(CatalogError::Domain(DomainError::Validation(errors))) = &self {
            body["fieldErrors"] = serde_json::json!(errors);
        }

        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: &DomainError) -> (StatusCode, String) {
    match err {
        DomainError::Validation(_)
        | DomainError::CategoryCycle { .. }
        | DomainError::InvalidQuantity { .. }
        | DomainError::EmptyCart => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::ItemNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::InvalidStateTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        DomainError::CorruptCategoryTree { .. } => {
            tracing::error!(error = %err, "corrupt category tree");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Catalog(CatalogError::Domain(err))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Catalog(CatalogError::from(errors))
    }
}

#[cfg(test)]
mod tests {
    use common::ProductId;
    use domain::OrderStatus;
    use store::StoreError;

    use super::*;

    fn status(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            status(CatalogError::not_found("Product", ProductId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(DomainError::invalid("sku", "bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(DomainError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(DomainError::InvalidStateTransition {
                current_status: OrderStatus::Delivered,
                action: "cancel",
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(ApiError::Unauthorized("no".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(ApiError::Forbidden("no".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(CatalogError::from(StoreError::Conflict {
                entity: "Order",
                id: 1,
                expected: "PENDING".to_string(),
                actual: "CANCELLED".to_string(),
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CatalogError::Store(StoreError::CorruptRow("x".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
