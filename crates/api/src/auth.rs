//! Caller identity forwarded by the authenticating proxy.
//!
//! Authentication happens upstream; requests arrive with `X-User-Id` and
//! `X-User-Role` headers that this service trusts.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Seller,
    User,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "seller" => Some(Role::Seller),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with 403 unless the caller has one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Insufficient role for this operation".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require(&[Role::Admin])
    }

    /// Restricts order lookups to the caller's own orders unless they are an admin.
    pub fn order_owner(&self) -> Option<UserId> {
        (!self.is_admin()).then_some(self.user_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)
            .and_then(|id| id.trim().parse::<i64>().ok())
            .map(UserId::new)
            .ok_or_else(|| ApiError::Unauthorized("Missing or invalid X-User-Id".to_string()))?;

        let role = match header(parts, USER_ROLE_HEADER) {
            None => Role::User,
            Some(value) => Role::parse(value)
                .ok_or_else(|| ApiError::Unauthorized(format!("Unknown role '{value}'")))?,
        };

        Ok(Caller { user_id, role })
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}
