//! Checkout and order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use catalog::OrderResponse;
use common::OrderId;
use domain::CheckoutDetails;
use serde::Deserialize;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{AppCache, AppState, AppStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipRequest {
    pub tracking_number: String,
}

/// POST /orders: places an order from the caller's cart.
#[tracing::instrument(skip(state, details))]
pub async fn place<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    ApiJson(details): ApiJson<CheckoutDetails>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.orders.place_order(caller.user_id, details).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    Ok(Json(state.orders.list_for_user(caller.user_id).await?))
}

/// GET /orders/{id}: admins see every order, other callers only their own.
#[tracing::instrument(skip(state))]
pub async fn get<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    Ok(Json(state.orders.get(id, caller.order_owner()).await?))
}

#[tracing::instrument(skip(state))]
pub async fn confirm<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    caller.require_admin()?;
    Ok(Json(state.orders.confirm(id).await?))
}

/// POST /orders/{id}/cancel: by the owner or an admin.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    Ok(Json(state.orders.cancel(id, caller.order_owner()).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn ship<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(id): Path<OrderId>,
    ApiJson(request): ApiJson<ShipRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    caller.require_admin()?;
    Ok(Json(state.orders.ship(id, request.tracking_number).await?))
}

#[tracing::instrument(skip(state))]
pub async fn deliver<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    caller.require_admin()?;
    Ok(Json(state.orders.deliver(id).await?))
}
