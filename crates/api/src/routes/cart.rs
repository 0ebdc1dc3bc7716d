//! Shopping cart endpoints for the calling user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use catalog::CartResponse;
use common::ProductId;
use serde::Deserialize;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{AppCache, AppState, AppStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

#[tracing::instrument(skip(state))]
pub async fn get<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(state.carts.get(caller.user_id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn add_item<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    ApiJson(request): ApiJson<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .add_item(caller.user_id, request.product_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

/// PUT /cart/items/{product_id}: a quantity of zero removes the line.
#[tracing::instrument(skip(state))]
pub async fn update_item<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(product_id): Path<ProductId>,
    ApiJson(request): ApiJson<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .update_quantity(caller.user_id, product_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

#[tracing::instrument(skip(state))]
pub async fn remove_item<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(
        state.carts.remove_item(caller.user_id, product_id).await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn clear<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
) -> Result<Json<CartResponse>, ApiError> {
    Ok(Json(state.carts.clear(caller.user_id).await?))
}
