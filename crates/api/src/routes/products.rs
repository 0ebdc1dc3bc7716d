//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use catalog::ProductResponse;
use common::ProductId;
use domain::{NewProduct, ProductChanges};
use serde::Deserialize;
use store::{Page, PageRequest, ProductQuery};

use crate::auth::{Caller, Role};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{AppCache, AppState, AppStore};

const DEFAULT_PAGE_SIZE: i64 = 10;
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Roles allowed to create and edit products.
const EDITORS: &[Role] = &[Role::Admin, Role::Seller];

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Query string of `GET /products`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<i32>,
}

/// GET /products: paged listing of active products with optional filters.
#[tracing::instrument(skip(state))]
pub async fn list<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<ProductResponse>>, ApiError> {
    let page = PageRequest::new(
        params.page,
        params.size,
        params.sort_by.as_deref().unwrap_or("id"),
        params.sort_dir.as_deref().unwrap_or("asc"),
    )?;
    let query = ProductQuery::from_filters(params.category.as_deref(), params.search.as_deref());

    Ok(Json(state.products.list(&query, &page).await?))
}

/// GET /products/{id}: one active product, served through the cache.
#[tracing::instrument(skip(state))]
pub async fn get<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>, ApiError> {
    Ok(Json(state.products.get_by_id(id).await?))
}

/// POST /products
#[tracing::instrument(skip(state, request))]
pub async fn create<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    ApiJson(request): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    caller.require(EDITORS)?;
    let product = state.products.create(request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id}: partial update; absent fields keep their values.
#[tracing::instrument(skip(state, changes))]
pub async fn update<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(id): Path<ProductId>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> Result<Json<ProductResponse>, ApiError> {
    caller.require(EDITORS)?;
    Ok(Json(state.products.update(id, changes).await?))
}

/// DELETE /products/{id}: soft delete.
#[tracing::instrument(skip(state))]
pub async fn remove<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /products/low-stock?threshold=N
#[tracing::instrument(skip(state))]
pub async fn low_stock<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Query(params): Query<LowStockParams>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    caller.require(EDITORS)?;
    let threshold = params.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    Ok(Json(state.products.low_stock(threshold).await?))
}

/// GET /products/out-of-stock
#[tracing::instrument(skip(state))]
pub async fn out_of_stock<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    caller.require(EDITORS)?;
    Ok(Json(state.products.out_of_stock().await?))
}
