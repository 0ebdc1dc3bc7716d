//! Category tree endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use catalog::CategoryResponse;
use common::CategoryId;
use domain::NewCategory;
use serde::Deserialize;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{AppCache, AppState, AppStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetParentRequest {
    /// New parent; `null` moves the category to the root.
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

#[tracing::instrument(skip(state))]
pub async fn list<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    Ok(Json(state.categories.list().await?))
}

#[tracing::instrument(skip(state))]
pub async fn roots<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    Ok(Json(state.categories.roots().await?))
}

#[tracing::instrument(skip(state))]
pub async fn get<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<CategoryId>,
) -> Result<Json<CategoryResponse>, ApiError> {
    Ok(Json(state.categories.get(id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn children<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    Ok(Json(state.categories.children(id).await?))
}

/// POST /categories (admin)
#[tracing::instrument(skip(state, request))]
pub async fn create<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    ApiJson(request): ApiJson<NewCategory>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    caller.require_admin()?;
    let category = state.categories.create(request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /categories/{id}/parent (admin): re-parents a category.
#[tracing::instrument(skip(state))]
pub async fn set_parent<S: AppStore, C: AppCache>(
    State(state): State<Arc<AppState<S, C>>>,
    caller: Caller,
    Path(id): Path<CategoryId>,
    ApiJson(request): ApiJson<SetParentRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    caller.require_admin()?;
    Ok(Json(state.categories.set_parent(id, request.parent_id).await?))
}
