//! Release Handlers
//!
//! Releases are created under their channel; these routes address them by id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{ListQuery, UpdateReleaseRequest};
use crate::application::dto::response::ListResponse;
use crate::domain::{Release, ReleaseSortBy};
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::require_admin;

pub async fn search_releases(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<Release>>, AppError> {
    let releases = state
        .services
        .releases
        .search_releases(query.to_search::<ReleaseSortBy>()?)
        .await?;
    Ok(Json(releases.into()))
}

pub async fn get_release(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Release>, AppError> {
    let release = state.services.releases.get_release(id).await?;
    Ok(Json(release))
}

pub async fn update_release(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateReleaseRequest>,
) -> Result<Json<Release>, AppError> {
    let release = state.services.releases.get_release(id).await?;
    require_admin(&state, &auth, &release.owner_channel).await?;

    let release = state
        .services
        .releases
        .update_release(id, body.into())
        .await?;
    Ok(Json(release))
}

pub async fn delete_release(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let release = state.services.releases.get_release(id).await?;
    require_admin(&state, &auth, &release.owner_channel).await?;

    state.services.releases.delete_release(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
