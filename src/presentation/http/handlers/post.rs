//! Post Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{ListQuery, UpdatePostRequest};
use crate::application::dto::response::ListResponse;
use crate::domain::{Post, PostSortBy};
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::require_admin;

pub async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let posts = state
        .services
        .posts
        .search_posts(query.to_search::<PostSortBy>()?)
        .await?;
    Ok(Json(posts.into()))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Post>, AppError> {
    let post = state.services.posts.get_post(id).await?;
    Ok(Json(post))
}

/// Edit a post; any admin of its channel may
pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let post = state.services.posts.get_post(id).await?;
    require_admin(&state, &auth, &post.channel_username).await?;

    let post = state.services.posts.update_post(id, body.into()).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let post = state.services.posts.get_post(id).await?;
    require_admin(&state, &auth, &post.channel_username).await?;

    state.services.posts.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
