//! Feed Handlers
//!
//! A user's feed is private to them.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::application::dto::request::{ListQuery, SortingRequest};
use crate::application::dto::response::ListResponse;
use crate::domain::{Feed, Post};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::require_self;

pub async fn get_feed(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<Feed>, AppError> {
    require_self(&auth, &username)?;

    let feed = state.services.feeds.get_feed(&username).await?;
    Ok(Json(feed))
}

pub async fn set_sorting(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    Json(body): Json<SortingRequest>,
) -> Result<Json<Feed>, AppError> {
    require_self(&auth, &username)?;

    let feed = state
        .services
        .feeds
        .set_sorting(&username, body.parse()?)
        .await?;
    Ok(Json(feed))
}

pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((username, channel)): Path<(String, String)>,
) -> Result<Json<Feed>, AppError> {
    require_self(&auth, &username)?;

    let feed = state.services.feeds.subscribe(&username, &channel).await?;
    Ok(Json(feed))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((username, channel)): Path<(String, String)>,
) -> Result<Json<Feed>, AppError> {
    require_self(&auth, &username)?;

    let feed = state.services.feeds.unsubscribe(&username, &channel).await?;
    Ok(Json(feed))
}

/// Posts of the subscribed channels; `?sort=` overrides the feed's sorting
pub async fn get_feed_posts(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    require_self(&auth, &username)?;

    let posts = state
        .services
        .feeds
        .get_feed_posts(&username, query.feed_sorting(), query.page()?)
        .await?;
    Ok(Json(posts.into()))
}
