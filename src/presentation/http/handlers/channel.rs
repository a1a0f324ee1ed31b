//! Channel Handlers
//!
//! Channels, their admins, stickied posts, release catalogs and pictures.
//! Admins manage content; only the owner manages the admin list.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    CreateChannelRequest, CreatePostRequest, CreateReleaseRequest, ListQuery,
    OfficialReleaseRequest, PictureRequest, UpdateChannelRequest, UsernameRequest,
};
use crate::application::dto::response::ListResponse;
use crate::domain::{Channel, ChannelSortBy, Post, Release};
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::{require_admin, require_owner};

/// Create a channel owned by the caller
pub async fn create_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateChannelRequest>,
) -> Result<(StatusCode, Json<Channel>), AppError> {
    let channel = state
        .services
        .channels
        .add_channel(body.into_new_channel(auth.username))
        .await?;

    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn search_channels(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<Channel>>, AppError> {
    let channels = state
        .services
        .channels
        .search_channels(query.to_search::<ChannelSortBy>()?)
        .await?;
    Ok(Json(channels.into()))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Channel>, AppError> {
    let channel = state.services.channels.get_channel(&username).await?;
    Ok(Json(channel))
}

pub async fn update_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateChannelRequest>,
) -> Result<Json<Channel>, AppError> {
    require_admin(&state, &auth, &username).await?;

    let channel = state
        .services
        .channels
        .update_channel(&username, body.into())
        .await?;
    Ok(Json(channel))
}

pub async fn delete_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<StatusCode, AppError> {
    require_owner(&state, &auth, &username).await?;

    state.services.channels.delete_channel(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Admins ---

pub async fn add_admin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(body): ValidatedJson<UsernameRequest>,
) -> Result<Json<Channel>, AppError> {
    require_owner(&state, &auth, &username).await?;

    let channel = state
        .services
        .channels
        .add_admin(&username, &body.username)
        .await?;
    Ok(Json(channel))
}

pub async fn remove_admin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((username, admin)): Path<(String, String)>,
) -> Result<Json<Channel>, AppError> {
    // Admins may step down on their own
    if auth.username != admin {
        require_owner(&state, &auth, &username).await?;
    }

    let channel = state
        .services
        .channels
        .remove_admin(&username, &admin)
        .await?;
    Ok(Json(channel))
}

/// Hand the channel over to one of its admins
pub async fn change_owner(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(body): ValidatedJson<UsernameRequest>,
) -> Result<Json<Channel>, AppError> {
    require_owner(&state, &auth, &username).await?;

    let channel = state
        .services
        .channels
        .change_owner(&username, &body.username)
        .await?;
    Ok(Json(channel))
}

// --- Posts ---

pub async fn get_channel_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let posts = state.services.channels.get_channel_posts(&username).await?;
    Ok(Json(posts.into()))
}

/// Publish a post; the caller must administer the channel
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(body): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state
        .services
        .posts
        .add_post(body.into_new_post(username, auth.username))
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_stickied_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let posts = state.services.channels.get_stickied_posts(&username).await?;
    Ok(Json(posts.into()))
}

pub async fn sticky_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((username, post_id)): Path<(String, i32)>,
) -> Result<Json<Channel>, AppError> {
    require_admin(&state, &auth, &username).await?;

    let channel = state
        .services
        .channels
        .sticky_post(&username, post_id)
        .await?;
    Ok(Json(channel))
}

pub async fn unsticky_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((username, post_id)): Path<(String, i32)>,
) -> Result<Json<Channel>, AppError> {
    require_admin(&state, &auth, &username).await?;

    let channel = state
        .services
        .channels
        .unsticky_post(&username, post_id)
        .await?;
    Ok(Json(channel))
}

// --- Releases ---

pub async fn get_channel_releases(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ListResponse<Release>>, AppError> {
    let releases = state
        .services
        .channels
        .get_channel_releases(&username)
        .await?;
    Ok(Json(releases.into()))
}

pub async fn create_release(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(body): ValidatedJson<CreateReleaseRequest>,
) -> Result<(StatusCode, Json<Release>), AppError> {
    require_admin(&state, &auth, &username).await?;

    let release = state
        .services
        .releases
        .add_release(body.into_new_release(username))
        .await?;
    Ok((StatusCode::CREATED, Json(release)))
}

pub async fn get_official_releases(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ListResponse<Release>>, AppError> {
    let releases = state
        .services
        .channels
        .get_official_releases(&username)
        .await?;
    Ok(Json(releases.into()))
}

/// Mark a release official, anchored to one of the channel's posts
pub async fn add_official_release(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((username, release_id)): Path<(String, i32)>,
    Json(body): Json<OfficialReleaseRequest>,
) -> Result<Json<Channel>, AppError> {
    require_admin(&state, &auth, &username).await?;

    let channel = state
        .services
        .channels
        .add_official_release(&username, release_id, body.post_id)
        .await?;
    Ok(Json(channel))
}

pub async fn remove_official_release(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((username, release_id)): Path<(String, i32)>,
) -> Result<Json<Channel>, AppError> {
    require_admin(&state, &auth, &username).await?;

    let channel = state
        .services
        .channels
        .remove_official_release(&username, release_id)
        .await?;
    Ok(Json(channel))
}

// --- Picture ---

pub async fn set_picture(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(body): ValidatedJson<PictureRequest>,
) -> Result<Json<Channel>, AppError> {
    require_admin(&state, &auth, &username).await?;

    let channel = state
        .services
        .channels
        .add_picture(&username, &body.image_name)
        .await?;
    Ok(Json(channel))
}

pub async fn delete_picture(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<Channel>, AppError> {
    require_admin(&state, &auth, &username).await?;

    let channel = state.services.channels.remove_picture(&username).await?;
    Ok(Json(channel))
}
