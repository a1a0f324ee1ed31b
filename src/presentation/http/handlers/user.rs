//! User Handlers
//!
//! Accounts, bookmarks and profile pictures.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    BookmarkRequest, ListQuery, PictureRequest, RegisterRequest, UpdateUserRequest,
};
use crate::application::dto::response::{ListResponse, UserResponse};
use crate::domain::{Post, UserSortBy};
use crate::presentation::http::extractors::{MaybeAuthUser, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::require_self;

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.services.users.add_user(body.into()).await?;
    let viewer = user.username.clone();

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::for_viewer(user, Some(&viewer))),
    ))
}

/// Search users
pub async fn search_users(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<UserResponse>>, AppError> {
    let users = state
        .services
        .users
        .search_users(query.to_search::<UserSortBy>()?)
        .await?;

    let users: Vec<UserResponse> = users
        .into_iter()
        .map(|u| UserResponse::for_viewer(u, viewer.username()))
        .collect();
    Ok(Json(users.into()))
}

/// Get a user; strangers see the public profile only
pub async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.services.users.get_user(&username).await?;
    Ok(Json(UserResponse::for_viewer(user, viewer.username())))
}

/// Update the caller's own account
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    require_self(&auth, &username)?;

    let user = state.services.users.update_user(&username, body.into()).await?;
    let viewer = user.username.clone();
    Ok(Json(UserResponse::for_viewer(user, Some(&viewer))))
}

/// Delete the caller's own account
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<StatusCode, AppError> {
    require_self(&auth, &username)?;

    state.services.users.delete_user(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Posts the caller bookmarked, oldest bookmark first
pub async fn get_bookmarks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    require_self(&auth, &username)?;

    let posts = state.services.users.get_bookmarked_posts(&username).await?;
    Ok(Json(posts.into()))
}

pub async fn add_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    Json(body): Json<BookmarkRequest>,
) -> Result<Json<UserResponse>, AppError> {
    require_self(&auth, &username)?;

    let user = state
        .services
        .users
        .bookmark_post(&username, body.post_id)
        .await?;
    Ok(Json(UserResponse::for_viewer(user, Some(&auth.username))))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((username, post_id)): Path<(String, i32)>,
) -> Result<Json<UserResponse>, AppError> {
    require_self(&auth, &username)?;

    let user = state
        .services
        .users
        .delete_bookmark(&username, post_id)
        .await?;
    Ok(Json(UserResponse::for_viewer(user, Some(&auth.username))))
}

/// Set the profile picture
pub async fn set_picture(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(body): ValidatedJson<PictureRequest>,
) -> Result<Json<UserResponse>, AppError> {
    require_self(&auth, &username)?;

    let user = state
        .services
        .users
        .add_picture(&username, &body.image_name)
        .await?;
    Ok(Json(UserResponse::for_viewer(user, Some(&auth.username))))
}

pub async fn delete_picture(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    require_self(&auth, &username)?;

    let user = state.services.users.remove_picture(&username).await?;
    Ok(Json(UserResponse::for_viewer(user, Some(&auth.username))))
}
