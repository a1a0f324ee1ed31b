//! Comment Handlers
//!
//! Comments live under their post. `?sort=old` lists oldest first.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{CreateCommentRequest, ListQuery, UpdateCommentRequest};
use crate::application::dto::response::ListResponse;
use crate::domain::Comment;
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// One page of root comments of a post
pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<Comment>>, AppError> {
    let comments = state
        .services
        .comments
        .get_comments(post_id, query.comment_order(), query.page()?)
        .await?;
    Ok(Json(comments.into()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state
        .services
        .comments
        .add_comment(body.into_new_comment(post_id, auth.username))
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i32, i32)>,
) -> Result<Json<Comment>, AppError> {
    let comment = comment_of_post(&state, post_id, comment_id).await?;
    Ok(Json(comment))
}

/// One page of direct replies to a comment
pub async fn get_replies(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i32, i32)>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<Comment>>, AppError> {
    comment_of_post(&state, post_id, comment_id).await?;

    let replies = state
        .services
        .comments
        .get_replies(comment_id, query.comment_order(), query.page()?)
        .await?;
    Ok(Json(replies.into()))
}

/// Edit a comment; only its author may
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((post_id, comment_id)): Path<(i32, i32)>,
    ValidatedJson(body): ValidatedJson<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let comment = comment_of_post(&state, post_id, comment_id).await?;
    if comment.commenter != auth.username {
        return Err(AppError::Forbidden("You can only edit your own comments".into()));
    }

    let comment = state
        .services
        .comments
        .update_comment(comment_id, &body.content)
        .await?;
    Ok(Json(comment))
}

/// Delete a comment and its replies; the author or a channel admin may
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((post_id, comment_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    let comment = comment_of_post(&state, post_id, comment_id).await?;
    if comment.commenter != auth.username {
        let post = state.services.posts.get_post(post_id).await?;
        super::require_admin(&state, &auth, &post.channel_username).await?;
    }

    state.services.comments.delete_comment(comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A comment addressed through a post it doesn't belong to doesn't exist.
async fn comment_of_post(
    state: &AppState,
    post_id: i32,
    comment_id: i32,
) -> Result<Comment, AppError> {
    let comment = state.services.comments.get_comment(comment_id).await?;
    if comment.post_id != post_id {
        return Err(AppError::NotFound("comment not found".into()));
    }
    Ok(comment)
}
