//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints. Handlers check who may act;
//! the services decide what the action does.

pub mod auth;
pub mod channel;
pub mod comment;
pub mod feed;
pub mod health;
pub mod post;
pub mod release;
pub mod search;
pub mod user;

use crate::domain::Channel;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Only the account itself may act on it.
pub(crate) fn require_self(auth: &AuthUser, username: &str) -> Result<(), AppError> {
    if auth.username != username {
        return Err(AppError::Forbidden("You can only act on your own account".into()));
    }
    Ok(())
}

/// Channel the caller administers.
pub(crate) async fn require_admin(
    state: &AppState,
    auth: &AuthUser,
    channel: &str,
) -> Result<Channel, AppError> {
    let channel = state.services.channels.get_channel(channel).await?;
    if !channel.is_admin(&auth.username) {
        return Err(AppError::Forbidden("Channel admin required".into()));
    }
    Ok(channel)
}

/// Channel the caller owns.
pub(crate) async fn require_owner(
    state: &AppState,
    auth: &AuthUser,
    channel: &str,
) -> Result<Channel, AppError> {
    let channel = state.services.channels.get_channel(channel).await?;
    if !channel.is_owner(&auth.username) {
        return Err(AppError::Forbidden("Channel owner required".into()));
    }
    Ok(channel)
}
