//! Authentication Middleware
//!
//! Bearer token validation. Tokens are checked by
//! [`AuthService::authenticate`](crate::application::services::AuthService::authenticate),
//! which also requires a live session. Requests without a token pass through
//! anonymously; handlers that need a caller extract [`AuthUser`].

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
}

/// Token of a `Bearer` authorization header, if one was sent.
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    auth_header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| Some(token.to_owned()))
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))
}

/// Authenticate the bearer token, if any. A token that is sent must be valid.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(request.headers())? {
        let username = state.services.auth.authenticate(&token).await?;
        request.extensions_mut().insert(AuthUser { username });
    }

    Ok(next.run(request).await)
}
