//! Authentication Handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::application::dto::request::{LoginRequest, RefreshTokenRequest};
use crate::application::dto::response::TokenResponse;
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = state
        .services
        .auth
        .login(&body.username, &body.password)
        .await?;

    Ok(Json(tokens.into()))
}

/// Exchange a refresh token for a new token pair
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = state
        .services
        .auth
        .refresh(&body.username, &body.refresh_token)
        .await?;

    Ok(Json(tokens.into()))
}

/// End the caller's session
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, AppError> {
    state.services.auth.logout(&auth.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
