//! Application Error Types
//!
//! Three layers of errors, each a closed enum:
//!
//! - [`StoreError`]: what a repository reports back from PostgreSQL
//! - [`DomainError`]: the taxonomy every domain service returns
//! - [`AppError`]: the HTTP-facing error with Axum integration

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors raised by repository implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("referenced record missing: {0}")]
    MissingReference(String),

    /// A capped relation, such as a channel's stickied posts, is full.
    #[error("capacity of {0} reached")]
    LimitReached(String),

    #[error("storage deadline of {0}ms elapsed")]
    Timeout(u64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound => "not_found",
            StoreError::Conflict(_) => "conflict",
            StoreError::MissingReference(_) => "missing_reference",
            StoreError::LimitReached(_) => "limit_reached",
            StoreError::Timeout(_) => "timeout",
            StoreError::Database(_) => "database",
        }
    }
}

/// Error taxonomy returned by the domain services.
///
/// Client-caused members (`NotFound`, `Conflict`, `InvalidData`,
/// `StickiedPostFull`, `Unauthorized`) never trigger compensation.
/// `PersistencePartial` and `Internal` are server faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("channel already has the maximum number of stickied posts")]
    StickiedPostFull,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("some data was not persisted: {0}")]
    PersistencePartial(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidData(reason.into())
    }

    /// True for errors the caller caused.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DomainError::NotFound(_)
                | DomainError::Conflict(_)
                | DomainError::InvalidData(_)
                | DomainError::StickiedPostFull
                | DomainError::Unauthorized(_)
        )
    }

    /// Classify a storage error, naming the entity a `NotFound` refers to.
    pub fn from_store(err: StoreError, entity: &str) -> Self {
        crate::infrastructure::metrics::record_store_error(err.kind());
        match err {
            StoreError::NotFound => DomainError::NotFound(entity.to_string()),
            StoreError::Conflict(detail) => DomainError::Conflict(detail),
            StoreError::MissingReference(detail) => DomainError::NotFound(detail),
            StoreError::LimitReached(detail) => DomainError::Conflict(format!("{} is full", detail)),
            other => DomainError::Internal(other.to_string()),
        }
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::InvalidData(msg) => AppError::Validation(msg),
            DomainError::StickiedPostFull => AppError::Conflict(err.to_string()),
            DomainError::Unauthorized(msg) => AppError::Unauthorized(msg),
            DomainError::PersistencePartial(msg) | DomainError::Internal(msg) => {
                AppError::Internal(msg)
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 10003, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, 10004, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, 10005, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 10007, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
        };

        let body = ErrorResponse {
            code,
            message,
            errors: None,
        };

        (status, Json(body)).into_response()
    }
}
