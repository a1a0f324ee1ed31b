//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! This module provides concrete implementations of the repository traits
//! defined in the domain layer. Each repository handles data access for
//! a specific entity type and reports failures as [`StoreError`].
//!
//! ## Available Repositories
//!
//! - **UserRepository** - Accounts, bookmarks and pictures
//! - **ChannelRepository** - Channels, admins, stickies and catalogs
//! - **PostRepository** - Posts and their comment ids
//! - **CommentRepository** - Comments and replies
//! - **ReleaseRepository** - Release catalog items
//! - **FeedRepository** - Feeds and subscriptions
//! - **AuthRepository** - Auth sessions
//! - **SearchRepository** - Cross-entity text search
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgUserRepository, PgChannelRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let channel_repo = PgChannelRepository::new(pool.clone());
//! }
//! ```

pub mod auth_repository;
pub mod channel_repository;
pub mod comment_repository;
pub mod feed_repository;
pub mod post_repository;
pub mod release_repository;
pub mod search_repository;
pub mod user_repository;

pub use auth_repository::PgAuthRepository;
pub use channel_repository::PgChannelRepository;
pub use comment_repository::PgCommentRepository;
pub use feed_repository::PgFeedRepository;
pub use post_repository::PgPostRepository;
pub use release_repository::PgReleaseRepository;
pub use search_repository::PgSearchRepository;
pub use user_repository::PgUserRepository;

use crate::shared::error::StoreError;

/// Classify a sqlx error: unique violations become `Conflict`,
/// foreign-key violations `MissingReference`.
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.constraint().unwrap_or("unique").to_string())
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            StoreError::MissingReference(referenced_entity(db_err.table(), db_err.constraint()))
        }
        _ => StoreError::Database(err),
    }
}

/// Name the entity a foreign-key constraint such as
/// `comments_commenter_fkey` points at.
fn referenced_entity(table: Option<&str>, constraint: Option<&str>) -> String {
    let constraint = constraint.unwrap_or_default();
    let column = table
        .and_then(|t| constraint.strip_prefix(t))
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(constraint)
        .trim_end_matches("_fkey");

    let entity = match column {
        "username" | "posted_by" | "commenter" => "user",
        "owner_username" if table == Some("feed_subscriptions") => "feed",
        "owner_username" => "user",
        "channel_username" | "channel_from" | "owner_channel" => "channel",
        "post_id" | "post_from" | "post_from_id" => "post",
        "release_id" => "release",
        "reply_to" => "comment",
        _ => "record",
    };
    entity.to_string()
}

/// `ILIKE` pattern matching `raw` as a literal substring.
pub(crate) fn like_pattern(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Map "no row affected" onto `NotFound`.
pub(crate) fn expect_affected(result: sqlx::postgres::PgQueryResult) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
