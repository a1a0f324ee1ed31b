//! Search Repository Implementation
//!
//! Case-insensitive substring search over posts, releases and comments.
//! Results are always newest first.

use async_trait::async_trait;
use sqlx::PgPool;

use super::comment_repository::{CommentRow, COMMENT_COLUMNS};
use super::post_repository::{PostRow, POST_COLUMNS};
use super::release_repository::{ReleaseRow, RELEASE_COLUMNS};
use super::{classify, like_pattern};
use crate::domain::{Comment, Page, PostRecord, Release, SearchRepository};
use crate::shared::error::StoreError;

/// PostgreSQL search repository implementation.
#[derive(Clone)]
pub struct PgSearchRepository {
    pool: PgPool,
}

impl PgSearchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchRepository for PgSearchRepository {
    async fn search_posts(&self, pattern: &str, page: Page) -> Result<Vec<PostRecord>, StoreError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE title ILIKE $1 OR content ILIKE $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(like_pattern(pattern))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(|r| r.into_record()).collect())
    }

    async fn search_releases(&self, pattern: &str, page: Page) -> Result<Vec<Release>, StoreError> {
        let rows = sqlx::query_as::<_, ReleaseRow>(&format!(
            r#"
            SELECT {RELEASE_COLUMNS} FROM releases r
            WHERE r.title ILIKE $1 OR r.description ILIKE $1
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(like_pattern(pattern))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(|r| r.into_release()).collect())
    }

    async fn search_comments(&self, pattern: &str, page: Page) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE content ILIKE $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(like_pattern(pattern))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(|r| r.into_comment()).collect())
    }
}
