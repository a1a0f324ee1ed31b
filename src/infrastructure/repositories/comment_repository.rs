//! Comment Repository Implementation
//!
//! PostgreSQL implementation of the CommentRepository trait.
//! Root comments store `reply_to` as NULL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{classify, expect_affected};
use crate::domain::{Comment, CommentRepository, NewComment, Page, SortOrder};
use crate::shared::error::StoreError;

/// Database row representation matching the comments table schema.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CommentRow {
    id: i32,
    post_from: i32,
    reply_to: Option<i32>,
    commenter: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl CommentRow {
    pub(crate) fn into_comment(self) -> Comment {
        Comment {
            id: self.id,
            post_id: self.post_from,
            reply_to: self.reply_to,
            commenter: self.commenter,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

pub(crate) const COMMENT_COLUMNS: &str = "id, post_from, reply_to, commenter, content, created_at";

/// PostgreSQL comment repository implementation.
#[derive(Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn create(&self, comment: &NewComment) -> Result<Comment, StoreError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            INSERT INTO comments (post_from, reply_to, commenter, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(comment.post_id)
        .bind(comment.reply_to)
        .bind(&comment.commenter)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.into_comment())
    }

    async fn find(&self, id: i32) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(|r| r.into_comment()))
    }

    async fn update_content(&self, id: i32, content: &str) -> Result<Comment, StoreError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "UPDATE comments SET content = $2 WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into_comment())
    }

    async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        expect_affected(result)
    }

    async fn post_ids_commented_by(&self, username: &str) -> Result<Vec<i32>, StoreError> {
        sqlx::query_scalar::<_, i32>(
            "SELECT DISTINCT post_from FROM comments WHERE commenter = $1 ORDER BY post_from",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn list_for_post(
        &self,
        post_id: i32,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE post_from = $1 AND reply_to IS NULL
            ORDER BY created_at {dir}, id {dir}
            LIMIT $2 OFFSET $3
            "#,
            dir = order.as_sql()
        ))
        .bind(post_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(|r| r.into_comment()).collect())
    }

    async fn list_replies(
        &self,
        comment_id: i32,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE reply_to = $1
            ORDER BY created_at {dir}, id {dir}
            LIMIT $2 OFFSET $3
            "#,
            dir = order.as_sql()
        ))
        .bind(comment_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(|r| r.into_comment()).collect())
    }
}
