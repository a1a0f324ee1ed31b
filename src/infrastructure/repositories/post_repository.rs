//! Post Repository Implementation
//!
//! PostgreSQL implementation of the PostRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{classify, expect_affected, like_pattern};
use crate::domain::{NewPost, PostRecord, PostRepository, PostSortBy, SearchQuery};
use crate::shared::error::StoreError;

/// Database row representation matching the posts table schema.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    id: i32,
    channel_from: String,
    posted_by: String,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl PostRow {
    pub(crate) fn into_record(self) -> PostRecord {
        PostRecord {
            id: self.id,
            channel_username: self.channel_from,
            posted_by: self.posted_by,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

pub(crate) const POST_COLUMNS: &str = "id, channel_from, posted_by, title, content, created_at";

/// PostgreSQL post repository implementation.
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, post: &NewPost) -> Result<PostRecord, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (channel_from, posted_by, title, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.channel_username)
        .bind(&post.posted_by)
        .bind(&post.title)
        .bind(&post.content)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.into_record())
    }

    async fn find(&self, id: i32) -> Result<Option<PostRecord>, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(|r| r.into_record()))
    }

    async fn comment_ids(&self, id: i32) -> Result<Vec<i32>, StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM comments WHERE post_from = $1 ORDER BY id")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn ids_posted_by(&self, username: &str) -> Result<Vec<i32>, StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM posts WHERE posted_by = $1 ORDER BY id")
            .bind(username)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn update(&self, post: &PostRecord) -> Result<PostRecord, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts
            SET title = $2, content = $3
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into_record())
    }

    async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        expect_affected(result)
    }

    async fn search(&self, query: &SearchQuery<PostSortBy>) -> Result<Vec<PostRecord>, StoreError> {
        let rows = if query.pattern.is_empty() {
            sqlx::query_as::<_, PostRow>(&format!(
                "SELECT {POST_COLUMNS} FROM posts ORDER BY {} LIMIT $1 OFFSET $2",
                query.order_clause()
            ))
            .bind(query.page.limit())
            .bind(query.page.offset())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, PostRow>(&format!(
                r#"
                SELECT {POST_COLUMNS} FROM posts
                WHERE title ILIKE $1 OR content ILIKE $1
                ORDER BY {}
                LIMIT $2 OFFSET $3
                "#,
                query.order_clause()
            ))
            .bind(like_pattern(&query.pattern))
            .bind(query.page.limit())
            .bind(query.page.offset())
            .fetch_all(&self.pool)
            .await
        }
        .map_err(classify)?;

        Ok(rows.into_iter().map(|r| r.into_record()).collect())
    }
}
