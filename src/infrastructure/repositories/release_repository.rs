//! Release Repository Implementation
//!
//! PostgreSQL implementation of the ReleaseRepository trait. The
//! `official` flag is computed from `channel_official_catalog`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{classify, expect_affected, like_pattern};
use crate::domain::{
    NewRelease, Release, ReleaseKind, ReleaseMetadata, ReleaseRepository, ReleaseSortBy,
    SearchQuery,
};
use crate::shared::error::StoreError;

/// Database row representation matching the releases table schema.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReleaseRow {
    id: i32,
    owner_channel: String,
    kind: String,
    content: String,
    title: String,
    release_date: Option<DateTime<Utc>>,
    genres: Vec<String>,
    authors: Vec<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    official: bool,
}

impl ReleaseRow {
    pub(crate) fn into_release(self) -> Release {
        Release {
            id: self.id,
            owner_channel: self.owner_channel,
            kind: ReleaseKind::from_str(&self.kind),
            content: self.content,
            metadata: ReleaseMetadata {
                title: self.title,
                release_date: self.release_date,
                genres: self.genres,
                authors: self.authors,
                description: self.description,
            },
            official: self.official,
            created_at: self.created_at,
        }
    }
}

/// Columns of `releases r` plus the derived `official` flag.
pub(crate) const RELEASE_COLUMNS: &str = r#"
    r.id, r.owner_channel, r.kind, r.content, r.title, r.release_date,
    r.genres, r.authors, r.description, r.created_at,
    EXISTS(SELECT 1 FROM channel_official_catalog c WHERE c.release_id = r.id) AS official
"#;

/// PostgreSQL release repository implementation.
#[derive(Clone)]
pub struct PgReleaseRepository {
    pool: PgPool,
}

impl PgReleaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReleaseRepository for PgReleaseRepository {
    async fn create(&self, release: &NewRelease) -> Result<Release, StoreError> {
        let meta = &release.metadata;
        let row = sqlx::query_as::<_, ReleaseRow>(&format!(
            r#"
            INSERT INTO releases AS r
                (owner_channel, kind, content, title, release_date, genres, authors, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RELEASE_COLUMNS}
            "#
        ))
        .bind(&release.owner_channel)
        .bind(release.kind.as_str())
        .bind(&release.content)
        .bind(&meta.title)
        .bind(meta.release_date)
        .bind(&meta.genres)
        .bind(&meta.authors)
        .bind(&meta.description)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.into_release())
    }

    async fn find(&self, id: i32) -> Result<Option<Release>, StoreError> {
        let row = sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {RELEASE_COLUMNS} FROM releases r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(|r| r.into_release()))
    }

    async fn update(&self, release: &Release) -> Result<Release, StoreError> {
        let meta = &release.metadata;
        let row = sqlx::query_as::<_, ReleaseRow>(&format!(
            r#"
            UPDATE releases AS r
            SET kind = $2, content = $3, title = $4, release_date = $5,
                genres = $6, authors = $7, description = $8
            WHERE r.id = $1
            RETURNING {RELEASE_COLUMNS}
            "#
        ))
        .bind(release.id)
        .bind(release.kind.as_str())
        .bind(&release.content)
        .bind(&meta.title)
        .bind(meta.release_date)
        .bind(&meta.genres)
        .bind(&meta.authors)
        .bind(&meta.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into_release())
    }

    async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM releases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        expect_affected(result)
    }

    async fn search(&self, query: &SearchQuery<ReleaseSortBy>) -> Result<Vec<Release>, StoreError> {
        let rows = if query.pattern.is_empty() {
            sqlx::query_as::<_, ReleaseRow>(&format!(
                "SELECT {RELEASE_COLUMNS} FROM releases r ORDER BY r.{} LIMIT $1 OFFSET $2",
                query.order_clause()
            ))
            .bind(query.page.limit())
            .bind(query.page.offset())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, ReleaseRow>(&format!(
                r#"
                SELECT {RELEASE_COLUMNS} FROM releases r
                WHERE r.title ILIKE $1 OR r.description ILIKE $1
                ORDER BY r.{}
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

        Ok(rows.into_iter().map(|r| r.into_release()).collect())
    }
}
