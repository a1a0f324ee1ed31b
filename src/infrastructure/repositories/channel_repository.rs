//! Channel Repository Implementation
//!
//! PostgreSQL implementation of the ChannelRepository trait, covering the
//! `channels` row and its relation tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{classify, expect_affected, like_pattern};
use crate::domain::{ChannelRecord, ChannelRepository, ChannelSortBy, SearchQuery};
use crate::shared::error::StoreError;

/// Database row representation matching the channels table schema.
#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    username: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl ChannelRow {
    fn into_record(self) -> ChannelRecord {
        ChannelRecord {
            username: self.username,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL channel repository implementation.
#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ids(&self, sql: &str, channel: &str) -> Result<Vec<i32>, StoreError> {
        sqlx::query_scalar::<_, i32>(sql)
            .bind(channel)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn create(&self, channel: &ChannelRecord) -> Result<ChannelRecord, StoreError> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r#"
            INSERT INTO channels (username, name, description)
            VALUES ($1, $2, $3)
            RETURNING username, name, description, created_at
            "#,
        )
        .bind(&channel.username)
        .bind(&channel.name)
        .bind(&channel.description)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.into_record())
    }

    async fn find(&self, username: &str) -> Result<Option<ChannelRecord>, StoreError> {
        let row = sqlx::query_as::<_, ChannelRow>(
            "SELECT username, name, description, created_at FROM channels WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(|r| r.into_record()))
    }

    async fn update(
        &self,
        username: &str,
        channel: &ChannelRecord,
    ) -> Result<ChannelRecord, StoreError> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r#"
            UPDATE channels
            SET username = $2, name = $3, description = $4
            WHERE username = $1
            RETURNING username, name, description, created_at
            "#,
        )
        .bind(username)
        .bind(&channel.username)
        .bind(&channel.name)
        .bind(&channel.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into_record())
    }

    async fn delete(&self, username: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM channels WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        expect_affected(result)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM channels WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    // --- Admins ---

    async fn admins(&self, channel: &str) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT username FROM channel_admins
            WHERE channel_username = $1
            ORDER BY added_at, username
            "#,
        )
        .bind(channel)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn owner(&self, channel: &str) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT username FROM channel_admins WHERE channel_username = $1 AND is_owner",
        )
        .bind(channel)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn add_admin(&self, channel: &str, admin: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO channel_admins (channel_username, username) VALUES ($1, $2)")
            .bind(channel)
            .bind(admin)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn remove_admin(&self, channel: &str, admin: &str) -> Result<(), StoreError> {
        let result =
            sqlx::query("DELETE FROM channel_admins WHERE channel_username = $1 AND username = $2")
                .bind(channel)
                .bind(admin)
                .execute(&self.pool)
                .await
                .map_err(classify)?;

        expect_affected(result)
    }

    /// One statement flips every admin row, so exactly one owner remains.
    async fn change_owner(&self, channel: &str, owner: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let is_admin = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM channel_admins WHERE channel_username = $1 AND username = $2
            )
            "#,
        )
        .bind(channel)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        if !is_admin {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE channel_admins
            SET is_owner = (username = $2)
            WHERE channel_username = $1
            "#,
        )
        .bind(channel)
        .bind(owner)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        tx.commit().await.map_err(classify)
    }

    async fn owned_by(&self, username: &str) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT channel_username FROM channel_admins
            WHERE username = $1 AND is_owner
            ORDER BY channel_username
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    // --- Posts ---

    async fn post_ids(&self, channel: &str) -> Result<Vec<i32>, StoreError> {
        self.ids("SELECT id FROM posts WHERE channel_from = $1 ORDER BY id", channel)
            .await
    }

    async fn stickied_post_ids(&self, channel: &str) -> Result<Vec<i32>, StoreError> {
        self.ids(
            r#"
            SELECT s.post_id
            FROM channel_stickies s
            INNER JOIN posts p ON p.id = s.post_id
            WHERE p.channel_from = $1
            ORDER BY s.stickied_at, s.post_id
            "#,
            channel,
        )
        .await
    }

    /// Locks the channel row so concurrent stickies serialize on the count.
    async fn sticky_post(&self, channel: &str, post_id: i32, max: usize) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        sqlx::query_scalar::<_, String>(
            "SELECT username FROM channels WHERE username = $1 FOR UPDATE",
        )
        .bind(channel)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?
        .ok_or(StoreError::NotFound)?;

        let (stickied, count) = sqlx::query_as::<_, (bool, i64)>(
            r#"
            SELECT COALESCE(BOOL_OR(s.post_id = $2), FALSE), COUNT(*)
            FROM channel_stickies s
            INNER JOIN posts p ON p.id = s.post_id
            WHERE p.channel_from = $1
            "#,
        )
        .bind(channel)
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        if stickied {
            return tx.commit().await.map_err(classify);
        }
        if count >= max as i64 {
            return Err(StoreError::LimitReached("stickied posts".into()));
        }

        sqlx::query("INSERT INTO channel_stickies (post_id) VALUES ($1)")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)
    }

    async fn unsticky_post(&self, channel: &str, post_id: i32) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM channel_stickies s
            USING posts p
            WHERE s.post_id = p.id AND p.channel_from = $1 AND s.post_id = $2
            "#,
        )
        .bind(channel)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        expect_affected(result)
    }

    // --- Releases ---

    async fn release_ids(&self, channel: &str) -> Result<Vec<i32>, StoreError> {
        self.ids("SELECT id FROM releases WHERE owner_channel = $1 ORDER BY id", channel)
            .await
    }

    async fn official_release_ids(&self, channel: &str) -> Result<Vec<i32>, StoreError> {
        self.ids(
            r#"
            SELECT release_id FROM channel_official_catalog
            WHERE channel_username = $1
            ORDER BY release_id
            "#,
            channel,
        )
        .await
    }

    async fn add_official_release(
        &self,
        channel: &str,
        release_id: i32,
        post_id: i32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO channel_official_catalog (channel_username, release_id, post_from_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(channel)
        .bind(release_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn remove_official_release(&self, channel: &str, release_id: i32) -> Result<(), StoreError> {
        let result = sqlx::query(
            "DELETE FROM channel_official_catalog WHERE channel_username = $1 AND release_id = $2",
        )
        .bind(channel)
        .bind(release_id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        expect_affected(result)
    }

    // --- Picture ---

    async fn picture(&self, channel: &str) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT image_name FROM channel_pictures WHERE channel_username = $1",
        )
        .bind(channel)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn set_picture(&self, channel: &str, name: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO channel_pictures (channel_username, image_name)
            VALUES ($1, $2)
            ON CONFLICT (channel_username) DO UPDATE SET image_name = EXCLUDED.image_name
            "#,
        )
        .bind(channel)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn remove_picture(&self, channel: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM channel_pictures WHERE channel_username = $1")
            .bind(channel)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn search(
        &self,
        query: &SearchQuery<ChannelSortBy>,
    ) -> Result<Vec<ChannelRecord>, StoreError> {
        let rows = if query.pattern.is_empty() {
            sqlx::query_as::<_, ChannelRow>(&format!(
                r#"
                SELECT username, name, description, created_at FROM channels
                ORDER BY {}
                LIMIT $1 OFFSET $2
                "#,
                query.order_clause()
            ))
            .bind(query.page.limit())
            .bind(query.page.offset())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, ChannelRow>(&format!(
                r#"
                SELECT username, name, description, created_at FROM channels
                WHERE username ILIKE $1 OR name ILIKE $1
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
