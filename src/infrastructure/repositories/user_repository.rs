//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.
//! Maps between the database schema and the domain UserRecord.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{classify, expect_affected, like_pattern};
use crate::domain::{SearchQuery, UserRecord, UserRepository, UserSortBy};
use crate::shared::error::StoreError;

/// Database row representation matching the users table schema.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    middle_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain UserRecord.
    fn into_record(self) -> UserRecord {
        UserRecord {
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            bio: self.bio,
            created_at: self.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "username, email, password_hash, first_name, middle_name, last_name, bio, created_at";

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &UserRecord) -> Result<UserRecord, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, middle_name, last_name, bio)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.middle_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.into_record())
    }

    async fn find(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(|r| r.into_record()))
    }

    /// Single statement, so the whole row changes atomically.
    async fn update(&self, username: &str, user: &UserRecord) -> Result<UserRecord, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET username = $2,
                email = $3,
                password_hash = $4,
                first_name = $5,
                middle_name = $6,
                last_name = $7,
                bio = $8
            WHERE username = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.middle_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into_record())
    }

    /// Channel owners are kept: their admin rows would cascade away and
    /// leave the channel without an owner.
    async fn delete(&self, username: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE username = $1
              AND NOT EXISTS (
                  SELECT 1 FROM channel_admins WHERE username = $1 AND is_owner
              )
            "#,
        )
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 && self.username_exists(username).await? {
            return Err(StoreError::Conflict("channel_admins_owner".into()));
        }
        expect_affected(result)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn bookmarks(&self, username: &str) -> Result<Vec<(i32, DateTime<Utc>)>, StoreError> {
        sqlx::query_as::<_, (i32, DateTime<Utc>)>(
            r#"
            SELECT post_id, bookmarked_at
            FROM user_bookmarks
            WHERE username = $1
            ORDER BY bookmarked_at, post_id
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn add_bookmark(&self, username: &str, post_id: i32) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_bookmarks (username, post_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(username)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn delete_bookmark(&self, username: &str, post_id: i32) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM user_bookmarks WHERE username = $1 AND post_id = $2")
            .bind(username)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        expect_affected(result)
    }

    async fn picture(&self, username: &str) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT image_name FROM user_pictures WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn set_picture(&self, username: &str, name: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_pictures (username, image_name)
            VALUES ($1, $2)
            ON CONFLICT (username) DO UPDATE SET image_name = EXCLUDED.image_name
            "#,
        )
        .bind(username)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn remove_picture(&self, username: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM user_pictures WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn search(&self, query: &SearchQuery<UserSortBy>) -> Result<Vec<UserRecord>, StoreError> {
        let rows = if query.pattern.is_empty() {
            sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY {} LIMIT $1 OFFSET $2",
                query.order_clause()
            ))
            .bind(query.page.limit())
            .bind(query.page.offset())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, UserRow>(&format!(
                r#"
                SELECT {USER_COLUMNS} FROM users
                WHERE username ILIKE $1 OR email ILIKE $1
                   OR first_name ILIKE $1 OR last_name ILIKE $1
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
