//! Auth Session Repository Implementation
//!
//! PostgreSQL implementation of the AuthRepository trait.
//! Only SHA-256 hashes of refresh tokens are stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{classify, expect_affected};
use crate::domain::{AuthRepository, AuthSession};
use crate::shared::error::StoreError;

/// Database row representation for auth_sessions table
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    username: String,
    refresh_token_hash: String,
    access_expires_at: DateTime<Utc>,
    refresh_expires_at: DateTime<Utc>,
    key_version: i32,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for AuthSession {
    fn from(row: SessionRow) -> Self {
        AuthSession {
            username: row.username,
            refresh_token_hash: row.refresh_token_hash,
            access_expires_at: row.access_expires_at,
            refresh_expires_at: row.refresh_expires_at,
            key_version: row.key_version,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL implementation of AuthRepository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthRepository for PgAuthRepository {
    async fn upsert(&self, session: &AuthSession) -> Result<AuthSession, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO auth_sessions (
                username, refresh_token_hash, access_expires_at,
                refresh_expires_at, key_version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (username) DO UPDATE SET
                refresh_token_hash = EXCLUDED.refresh_token_hash,
                access_expires_at = EXCLUDED.access_expires_at,
                refresh_expires_at = EXCLUDED.refresh_expires_at,
                key_version = EXCLUDED.key_version,
                created_at = EXCLUDED.created_at
            RETURNING username, refresh_token_hash, access_expires_at,
                      refresh_expires_at, key_version, created_at
            "#,
        )
        .bind(&session.username)
        .bind(&session.refresh_token_hash)
        .bind(session.access_expires_at)
        .bind(session.refresh_expires_at)
        .bind(session.key_version)
        .bind(session.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.into())
    }

    async fn find(&self, username: &str) -> Result<Option<AuthSession>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT username, refresh_token_hash, access_expires_at,
                   refresh_expires_at, key_version, created_at
            FROM auth_sessions
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(Into::into))
    }

    async fn delete(&self, username: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        expect_affected(result)
    }
}
