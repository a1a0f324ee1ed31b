//! Auth session entity and repository trait.
//!
//! Maps to the `auth_sessions` table. One live session per user;
//! logging in again replaces it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::StoreError;

/// Represents a user's authentication session.
///
/// Maps to the `auth_sessions` table:
/// - username: VARCHAR(22) PRIMARY KEY REFERENCES users(username)
/// - refresh_token_hash: VARCHAR(64) NOT NULL (SHA-256 hex)
/// - access_expires_at: TIMESTAMPTZ NOT NULL
/// - refresh_expires_at: TIMESTAMPTZ NOT NULL
/// - key_version: INTEGER NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub username: String,

    /// SHA-256 hash of the refresh token (never store raw tokens)
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,

    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,

    /// Version of the signing secret the access token was issued under
    pub key_version: i32,

    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    /// True while the refresh token can still be exchanged.
    pub fn is_active(&self) -> bool {
        self.refresh_expires_at > Utc::now()
    }

    pub fn access_expired(&self) -> bool {
        self.access_expires_at <= Utc::now()
    }
}

/// Repository trait for AuthSession data access operations.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Insert or replace the session of `session.username`.
    async fn upsert(&self, session: &AuthSession) -> Result<AuthSession, StoreError>;

    async fn find(&self, username: &str) -> Result<Option<AuthSession>, StoreError>;

    async fn delete(&self, username: &str) -> Result<(), StoreError>;
}
