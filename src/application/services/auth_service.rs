//! Authentication Service
//!
//! Issues HS256 access tokens and opaque refresh tokens, and keeps one live
//! session per user in storage and the session cache.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use super::user_service::UserService;
use crate::config::JwtSettings;
use crate::domain::{AuthRepository, AuthSession};
use crate::infrastructure::cache::Caches;
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;

/// Authentication tokens response
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
    /// Version of the signing secret
    pub kv: i32,
}

fn encode_claims(claims: &Claims, secret: &str) -> Result<String, DomainError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| DomainError::Internal(format!("Token generation failed: {}", e)))
}

fn decode_claims(token: &str, secret: &str) -> Result<Claims, DomainError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            DomainError::Unauthorized("token expired".into())
        }
        _ => DomainError::Unauthorized("invalid token".into()),
    })?;

    Ok(token_data.claims)
}

/// Hash refresh token for storage
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Authentication service trait
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and open a fresh session, replacing any other
    async fn login(&self, username: &str, password: &str) -> Result<AuthTokens, DomainError>;

    /// Exchange a refresh token for a new token pair. The old pair stops
    /// working.
    async fn refresh(&self, username: &str, refresh_token: &str) -> Result<AuthTokens, DomainError>;

    /// End the user's session
    async fn logout(&self, username: &str) -> Result<(), DomainError>;

    /// Validate an access token and return its username.
    ///
    /// The token must be signed with the current key and belong to the
    /// user's live session.
    async fn authenticate(&self, access_token: &str) -> Result<String, DomainError>;
}

/// AuthService implementation
pub struct AuthServiceImpl {
    repo: Arc<dyn AuthRepository>,
    users: Arc<dyn UserService>,
    caches: Caches,
    deadline: Deadline,
    jwt: JwtSettings,
}

impl AuthServiceImpl {
    pub fn new(
        repo: Arc<dyn AuthRepository>,
        users: Arc<dyn UserService>,
        caches: Caches,
        deadline: Deadline,
        jwt: JwtSettings,
    ) -> Self {
        Self {
            repo,
            users,
            caches,
            deadline,
            jwt,
        }
    }

    /// The live session of a user, cache first.
    async fn session(&self, username: &str) -> Result<AuthSession, DomainError> {
        if let Some(session) = self.caches.sessions.get(username) {
            return Ok(session);
        }

        let session = self
            .deadline
            .run_as("session", self.repo.find(username))
            .await?
            .ok_or_else(|| DomainError::Unauthorized("no active session".into()))?;

        self.caches.sessions.put(username.to_string(), session.clone());
        Ok(session)
    }

    async fn issue(&self, username: &str) -> Result<AuthTokens, DomainError> {
        let now = Utc::now();
        let access_expiry = now + Duration::minutes(self.jwt.access_token_expiry_minutes);
        let refresh_expiry = now + Duration::days(self.jwt.refresh_token_expiry_days);

        let claims = Claims {
            sub: username.to_string(),
            exp: access_expiry.timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            kv: self.jwt.key_version,
        };
        let access_token = encode_claims(&claims, &self.jwt.secret)?;

        // Opaque: carries no user data
        let refresh_token = format!(
            "{}.{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );

        let session = AuthSession {
            username: username.to_string(),
            refresh_token_hash: hash_refresh_token(&refresh_token),
            access_expires_at: access_expiry,
            refresh_expires_at: refresh_expiry,
            key_version: self.jwt.key_version,
            created_at: now,
        };
        let session = self.deadline.run_as("user", self.repo.upsert(&session)).await?;
        self.caches.sessions.put(username.to_string(), session);

        Ok(AuthTokens {
            access_token,
            refresh_token,
            expires_in: self.jwt.access_token_expiry_minutes * 60,
            token_type: "Bearer".to_string(),
        })
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<AuthTokens, DomainError> {
        let user = self.users.verify_credentials(username, password).await?;
        let tokens = self.issue(&user.username).await?;

        tracing::info!("User logged in");
        Ok(tokens)
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, username: &str, refresh_token: &str) -> Result<AuthTokens, DomainError> {
        let session = self.session(username).await?;

        if session.refresh_token_hash != hash_refresh_token(refresh_token) {
            return Err(DomainError::Unauthorized("invalid refresh token".into()));
        }
        if !session.is_active() {
            return Err(DomainError::Unauthorized("refresh token expired".into()));
        }

        self.issue(username).await
    }

    #[instrument(skip(self))]
    async fn logout(&self, username: &str) -> Result<(), DomainError> {
        self.deadline
            .run_as("session", self.repo.delete(username))
            .await?;
        self.caches.sessions.invalidate(username);

        tracing::info!("User logged out");
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<String, DomainError> {
        let claims = decode_claims(access_token, &self.jwt.secret)?;
        if claims.kv != self.jwt.key_version {
            return Err(DomainError::Unauthorized("token signed with a retired key".into()));
        }

        let session = self.session(&claims.sub).await?;
        if session.key_version != claims.kv || claims.iat < session.created_at.timestamp() {
            return Err(DomainError::Unauthorized("token has been superseded".into()));
        }

        Ok(claims.sub)
    }
}
