//! User entity and repository trait.
//!
//! Maps to the `users`, `user_bookmarks` and `user_pictures` tables.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{SearchQuery, SortKey};
use crate::shared::error::{DomainError, StoreError};
use crate::shared::validation::require_text;

/// Bounds on username length, shared with channels.
pub const USERNAME_MIN_LEN: usize = 5;
pub const USERNAME_MAX_LEN: usize = 22;

/// Represents a user account.
///
/// Composite of the `users` row plus its bookmarks and picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Username (primary key, unique across users and channels)
    pub username: String,

    /// Email address (unique)
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,

    /// Bookmarked post id -> time of bookmarking
    pub bookmarked_posts: BTreeMap<i32, DateTime<Utc>>,

    /// Stored image name of the profile picture
    pub picture_url: Option<String>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Assemble from the base row and its relations.
    pub fn from_parts(
        record: UserRecord,
        bookmarks: Vec<(i32, DateTime<Utc>)>,
        picture_url: Option<String>,
    ) -> Self {
        Self {
            username: record.username,
            email: record.email,
            password_hash: record.password_hash,
            first_name: record.first_name,
            middle_name: record.middle_name,
            last_name: record.last_name,
            bio: record.bio,
            bookmarked_posts: bookmarks.into_iter().collect(),
            picture_url,
            created_at: record.created_at,
        }
    }

    /// The base row of this user.
    pub fn record(&self) -> UserRecord {
        UserRecord {
            username: self.username.clone(),
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            last_name: self.last_name.clone(),
            bio: self.bio.clone(),
            created_at: self.created_at,
        }
    }

    /// Replace base fields, keeping relations.
    pub fn with_record(mut self, record: UserRecord) -> Self {
        self.username = record.username;
        self.email = record.email;
        self.password_hash = record.password_hash;
        self.first_name = record.first_name;
        self.middle_name = record.middle_name;
        self.last_name = record.last_name;
        self.bio = record.bio;
        self.created_at = record.created_at;
        self
    }

    pub fn has_bookmarked(&self, post_id: i32) -> bool {
        self.bookmarked_posts.contains_key(&post_id)
    }

    /// Copy with email and bookmarks hidden, for viewers other than the user.
    pub fn public_view(&self) -> Self {
        let mut user = self.clone();
        user.email = String::new();
        user.bookmarked_posts.clear();
        user
    }
}

/// Row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data for a new user. The password is plain text until the service hashes it.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl NewUser {
    /// Required-field validation.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_username(&self.username)?;
        require_text("email", &self.email)?;
        require_text("password", &self.password)?;
        require_text("first_name", &self.first_name)?;
        Ok(())
    }
}

/// Sparse update of a user.
///
/// `None` leaves a field untouched. Nullable fields take `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every present field except the password onto `record`.
    pub fn apply_to(&self, record: &mut UserRecord) -> Result<(), DomainError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
            record.username = username.clone();
        }
        if let Some(email) = &self.email {
            require_text("email", email)?;
            record.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            require_text("first_name", first_name)?;
            record.first_name = first_name.clone();
        }
        if let Some(middle_name) = &self.middle_name {
            record.middle_name = middle_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            record.last_name = last_name.clone();
        }
        if let Some(bio) = &self.bio {
            record.bio = bio.clone();
        }
        if let Some(password) = &self.password {
            require_text("password", password)?;
        }
        Ok(())
    }
}

/// Check a username (users and channels share the rule).
pub fn validate_username(username: &str) -> Result<(), DomainError> {
    require_text("username", username)?;
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(DomainError::invalid(format!(
            "username length must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    Ok(())
}

/// Sort columns for user searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSortBy {
    CreationTime,
    Username,
    FirstName,
    LastName,
}

impl SortKey for UserSortBy {
    const DEFAULT: Self = UserSortBy::CreationTime;
    const KEY_COLUMN: &'static str = "username";

    fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "username" => Some(Self::Username),
            "firstname" => Some(Self::FirstName),
            "lastname" => Some(Self::LastName),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::CreationTime => "created_at",
            Self::Username => "username",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
        }
    }
}

/// Repository trait for User data access operations.
///
/// Defined in the domain layer; implemented by the infrastructure layer.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user row.
    async fn create(&self, user: &UserRecord) -> Result<UserRecord, StoreError>;

    /// Find the base row of a user.
    async fn find(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Overwrite the row currently stored under `username` (which may rename it).
    async fn update(&self, username: &str, user: &UserRecord) -> Result<UserRecord, StoreError>;

    /// Delete a user. Dependent rows cascade. `Conflict` while the user
    /// owns a channel.
    async fn delete(&self, username: &str) -> Result<(), StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Bookmarked posts in bookmarking order.
    async fn bookmarks(&self, username: &str) -> Result<Vec<(i32, DateTime<Utc>)>, StoreError>;

    /// Bookmark a post; bookmarking twice is a no-op.
    async fn add_bookmark(&self, username: &str, post_id: i32) -> Result<(), StoreError>;

    async fn delete_bookmark(&self, username: &str, post_id: i32) -> Result<(), StoreError>;

    async fn picture(&self, username: &str) -> Result<Option<String>, StoreError>;

    async fn set_picture(&self, username: &str, name: &str) -> Result<(), StoreError>;

    async fn remove_picture(&self, username: &str) -> Result<(), StoreError>;

    /// Pattern search over username, email and names.
    async fn search(&self, query: &SearchQuery<UserSortBy>) -> Result<Vec<UserRecord>, StoreError>;
}
