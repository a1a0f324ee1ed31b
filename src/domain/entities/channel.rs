//! Channel entity and repository trait.
//!
//! Maps to the `channels` table and its relation tables:
//! `channel_admins`, `channel_stickies`, `channel_official_catalog`,
//! `channel_pictures`. Posts and releases reference their channel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::validate_username;
use crate::domain::value_objects::{SearchQuery, SortKey};
use crate::shared::error::{DomainError, StoreError};
use crate::shared::validation::require_text;

/// A channel may sticky at most this many posts.
pub const MAX_STICKIED_POSTS: usize = 2;

/// A channel: a named publisher of posts and releases.
///
/// Holds identifiers only; posts and releases are resolved on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Username (primary key, unique across users and channels)
    pub username: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,

    /// Exactly one owner, always also an admin
    pub owner_username: String,
    pub admin_usernames: Vec<String>,

    /// Posts in storage order
    pub post_ids: Vec<i32>,
    /// At most [`MAX_STICKIED_POSTS`]
    pub stickied_post_ids: Vec<i32>,
    /// Unofficial catalog (releases owned by this channel)
    pub release_ids: Vec<i32>,
    pub official_release_ids: Vec<i32>,

    pub picture_url: Option<String>,
}

impl Channel {
    pub fn is_admin(&self, username: &str) -> bool {
        self.admin_usernames.iter().any(|a| a == username)
    }

    pub fn is_owner(&self, username: &str) -> bool {
        self.owner_username == username
    }

    pub fn has_post(&self, post_id: i32) -> bool {
        self.post_ids.contains(&post_id)
    }

    pub fn is_stickied(&self, post_id: i32) -> bool {
        self.stickied_post_ids.contains(&post_id)
    }

    pub fn stickied_full(&self) -> bool {
        self.stickied_post_ids.len() >= MAX_STICKIED_POSTS
    }

    /// The base row of this channel.
    pub fn record(&self) -> ChannelRecord {
        ChannelRecord {
            username: self.username.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
        }
    }

    /// Replace base fields, keeping relations.
    pub fn with_record(mut self, record: ChannelRecord) -> Self {
        self.username = record.username;
        self.name = record.name;
        self.description = record.description;
        self.created_at = record.created_at;
        self
    }
}

/// Row of the `channels` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub username: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data for a new channel.
#[derive(Debug, Clone, Default)]
pub struct NewChannel {
    pub username: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_username: String,
}

impl NewChannel {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_username(&self.username)?;
        require_text("name", &self.name)?;
        require_text("owner_username", &self.owner_username)?;
        Ok(())
    }
}

/// Sparse update of a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelPatch {
    pub username: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl ChannelPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, record: &mut ChannelRecord) -> Result<(), DomainError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
            record.username = username.clone();
        }
        if let Some(name) = &self.name {
            require_text("name", name)?;
            record.name = name.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        Ok(())
    }
}

/// Sort columns for channel searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSortBy {
    CreationTime,
    Username,
    Name,
}

impl SortKey for ChannelSortBy {
    const DEFAULT: Self = ChannelSortBy::CreationTime;
    const KEY_COLUMN: &'static str = "username";

    fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "username" => Some(Self::Username),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::CreationTime => "created_at",
            Self::Username => "username",
            Self::Name => "name",
        }
    }
}

/// Repository trait for Channel data access operations.
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Insert the channel row only; admin and owner rows are separate writes.
    async fn create(&self, channel: &ChannelRecord) -> Result<ChannelRecord, StoreError>;

    async fn find(&self, username: &str) -> Result<Option<ChannelRecord>, StoreError>;

    /// Overwrite the row currently stored under `username` (which may rename it).
    async fn update(&self, username: &str, channel: &ChannelRecord) -> Result<ChannelRecord, StoreError>;

    /// Delete a channel; posts, releases and relation rows cascade.
    async fn delete(&self, username: &str) -> Result<(), StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    // --- Admins ---

    async fn admins(&self, channel: &str) -> Result<Vec<String>, StoreError>;

    async fn owner(&self, channel: &str) -> Result<Option<String>, StoreError>;

    /// `MissingReference` if the user is unknown, `Conflict` if already an admin.
    async fn add_admin(&self, channel: &str, admin: &str) -> Result<(), StoreError>;

    async fn remove_admin(&self, channel: &str, admin: &str) -> Result<(), StoreError>;

    /// Flag `owner` as the only owner. `NotFound` if `owner` is not an admin.
    async fn change_owner(&self, channel: &str, owner: &str) -> Result<(), StoreError>;

    /// Channels the user owns, by username.
    async fn owned_by(&self, username: &str) -> Result<Vec<String>, StoreError>;

    // --- Posts ---

    async fn post_ids(&self, channel: &str) -> Result<Vec<i32>, StoreError>;

    async fn stickied_post_ids(&self, channel: &str) -> Result<Vec<i32>, StoreError>;

    /// Sticky a post; stickying it again is a no-op. The count check and
    /// the insert are one atomic step: `LimitReached` once the channel
    /// already has `max` stickied posts.
    async fn sticky_post(&self, channel: &str, post_id: i32, max: usize) -> Result<(), StoreError>;

    async fn unsticky_post(&self, channel: &str, post_id: i32) -> Result<(), StoreError>;

    // --- Releases ---

    async fn release_ids(&self, channel: &str) -> Result<Vec<i32>, StoreError>;

    async fn official_release_ids(&self, channel: &str) -> Result<Vec<i32>, StoreError>;

    /// `Conflict` if the release is already in the official catalog.
    async fn add_official_release(
        &self,
        channel: &str,
        release_id: i32,
        post_id: i32,
    ) -> Result<(), StoreError>;

    async fn remove_official_release(&self, channel: &str, release_id: i32) -> Result<(), StoreError>;

    // --- Picture ---

    async fn picture(&self, channel: &str) -> Result<Option<String>, StoreError>;

    async fn set_picture(&self, channel: &str, name: &str) -> Result<(), StoreError>;

    async fn remove_picture(&self, channel: &str) -> Result<(), StoreError>;

    /// Pattern search over username OR name.
    async fn search(&self, query: &SearchQuery<ChannelSortBy>) -> Result<Vec<ChannelRecord>, StoreError>;
}
