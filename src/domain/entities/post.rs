//! Post entity and repository trait.
//!
//! Maps to the `posts` table. Comment ids come from `comments.post_from`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{SearchQuery, SortKey};
use crate::shared::error::{DomainError, StoreError};
use crate::shared::validation::require_text;

/// A post published by a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub channel_username: String,
    /// Admin of the channel who posted it
    pub posted_by: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Every comment on the post, replies included
    pub comment_ids: Vec<i32>,
}

impl Post {
    pub fn from_parts(record: PostRecord, comment_ids: Vec<i32>) -> Self {
        Self {
            id: record.id,
            channel_username: record.channel_username,
            posted_by: record.posted_by,
            title: record.title,
            content: record.content,
            created_at: record.created_at,
            comment_ids,
        }
    }

    pub fn record(&self) -> PostRecord {
        PostRecord {
            id: self.id,
            channel_username: self.channel_username.clone(),
            posted_by: self.posted_by.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
        }
    }
}

/// Row of the `posts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i32,
    pub channel_username: String,
    pub posted_by: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Data for a new post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub channel_username: String,
    pub posted_by: String,
    pub title: String,
    pub content: String,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("channel", &self.channel_username)?;
        require_text("posted_by", &self.posted_by)?;
        require_text("title", &self.title)?;
        Ok(())
    }
}

/// Sparse update of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, record: &mut PostRecord) -> Result<(), DomainError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
            record.title = title.clone();
        }
        if let Some(content) = &self.content {
            record.content = content.clone();
        }
        Ok(())
    }
}

/// Sort columns for post searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostSortBy {
    CreationTime,
    Title,
}

impl SortKey for PostSortBy {
    const DEFAULT: Self = PostSortBy::CreationTime;
    const KEY_COLUMN: &'static str = "id";

    fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::CreationTime => "created_at",
            Self::Title => "title",
        }
    }
}

/// Repository trait for Post data access operations.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// `MissingReference` if the channel or poster does not exist.
    async fn create(&self, post: &NewPost) -> Result<PostRecord, StoreError>;

    async fn find(&self, id: i32) -> Result<Option<PostRecord>, StoreError>;

    /// Comment ids in storage order.
    async fn comment_ids(&self, id: i32) -> Result<Vec<i32>, StoreError>;

    /// Ids of the posts a user published.
    async fn ids_posted_by(&self, username: &str) -> Result<Vec<i32>, StoreError>;

    async fn update(&self, post: &PostRecord) -> Result<PostRecord, StoreError>;

    async fn delete(&self, id: i32) -> Result<(), StoreError>;

    /// Pattern search over title and content.
    async fn search(&self, query: &SearchQuery<PostSortBy>) -> Result<Vec<PostRecord>, StoreError>;
}
