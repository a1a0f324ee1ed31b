//! Release entity and repository trait.
//!
//! Maps to the `releases` table. The `official` flag is derived from
//! membership in any `channel_official_catalog`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{SearchQuery, SortKey};
use crate::shared::error::{DomainError, StoreError};
use crate::shared::validation::require_text;

/// Kind of release content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
    Image,
    #[default]
    Text,
}

impl ReleaseKind {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "image" => Self::Image,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptive metadata of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReleaseMetadata {
    pub title: String,
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub description: Option<String>,
}

/// A release published into a channel's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: i32,
    pub owner_channel: String,
    pub kind: ReleaseKind,
    pub content: String,
    pub metadata: ReleaseMetadata,
    pub official: bool,
    pub created_at: DateTime<Utc>,
}

/// Data for a new release.
#[derive(Debug, Clone, Default)]
pub struct NewRelease {
    pub owner_channel: String,
    pub kind: ReleaseKind,
    pub content: String,
    pub metadata: ReleaseMetadata,
}

impl NewRelease {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("owner_channel", &self.owner_channel)?;
        require_text("content", &self.content)?;
        require_text("title", &self.metadata.title)?;
        Ok(())
    }
}

/// Sparse update of a release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleasePatch {
    pub kind: Option<ReleaseKind>,
    pub content: Option<String>,
    pub title: Option<String>,
    pub release_date: Option<Option<DateTime<Utc>>>,
    pub genres: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
    pub description: Option<Option<String>>,
}

impl ReleasePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, release: &mut Release) -> Result<(), DomainError> {
        if let Some(kind) = self.kind {
            release.kind = kind;
        }
        if let Some(content) = &self.content {
            require_text("content", content)?;
            release.content = content.clone();
        }
        if let Some(title) = &self.title {
            require_text("title", title)?;
            release.metadata.title = title.clone();
        }
        if let Some(release_date) = self.release_date {
            release.metadata.release_date = release_date;
        }
        if let Some(genres) = &self.genres {
            release.metadata.genres = genres.clone();
        }
        if let Some(authors) = &self.authors {
            release.metadata.authors = authors.clone();
        }
        if let Some(description) = &self.description {
            release.metadata.description = description.clone();
        }
        Ok(())
    }
}

/// Sort columns for release searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseSortBy {
    CreationTime,
    Title,
    ReleaseDate,
}

impl SortKey for ReleaseSortBy {
    const DEFAULT: Self = ReleaseSortBy::CreationTime;
    const KEY_COLUMN: &'static str = "id";

    fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "title" => Some(Self::Title),
            "releasedate" => Some(Self::ReleaseDate),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::CreationTime => "created_at",
            Self::Title => "title",
            Self::ReleaseDate => "release_date",
        }
    }
}

/// Repository trait for Release data access operations.
#[async_trait]
pub trait ReleaseRepository: Send + Sync {
    /// `MissingReference` if the owner channel does not exist.
    async fn create(&self, release: &NewRelease) -> Result<Release, StoreError>;

    async fn find(&self, id: i32) -> Result<Option<Release>, StoreError>;

    async fn update(&self, release: &Release) -> Result<Release, StoreError>;

    async fn delete(&self, id: i32) -> Result<(), StoreError>;

    /// Pattern search over title and description.
    async fn search(&self, query: &SearchQuery<ReleaseSortBy>) -> Result<Vec<Release>, StoreError>;
}
