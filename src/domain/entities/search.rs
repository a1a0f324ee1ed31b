//! Cross-entity text search.

use async_trait::async_trait;
use serde::Serialize;

use super::comment::Comment;
use super::post::PostRecord;
use super::release::Release;
use crate::domain::value_objects::Page;
use crate::shared::error::StoreError;

/// Matches of one search, each list newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub posts: Vec<PostRecord>,
    pub releases: Vec<Release>,
    pub comments: Vec<Comment>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.releases.is_empty() && self.comments.is_empty()
    }
}

/// Case-insensitive substring search straight against storage.
#[async_trait]
pub trait SearchRepository: Send + Sync {
    /// Posts whose title or content contains `pattern`.
    async fn search_posts(&self, pattern: &str, page: Page) -> Result<Vec<PostRecord>, StoreError>;

    /// Releases whose title or description contains `pattern`.
    async fn search_releases(&self, pattern: &str, page: Page) -> Result<Vec<Release>, StoreError>;

    /// Comments whose content contains `pattern`.
    async fn search_comments(&self, pattern: &str, page: Page) -> Result<Vec<Comment>, StoreError>;
}
