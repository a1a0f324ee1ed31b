//! Search Service
//!
//! Cross-entity text search. Always reads storage; never touches a cache.

use std::sync::Arc;

use async_trait::async_trait;
use futures::try_join;
use tracing::instrument;

use crate::domain::{Page, SearchRepository, SearchResults};
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;

/// Search service trait
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Posts, releases and comments containing `pattern`, newest first.
    /// The page applies to each list separately.
    async fn search(&self, pattern: &str, page: Page) -> Result<SearchResults, DomainError>;
}

/// SearchService implementation
pub struct SearchServiceImpl {
    repo: Arc<dyn SearchRepository>,
    deadline: Deadline,
    max_page_limit: i64,
}

impl SearchServiceImpl {
    pub fn new(repo: Arc<dyn SearchRepository>, deadline: Deadline, max_page_limit: i64) -> Self {
        Self {
            repo,
            deadline,
            max_page_limit,
        }
    }
}

#[async_trait]
impl SearchService for SearchServiceImpl {
    #[instrument(skip(self))]
    async fn search(&self, pattern: &str, page: Page) -> Result<SearchResults, DomainError> {
        let page = page.capped(self.max_page_limit);

        let (posts, releases, comments) = try_join!(
            self.deadline.run(self.repo.search_posts(pattern, page)),
            self.deadline.run(self.repo.search_releases(pattern, page)),
            self.deadline.run(self.repo.search_comments(pattern, page)),
        )
        .map_err(|e| DomainError::from_store(e, "search"))?;

        tracing::debug!(
            posts = posts.len(),
            releases = releases.len(),
            comments = comments.len(),
            "Search completed"
        );
        Ok(SearchResults {
            posts,
            releases,
            comments,
        })
    }
}
