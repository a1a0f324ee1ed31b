//! Feed Service
//!
//! A user's channel subscriptions and the posts they produce.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use super::post_service::PostService;
use crate::application::resolver::{assemble_feed, resolve_ids};
use crate::domain::{ChannelRepository, Feed, FeedRepository, FeedSorting, Page, Post};
use crate::infrastructure::cache::Caches;
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;

/// Feed service trait
#[async_trait]
pub trait FeedService: Send + Sync {
    /// Get a feed, cache first
    async fn get_feed(&self, owner: &str) -> Result<Feed, DomainError>;

    /// Change the default post ordering
    async fn set_sorting(&self, owner: &str, sorting: FeedSorting) -> Result<Feed, DomainError>;

    /// Follow a channel. Following it twice is a `Conflict`.
    async fn subscribe(&self, owner: &str, channel: &str) -> Result<Feed, DomainError>;

    /// Stop following a channel
    async fn unsubscribe(&self, owner: &str, channel: &str) -> Result<Feed, DomainError>;

    /// One page of posts from the subscribed channels, ordered by `sorting`
    /// or the feed's own preference.
    async fn get_feed_posts(
        &self,
        owner: &str,
        sorting: Option<FeedSorting>,
        page: Page,
    ) -> Result<Vec<Post>, DomainError>;
}

/// FeedService implementation
pub struct FeedServiceImpl {
    repo: Arc<dyn FeedRepository>,
    channels: Arc<dyn ChannelRepository>,
    posts: Arc<dyn PostService>,
    caches: Caches,
    deadline: Deadline,
    max_page_limit: i64,
}

impl FeedServiceImpl {
    pub fn new(
        repo: Arc<dyn FeedRepository>,
        channels: Arc<dyn ChannelRepository>,
        posts: Arc<dyn PostService>,
        caches: Caches,
        deadline: Deadline,
        max_page_limit: i64,
    ) -> Self {
        Self {
            repo,
            channels,
            posts,
            caches,
            deadline,
            max_page_limit,
        }
    }

    async fn refresh(&self, owner: &str) -> Result<Feed, DomainError> {
        let feed = assemble_feed(self.repo.as_ref(), self.deadline, owner)
            .await?
            .ok_or_else(|| DomainError::not_found("feed"))?;

        self.caches.feeds.put(owner.to_string(), feed.clone());
        Ok(feed)
    }
}

#[async_trait]
impl FeedService for FeedServiceImpl {
    #[instrument(skip(self))]
    async fn get_feed(&self, owner: &str) -> Result<Feed, DomainError> {
        if let Some(feed) = self.caches.feeds.get(owner) {
            return Ok(feed);
        }
        self.refresh(owner).await
    }

    #[instrument(skip(self))]
    async fn set_sorting(&self, owner: &str, sorting: FeedSorting) -> Result<Feed, DomainError> {
        let feed = self.get_feed(owner).await?;
        if feed.sorting == sorting {
            return Ok(feed);
        }

        self.deadline
            .run_as("feed", self.repo.set_sorting(owner, sorting))
            .await?;
        self.refresh(owner).await
    }

    #[instrument(skip(self))]
    async fn subscribe(&self, owner: &str, channel: &str) -> Result<Feed, DomainError> {
        let feed = self.get_feed(owner).await?;
        if feed.is_subscribed(channel) {
            return Err(DomainError::Conflict(format!("already subscribed to {}", channel)));
        }

        if !self.caches.channels.contains(channel) {
            self.deadline
                .run_as("channel", self.channels.find(channel))
                .await?
                .ok_or_else(|| DomainError::not_found("channel"))?;
        }

        self.deadline
            .run_as("channel", self.repo.subscribe(owner, channel))
            .await?;
        self.refresh(owner).await
    }

    #[instrument(skip(self))]
    async fn unsubscribe(&self, owner: &str, channel: &str) -> Result<Feed, DomainError> {
        let feed = self.get_feed(owner).await?;
        if !feed.is_subscribed(channel) {
            return Err(DomainError::not_found("subscription"));
        }

        self.deadline
            .run_as("subscription", self.repo.unsubscribe(owner, channel))
            .await?;
        self.refresh(owner).await
    }

    #[instrument(skip(self))]
    async fn get_feed_posts(
        &self,
        owner: &str,
        sorting: Option<FeedSorting>,
        page: Page,
    ) -> Result<Vec<Post>, DomainError> {
        let feed = self.get_feed(owner).await?;
        let sorting = sorting.unwrap_or(feed.sorting);
        let page = page.capped(self.max_page_limit);

        let ids = self
            .deadline
            .run_as("feed", self.repo.post_ids(owner, sorting, page))
            .await?;
        resolve_ids(&ids, |id| self.posts.get_post(id)).await
    }
}
