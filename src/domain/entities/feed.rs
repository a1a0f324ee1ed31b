//! Feed entity and repository trait.
//!
//! Maps to the `feeds` and `feed_subscriptions` tables. Every user owns
//! exactly one feed, created alongside the user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Page;
use crate::shared::error::StoreError;

/// Ordering of posts in a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedSorting {
    /// Most commented within the last day
    Hot,
    #[default]
    New,
    /// Most commented overall
    Top,
}

impl FeedSorting {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hot" => Some(Self::Hot),
            "new" => Some(Self::New),
            "top" => Some(Self::Top),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::New => "new",
            Self::Top => "top",
        }
    }
}

/// One channel a feed follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub channel_username: String,
    pub subscribed_at: DateTime<Utc>,
}

/// A user's feed: sorting preference plus channel subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub owner_username: String,
    pub sorting: FeedSorting,
    pub subscriptions: Vec<Subscription>,
}

impl Feed {
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.iter().any(|s| s.channel_username == channel)
    }
}

/// Repository trait for Feed data access operations.
#[async_trait]
pub trait FeedRepository: Send + Sync {
    async fn create(&self, owner: &str, sorting: FeedSorting) -> Result<(), StoreError>;

    /// Sorting of the feed, `None` if the owner has no feed.
    async fn sorting(&self, owner: &str) -> Result<Option<FeedSorting>, StoreError>;

    async fn set_sorting(&self, owner: &str, sorting: FeedSorting) -> Result<(), StoreError>;

    /// Subscriptions in subscription order.
    async fn subscriptions(&self, owner: &str) -> Result<Vec<Subscription>, StoreError>;

    /// `Conflict` when already subscribed, `MissingReference` for unknown channels.
    async fn subscribe(&self, owner: &str, channel: &str) -> Result<(), StoreError>;

    async fn unsubscribe(&self, owner: &str, channel: &str) -> Result<(), StoreError>;

    /// Ids of posts from subscribed channels in feed order.
    async fn post_ids(&self, owner: &str, sorting: FeedSorting, page: Page) -> Result<Vec<i32>, StoreError>;
}
