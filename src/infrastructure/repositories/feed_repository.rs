//! Feed Repository Implementation
//!
//! PostgreSQL implementation of the FeedRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{classify, expect_affected};
use crate::domain::{FeedRepository, FeedSorting, Page, Subscription};
use crate::shared::error::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    channel_username: String,
    subscribed_at: DateTime<Utc>,
}

/// PostgreSQL feed repository implementation.
#[derive(Clone)]
pub struct PgFeedRepository {
    pool: PgPool,
}

impl PgFeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `ORDER BY` for a feed sorting. Hot counts comments of the last day,
/// top counts all comments; ties fall back to newest first.
fn feed_order(sorting: FeedSorting) -> &'static str {
    match sorting {
        FeedSorting::New => "p.created_at DESC, p.id DESC",
        FeedSorting::Top => {
            "(SELECT COUNT(*) FROM comments c WHERE c.post_from = p.id) DESC, p.created_at DESC, p.id DESC"
        }
        FeedSorting::Hot => {
            "(SELECT COUNT(*) FROM comments c WHERE c.post_from = p.id \
             AND c.created_at > NOW() - INTERVAL '1 day') DESC, p.created_at DESC, p.id DESC"
        }
    }
}

#[async_trait]
impl FeedRepository for PgFeedRepository {
    async fn create(&self, owner: &str, sorting: FeedSorting) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO feeds (owner_username, sorting) VALUES ($1, $2)")
            .bind(owner)
            .bind(sorting.as_str())
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn sorting(&self, owner: &str) -> Result<Option<FeedSorting>, StoreError> {
        let sorting =
            sqlx::query_scalar::<_, String>("SELECT sorting FROM feeds WHERE owner_username = $1")
                .bind(owner)
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;

        Ok(sorting.map(|s| FeedSorting::from_str(&s).unwrap_or_default()))
    }

    async fn set_sorting(&self, owner: &str, sorting: FeedSorting) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE feeds SET sorting = $2 WHERE owner_username = $1")
            .bind(owner)
            .bind(sorting.as_str())
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        expect_affected(result)
    }

    async fn subscriptions(&self, owner: &str) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT channel_username, subscribed_at
            FROM feed_subscriptions
            WHERE owner_username = $1
            ORDER BY subscribed_at, channel_username
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows
            .into_iter()
            .map(|r| Subscription {
                channel_username: r.channel_username,
                subscribed_at: r.subscribed_at,
            })
            .collect())
    }

    async fn subscribe(&self, owner: &str, channel: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO feed_subscriptions (owner_username, channel_username) VALUES ($1, $2)",
        )
        .bind(owner)
        .bind(channel)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn unsubscribe(&self, owner: &str, channel: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "DELETE FROM feed_subscriptions WHERE owner_username = $1 AND channel_username = $2",
        )
        .bind(owner)
        .bind(channel)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        expect_affected(result)
    }

    async fn post_ids(
        &self,
        owner: &str,
        sorting: FeedSorting,
        page: Page,
    ) -> Result<Vec<i32>, StoreError> {
        sqlx::query_scalar::<_, i32>(&format!(
            r#"
            SELECT p.id
            FROM posts p
            INNER JOIN feed_subscriptions s ON s.channel_username = p.channel_from
            WHERE s.owner_username = $1
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            feed_order(sorting)
        ))
        .bind(owner)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }
}
