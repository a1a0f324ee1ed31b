//! Channel Service
//!
//! Channels, their admins, stickied posts, official catalog and picture.
//! Relation changes re-assemble the channel from storage and replace the
//! cached value whole.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use futures::try_join;
use tracing::instrument;

use super::post_service::{evict_post_references, PostService};
use super::release_service::ReleaseService;
use super::username_taken;
use crate::application::resolver::{assemble_channel, complete_channel, resolve_ids};
use crate::domain::{
    Channel, ChannelPatch, ChannelRecord, ChannelRepository, ChannelSortBy, NewChannel, Post,
    Release, SearchQuery, UserRepository, MAX_STICKIED_POSTS,
};
use crate::infrastructure::cache::Caches;
use crate::shared::deadline::Deadline;
use crate::shared::error::{DomainError, StoreError};

/// Channel service trait
#[async_trait]
pub trait ChannelService: Send + Sync {
    /// Create a channel owned by an existing user.
    ///
    /// The channel row is written first; if the owner row can't be written
    /// afterwards the channel is deleted again and `PersistencePartial` is
    /// returned.
    async fn add_channel(&self, new: NewChannel) -> Result<Channel, DomainError>;

    /// Get a channel, cache first
    async fn get_channel(&self, username: &str) -> Result<Channel, DomainError>;

    /// Apply a sparse update. Renaming checks the new username against
    /// users and channels.
    async fn update_channel(&self, username: &str, patch: ChannelPatch) -> Result<Channel, DomainError>;

    /// Delete a channel with its posts and releases
    async fn delete_channel(&self, username: &str) -> Result<(), DomainError>;

    /// Search channels by username or name
    async fn search_channels(
        &self,
        query: SearchQuery<ChannelSortBy>,
    ) -> Result<Vec<Channel>, DomainError>;

    // --- Admins ---
    /// Make a user an admin of the channel
    async fn add_admin(&self, username: &str, admin: &str) -> Result<Channel, DomainError>;

    /// Remove an admin. The owner can't be removed.
    async fn remove_admin(&self, username: &str, admin: &str) -> Result<Channel, DomainError>;

    /// Hand ownership to an existing admin
    async fn change_owner(&self, username: &str, new_owner: &str) -> Result<Channel, DomainError>;

    // --- Stickied posts ---
    /// Sticky one of the channel's posts. Stickying a stickied post is a
    /// no-op; a third one is `StickiedPostFull`.
    async fn sticky_post(&self, username: &str, post_id: i32) -> Result<Channel, DomainError>;

    /// Unsticky a stickied post
    async fn unsticky_post(&self, username: &str, post_id: i32) -> Result<Channel, DomainError>;

    // --- Official catalog ---
    /// List a release in the channel's official catalog, announced by one of
    /// the channel's posts.
    async fn add_official_release(
        &self,
        username: &str,
        release_id: i32,
        post_id: i32,
    ) -> Result<Channel, DomainError>;

    /// Drop a release from the official catalog
    async fn remove_official_release(&self, username: &str, release_id: i32) -> Result<Channel, DomainError>;

    // --- Picture ---
    /// Set the channel picture
    async fn add_picture(&self, username: &str, image_name: &str) -> Result<Channel, DomainError>;

    /// Remove the channel picture
    async fn remove_picture(&self, username: &str) -> Result<Channel, DomainError>;

    // --- Resolved relations ---
    /// Every post of the channel
    async fn get_channel_posts(&self, username: &str) -> Result<Vec<Post>, DomainError>;

    /// The channel's stickied posts
    async fn get_stickied_posts(&self, username: &str) -> Result<Vec<Post>, DomainError>;

    /// Every release the channel published
    async fn get_channel_releases(&self, username: &str) -> Result<Vec<Release>, DomainError>;

    /// The channel's official catalog
    async fn get_official_releases(&self, username: &str) -> Result<Vec<Release>, DomainError>;
}

/// ChannelService implementation
pub struct ChannelServiceImpl {
    repo: Arc<dyn ChannelRepository>,
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostService>,
    releases: Arc<dyn ReleaseService>,
    caches: Caches,
    deadline: Deadline,
    max_page_limit: i64,
}

impl ChannelServiceImpl {
    pub fn new(
        repo: Arc<dyn ChannelRepository>,
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostService>,
        releases: Arc<dyn ReleaseService>,
        caches: Caches,
        deadline: Deadline,
        max_page_limit: i64,
    ) -> Self {
        Self {
            repo,
            users,
            posts,
            releases,
            caches,
            deadline,
            max_page_limit,
        }
    }

    /// Re-assemble a channel from storage and replace the cached value.
    async fn refresh(&self, username: &str) -> Result<Channel, DomainError> {
        let channel = assemble_channel(self.repo.as_ref(), self.deadline, username)
            .await?
            .ok_or_else(|| DomainError::not_found("channel"))?;

        self.caches.channels.put(channel.username.clone(), channel.clone());
        Ok(channel)
    }

    async fn link_owner(&self, channel: &str, owner: &str) -> Result<(), StoreError> {
        self.deadline.run(self.repo.add_admin(channel, owner)).await?;
        self.deadline.run(self.repo.change_owner(channel, owner)).await
    }

    /// Evict every cached value that named the channel by its old username,
    /// or that held its posts or releases.
    fn evict_references(&self, old_username: &str, channel: &Channel) {
        self.caches
            .posts
            .invalidate_where(|_, p| p.channel_username == old_username);
        self.caches.releases.invalidate_where(|id, r| {
            r.owner_channel == old_username || channel.official_release_ids.contains(id)
        });
        self.caches
            .feeds
            .invalidate_where(|_, f| f.is_subscribed(old_username));
        self.caches.channels.invalidate_where(|_, c| {
            c.official_release_ids
                .iter()
                .any(|id| channel.release_ids.contains(id))
        });

        let post_ids: HashSet<i32> = channel.post_ids.iter().copied().collect();
        evict_post_references(&self.caches, &post_ids);
    }
}

#[async_trait]
impl ChannelService for ChannelServiceImpl {
    #[instrument(skip(self, new), fields(channel = %new.username, owner = %new.owner_username))]
    async fn add_channel(&self, new: NewChannel) -> Result<Channel, DomainError> {
        new.validate()?;

        let (owner_exists, taken) = try_join!(
            self.deadline.run_as("user", self.users.username_exists(&new.owner_username)),
            username_taken(self.users.as_ref(), self.repo.as_ref(), self.deadline, &new.username),
        )?;
        if !owner_exists {
            return Err(DomainError::not_found("user"));
        }
        if taken {
            return Err(DomainError::Conflict(format!(
                "username {} is already taken",
                new.username
            )));
        }

        let record = ChannelRecord {
            username: new.username,
            name: new.name,
            description: new.description,
            created_at: Utc::now(),
        };
        let record = self.deadline.run_as("channel", self.repo.create(&record)).await?;

        if let Err(err) = self.link_owner(&record.username, &new.owner_username).await {
            tracing::error!(channel = %record.username, error = %err, "Failed to store channel owner");
            if let Err(err) = self.deadline.run(self.repo.delete(&record.username)).await {
                tracing::warn!(channel = %record.username, error = %err, "Compensating delete failed");
            }
            return Err(DomainError::PersistencePartial(format!(
                "owner of channel {}",
                record.username
            )));
        }

        let channel = Channel {
            username: record.username,
            name: record.name,
            description: record.description,
            created_at: record.created_at,
            owner_username: new.owner_username.clone(),
            admin_usernames: vec![new.owner_username],
            post_ids: Vec::new(),
            stickied_post_ids: Vec::new(),
            release_ids: Vec::new(),
            official_release_ids: Vec::new(),
            picture_url: None,
        };
        self.caches.channels.put(channel.username.clone(), channel.clone());

        tracing::info!("Channel added");
        Ok(channel)
    }

    #[instrument(skip(self))]
    async fn get_channel(&self, username: &str) -> Result<Channel, DomainError> {
        if let Some(channel) = self.caches.channels.get(username) {
            return Ok(channel);
        }
        self.refresh(username).await
    }

    #[instrument(skip(self, patch))]
    async fn update_channel(&self, username: &str, patch: ChannelPatch) -> Result<Channel, DomainError> {
        let channel = self.get_channel(username).await?;
        if patch.is_empty() {
            return Ok(channel);
        }

        let mut record = channel.record();
        patch.apply_to(&mut record)?;

        let renamed = record.username != username;
        if renamed
            && username_taken(self.users.as_ref(), self.repo.as_ref(), self.deadline, &record.username)
                .await?
        {
            return Err(DomainError::Conflict(format!(
                "username {} is already taken",
                record.username
            )));
        }

        let updated = self
            .deadline
            .run_as("channel", self.repo.update(username, &record))
            .await?;
        let channel = channel.with_record(updated);

        if renamed {
            self.caches.channels.invalidate(username);
            self.evict_references(username, &channel);
            tracing::info!(from = username, to = %channel.username, "Channel renamed");
        }
        self.caches.channels.put(channel.username.clone(), channel.clone());
        Ok(channel)
    }

    #[instrument(skip(self))]
    async fn delete_channel(&self, username: &str) -> Result<(), DomainError> {
        let channel = self.get_channel(username).await?;

        self.deadline.run_as("channel", self.repo.delete(username)).await?;

        self.caches.channels.invalidate(username);
        self.evict_references(username, &channel);

        tracing::info!(channel = username, "Channel deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_channels(
        &self,
        mut query: SearchQuery<ChannelSortBy>,
    ) -> Result<Vec<Channel>, DomainError> {
        query.page = query.page.capped(self.max_page_limit);

        let records = self.deadline.run_as("channel", self.repo.search(&query)).await?;
        let channels = try_join_all(
            records
                .into_iter()
                .map(|record| complete_channel(self.repo.as_ref(), self.deadline, record)),
        )
        .await?;

        for channel in &channels {
            self.caches.channels.put(channel.username.clone(), channel.clone());
        }
        Ok(channels)
    }

    // --- Admins ---
    #[instrument(skip(self))]
    async fn add_admin(&self, username: &str, admin: &str) -> Result<Channel, DomainError> {
        let channel = self.get_channel(username).await?;
        if channel.is_admin(admin) {
            return Err(DomainError::Conflict(format!("{} is already an admin", admin)));
        }

        self.deadline
            .run_as("user", self.repo.add_admin(username, admin))
            .await?;
        self.refresh(username).await
    }

    #[instrument(skip(self))]
    async fn remove_admin(&self, username: &str, admin: &str) -> Result<Channel, DomainError> {
        let channel = self.get_channel(username).await?;
        if channel.is_owner(admin) {
            return Err(DomainError::invalid("the owner can't be removed from the admins"));
        }
        if !channel.is_admin(admin) {
            return Err(DomainError::not_found("admin"));
        }

        self.deadline
            .run_as("admin", self.repo.remove_admin(username, admin))
            .await?;
        self.refresh(username).await
    }

    #[instrument(skip(self))]
    async fn change_owner(&self, username: &str, new_owner: &str) -> Result<Channel, DomainError> {
        self.get_channel(username).await?;

        self.deadline
            .run_as("admin", self.repo.change_owner(username, new_owner))
            .await?;

        let channel = self.refresh(username).await?;
        tracing::info!(owner = %channel.owner_username, "Channel owner changed");
        Ok(channel)
    }

    // --- Stickied posts ---
    #[instrument(skip(self))]
    async fn sticky_post(&self, username: &str, post_id: i32) -> Result<Channel, DomainError> {
        let channel = self.get_channel(username).await?;
        if !channel.has_post(post_id) {
            return Err(DomainError::not_found("post"));
        }
        if channel.is_stickied(post_id) {
            return Ok(channel);
        }

        match self
            .deadline
            .run(self.repo.sticky_post(username, post_id, MAX_STICKIED_POSTS))
            .await
        {
            Ok(()) => self.refresh(username).await,
            Err(StoreError::LimitReached(_)) => {
                // The cached value may predate another request's sticky
                self.caches.channels.invalidate(username);
                Err(DomainError::StickiedPostFull)
            }
            Err(err) => Err(DomainError::from_store(err, "post")),
        }
    }

    #[instrument(skip(self))]
    async fn unsticky_post(&self, username: &str, post_id: i32) -> Result<Channel, DomainError> {
        let channel = self.get_channel(username).await?;
        if !channel.is_stickied(post_id) {
            return Err(DomainError::not_found("stickied post"));
        }

        self.deadline
            .run_as("stickied post", self.repo.unsticky_post(username, post_id))
            .await?;
        self.refresh(username).await
    }

    // --- Official catalog ---
    #[instrument(skip(self))]
    async fn add_official_release(
        &self,
        username: &str,
        release_id: i32,
        post_id: i32,
    ) -> Result<Channel, DomainError> {
        let channel = self.get_channel(username).await?;
        self.releases.get_release(release_id).await?;

        if !channel.has_post(post_id) {
            return Err(DomainError::not_found("post"));
        }
        if channel.official_release_ids.contains(&release_id) {
            return Err(DomainError::Conflict(format!(
                "release {} is already in the official catalog",
                release_id
            )));
        }

        self.deadline
            .run_as("release", self.repo.add_official_release(username, release_id, post_id))
            .await?;

        self.caches.releases.invalidate(&release_id);
        self.refresh(username).await
    }

    #[instrument(skip(self))]
    async fn remove_official_release(&self, username: &str, release_id: i32) -> Result<Channel, DomainError> {
        let channel = self.get_channel(username).await?;
        if !channel.official_release_ids.contains(&release_id) {
            return Err(DomainError::not_found("official release"));
        }

        self.deadline
            .run_as("official release", self.repo.remove_official_release(username, release_id))
            .await?;

        self.caches.releases.invalidate(&release_id);
        self.refresh(username).await
    }

    // --- Picture ---
    #[instrument(skip(self))]
    async fn add_picture(&self, username: &str, image_name: &str) -> Result<Channel, DomainError> {
        self.get_channel(username).await?;
        self.deadline
            .run_as("channel", self.repo.set_picture(username, image_name))
            .await?;
        self.refresh(username).await
    }

    #[instrument(skip(self))]
    async fn remove_picture(&self, username: &str) -> Result<Channel, DomainError> {
        let channel = self.get_channel(username).await?;
        if channel.picture_url.is_none() {
            return Err(DomainError::not_found("picture"));
        }
        self.deadline
            .run_as("channel", self.repo.remove_picture(username))
            .await?;
        self.refresh(username).await
    }

    // --- Resolved relations ---
    async fn get_channel_posts(&self, username: &str) -> Result<Vec<Post>, DomainError> {
        let channel = self.get_channel(username).await?;
        resolve_ids(&channel.post_ids, |id| self.posts.get_post(id)).await
    }

    async fn get_stickied_posts(&self, username: &str) -> Result<Vec<Post>, DomainError> {
        let channel = self.get_channel(username).await?;
        resolve_ids(&channel.stickied_post_ids, |id| self.posts.get_post(id)).await
    }

    async fn get_channel_releases(&self, username: &str) -> Result<Vec<Release>, DomainError> {
        let channel = self.get_channel(username).await?;
        resolve_ids(&channel.release_ids, |id| self.releases.get_release(id)).await
    }

    async fn get_official_releases(&self, username: &str) -> Result<Vec<Release>, DomainError> {
        let channel = self.get_channel(username).await?;
        resolve_ids(&channel.official_release_ids, |id| self.releases.get_release(id)).await
    }
}
