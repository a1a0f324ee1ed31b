//! Release Service
//!
//! Releases published into a channel's catalog. Mutations evict the owner
//! channel.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::domain::{
    ChannelRepository, NewRelease, Release, ReleasePatch, ReleaseRepository, ReleaseSortBy,
    SearchQuery,
};
use crate::infrastructure::cache::Caches;
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;

/// Release service trait
#[async_trait]
pub trait ReleaseService: Send + Sync {
    /// Add a release to an existing channel
    async fn add_release(&self, new: NewRelease) -> Result<Release, DomainError>;

    /// Get a release, cache first
    async fn get_release(&self, id: i32) -> Result<Release, DomainError>;

    /// Apply a sparse update
    async fn update_release(&self, id: i32, patch: ReleasePatch) -> Result<Release, DomainError>;

    /// Delete a release; it also leaves every official catalog
    async fn delete_release(&self, id: i32) -> Result<(), DomainError>;

    /// Search releases by title or description
    async fn search_releases(&self, query: SearchQuery<ReleaseSortBy>) -> Result<Vec<Release>, DomainError>;
}

/// ReleaseService implementation
pub struct ReleaseServiceImpl {
    repo: Arc<dyn ReleaseRepository>,
    channels: Arc<dyn ChannelRepository>,
    caches: Caches,
    deadline: Deadline,
    max_page_limit: i64,
}

impl ReleaseServiceImpl {
    pub fn new(
        repo: Arc<dyn ReleaseRepository>,
        channels: Arc<dyn ChannelRepository>,
        caches: Caches,
        deadline: Deadline,
        max_page_limit: i64,
    ) -> Self {
        Self {
            repo,
            channels,
            caches,
            deadline,
            max_page_limit,
        }
    }
}

#[async_trait]
impl ReleaseService for ReleaseServiceImpl {
    #[instrument(skip(self, new), fields(owner_channel = %new.owner_channel))]
    async fn add_release(&self, new: NewRelease) -> Result<Release, DomainError> {
        new.validate()?;

        if !self.caches.channels.contains(&new.owner_channel) {
            self.deadline
                .run_as("channel", self.channels.find(&new.owner_channel))
                .await?
                .ok_or_else(|| DomainError::not_found("channel"))?;
        }

        let release = self.deadline.run_as("release", self.repo.create(&new)).await?;

        self.caches.releases.put(release.id, release.clone());
        self.caches.channels.invalidate(&release.owner_channel);

        tracing::info!(release_id = release.id, "Release added");
        Ok(release)
    }

    #[instrument(skip(self))]
    async fn get_release(&self, id: i32) -> Result<Release, DomainError> {
        if let Some(release) = self.caches.releases.get(&id) {
            return Ok(release);
        }

        let release = self
            .deadline
            .run_as("release", self.repo.find(id))
            .await?
            .ok_or_else(|| DomainError::not_found("release"))?;

        self.caches.releases.put(id, release.clone());
        Ok(release)
    }

    #[instrument(skip(self, patch))]
    async fn update_release(&self, id: i32, patch: ReleasePatch) -> Result<Release, DomainError> {
        let mut release = self.get_release(id).await?;
        if patch.is_empty() {
            return Ok(release);
        }

        patch.apply_to(&mut release)?;
        let release = self.deadline.run_as("release", self.repo.update(&release)).await?;

        self.caches.releases.put(id, release.clone());
        self.caches.channels.invalidate(&release.owner_channel);
        Ok(release)
    }

    #[instrument(skip(self))]
    async fn delete_release(&self, id: i32) -> Result<(), DomainError> {
        let release = self.get_release(id).await?;

        self.deadline.run_as("release", self.repo.delete(id)).await?;

        self.caches.releases.invalidate(&id);
        self.caches.channels.invalidate_where(|username, c| {
            *username == release.owner_channel || c.official_release_ids.contains(&id)
        });

        tracing::info!(release_id = id, "Release deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_releases(
        &self,
        mut query: SearchQuery<ReleaseSortBy>,
    ) -> Result<Vec<Release>, DomainError> {
        query.page = query.page.capped(self.max_page_limit);

        let releases = self.deadline.run_as("release", self.repo.search(&query)).await?;
        for release in &releases {
            self.caches.releases.put(release.id, release.clone());
        }
        Ok(releases)
    }
}
