//! Post Service
//!
//! Posts published by channel admins. Adding or deleting a post evicts the
//! owning channel, whose `post_ids` it changes.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use futures::try_join;
use tracing::instrument;

use super::comment_service::CommentService;
use crate::application::resolver::{assemble_post, complete_post, resolve_ids};
use crate::domain::{
    ChannelRepository, Comment, NewPost, Post, PostPatch, PostRepository, PostSortBy, SearchQuery,
};
use crate::infrastructure::cache::Caches;
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;

/// Evict every cached value that referenced the given (now deleted)
/// posts. Storage cascades their comments, bookmarks, stickies and
/// official catalog rows.
pub(crate) fn evict_post_references(caches: &Caches, post_ids: &HashSet<i32>) {
    if post_ids.is_empty() {
        return;
    }
    caches
        .channels
        .invalidate_where(|_, c| c.post_ids.iter().any(|id| post_ids.contains(id)));
    caches
        .users
        .invalidate_where(|_, u| post_ids.iter().any(|id| u.has_bookmarked(*id)));

    caches
        .comments
        .invalidate_where(|_, c| post_ids.contains(&c.post_id));

    // Catalog rows cascade, so the official flag may have flipped.
    caches.releases.invalidate_where(|_, r| r.official);
}

/// Post service trait
#[async_trait]
pub trait PostService: Send + Sync {
    /// Publish a post. The poster must be an admin of the channel.
    async fn add_post(&self, new: NewPost) -> Result<Post, DomainError>;

    /// Get a post, cache first
    async fn get_post(&self, id: i32) -> Result<Post, DomainError>;

    /// Apply a sparse update and replace the cached post
    async fn update_post(&self, id: i32, patch: PostPatch) -> Result<Post, DomainError>;

    /// Delete a post with its comments
    async fn delete_post(&self, id: i32) -> Result<(), DomainError>;

    /// Search posts by title or content
    async fn search_posts(&self, query: SearchQuery<PostSortBy>) -> Result<Vec<Post>, DomainError>;

    /// Every comment on a post, in storage order
    async fn get_post_comments(&self, id: i32) -> Result<Vec<Comment>, DomainError>;
}

/// PostService implementation
pub struct PostServiceImpl {
    repo: Arc<dyn PostRepository>,
    channels: Arc<dyn ChannelRepository>,
    comments: Arc<dyn CommentService>,
    caches: Caches,
    deadline: Deadline,
    max_page_limit: i64,
}

impl PostServiceImpl {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        channels: Arc<dyn ChannelRepository>,
        comments: Arc<dyn CommentService>,
        caches: Caches,
        deadline: Deadline,
        max_page_limit: i64,
    ) -> Self {
        Self {
            repo,
            channels,
            comments,
            caches,
            deadline,
            max_page_limit,
        }
    }
}

#[async_trait]
impl PostService for PostServiceImpl {
    #[instrument(skip(self, new), fields(channel = %new.channel_username, posted_by = %new.posted_by))]
    async fn add_post(&self, new: NewPost) -> Result<Post, DomainError> {
        new.validate()?;

        let admins = match self.caches.channels.get(&new.channel_username) {
            Some(channel) => channel.admin_usernames,
            None => {
                let (channel, admins) = try_join!(
                    self.deadline.run(self.channels.find(&new.channel_username)),
                    self.deadline.run(self.channels.admins(&new.channel_username)),
                )
                .map_err(|e| DomainError::from_store(e, "channel"))?;
                if channel.is_none() {
                    return Err(DomainError::not_found("channel"));
                }
                admins
            }
        };

        if !admins.iter().any(|a| *a == new.posted_by) {
            return Err(DomainError::Unauthorized(format!(
                "{} is not an admin of {}",
                new.posted_by, new.channel_username
            )));
        }

        let record = self.deadline.run_as("post", self.repo.create(&new)).await?;
        let post = Post::from_parts(record, Vec::new());

        self.caches.posts.put(post.id, post.clone());
        self.caches.channels.invalidate(&post.channel_username);

        tracing::info!(post_id = post.id, "Post added");
        Ok(post)
    }

    #[instrument(skip(self))]
    async fn get_post(&self, id: i32) -> Result<Post, DomainError> {
        if let Some(post) = self.caches.posts.get(&id) {
            return Ok(post);
        }

        let post = assemble_post(self.repo.as_ref(), self.deadline, id)
            .await?
            .ok_or_else(|| DomainError::not_found("post"))?;

        self.caches.posts.put(id, post.clone());
        Ok(post)
    }

    #[instrument(skip(self, patch))]
    async fn update_post(&self, id: i32, patch: PostPatch) -> Result<Post, DomainError> {
        let post = self.get_post(id).await?;
        if patch.is_empty() {
            return Ok(post);
        }

        let mut record = post.record();
        patch.apply_to(&mut record)?;

        let updated = self.deadline.run_as("post", self.repo.update(&record)).await?;
        let post = Post::from_parts(updated, post.comment_ids);

        self.caches.posts.put(id, post.clone());
        Ok(post)
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, id: i32) -> Result<(), DomainError> {
        let post = self.get_post(id).await?;

        self.deadline.run_as("post", self.repo.delete(id)).await?;

        self.caches.posts.invalidate(&id);
        self.caches.channels.invalidate(&post.channel_username);
        evict_post_references(&self.caches, &HashSet::from([id]));

        tracing::info!(post_id = id, channel = %post.channel_username, "Post deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_posts(&self, mut query: SearchQuery<PostSortBy>) -> Result<Vec<Post>, DomainError> {
        query.page = query.page.capped(self.max_page_limit);

        let records = self.deadline.run_as("post", self.repo.search(&query)).await?;
        let posts = try_join_all(
            records
                .into_iter()
                .map(|record| complete_post(self.repo.as_ref(), self.deadline, record)),
        )
        .await?;

        for post in &posts {
            self.caches.posts.put(post.id, post.clone());
        }
        Ok(posts)
    }

    #[instrument(skip(self))]
    async fn get_post_comments(&self, id: i32) -> Result<Vec<Comment>, DomainError> {
        let post = self.get_post(id).await?;
        resolve_ids(&post.comment_ids, |comment_id| self.comments.get_comment(comment_id)).await
    }
}
