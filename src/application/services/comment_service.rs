//! Comment Service
//!
//! Comments and replies on posts. Every mutation evicts the parent post,
//! whose `comment_ids` it changes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::try_join;
use tracing::instrument;

use crate::domain::{
    Comment, CommentRepository, NewComment, Page, PostRepository, SortOrder, UserRepository,
};
use crate::infrastructure::cache::Caches;
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;
use crate::shared::validation::require_text;

/// Comment service trait
#[async_trait]
pub trait CommentService: Send + Sync {
    /// Add a comment, or a reply when `reply_to` is set.
    ///
    /// The post and commenter must exist; a reply's parent must belong to
    /// the same post.
    async fn add_comment(&self, new: NewComment) -> Result<Comment, DomainError>;

    /// Get a comment, cache first
    async fn get_comment(&self, id: i32) -> Result<Comment, DomainError>;

    /// Replace the content of a comment
    async fn update_comment(&self, id: i32, content: &str) -> Result<Comment, DomainError>;

    /// Delete a comment. Its replies go with it.
    async fn delete_comment(&self, id: i32) -> Result<(), DomainError>;

    /// Root comments of a post
    async fn get_comments(
        &self,
        post_id: i32,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Comment>, DomainError>;

    /// Direct replies to a comment
    async fn get_replies(
        &self,
        comment_id: i32,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Comment>, DomainError>;
}

/// CommentService implementation
pub struct CommentServiceImpl {
    repo: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    caches: Caches,
    deadline: Deadline,
}

impl CommentServiceImpl {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        caches: Caches,
        deadline: Deadline,
    ) -> Self {
        Self {
            repo,
            posts,
            users,
            caches,
            deadline,
        }
    }

    async fn post_exists(&self, post_id: i32) -> Result<bool, DomainError> {
        if self.caches.posts.contains(&post_id) {
            return Ok(true);
        }
        let post = self
            .deadline
            .run_as("post", self.posts.find(post_id))
            .await?;
        Ok(post.is_some())
    }

    fn cache_all(&self, comments: &[Comment]) {
        for comment in comments {
            self.caches.comments.put(comment.id, comment.clone());
        }
    }
}

#[async_trait]
impl CommentService for CommentServiceImpl {
    #[instrument(skip(self, new), fields(post_id = new.post_id, commenter = %new.commenter))]
    async fn add_comment(&self, new: NewComment) -> Result<Comment, DomainError> {
        new.validate()?;

        let (post_exists, commenter_exists, parent) = try_join!(
            self.post_exists(new.post_id),
            self.deadline.run_as("user", self.users.username_exists(&new.commenter)),
            async {
                match new.reply_to {
                    Some(parent) => self.get_comment(parent).await.map(Some),
                    None => Ok(None),
                }
            },
        )?;

        if !post_exists {
            return Err(DomainError::not_found("post"));
        }
        if !commenter_exists {
            return Err(DomainError::not_found("user"));
        }
        if let Some(parent) = parent {
            if parent.post_id != new.post_id {
                return Err(DomainError::invalid("reply must belong to the same post"));
            }
        }

        let comment = self
            .deadline
            .run_as("comment", self.repo.create(&new))
            .await?;

        self.caches.comments.put(comment.id, comment.clone());
        self.caches.posts.invalidate(&comment.post_id);

        tracing::info!(comment_id = comment.id, "Comment added");
        Ok(comment)
    }

    #[instrument(skip(self))]
    async fn get_comment(&self, id: i32) -> Result<Comment, DomainError> {
        if let Some(comment) = self.caches.comments.get(&id) {
            return Ok(comment);
        }

        let comment = self
            .deadline
            .run_as("comment", self.repo.find(id))
            .await?
            .ok_or_else(|| DomainError::not_found("comment"))?;

        self.caches.comments.put(id, comment.clone());
        Ok(comment)
    }

    #[instrument(skip(self, content))]
    async fn update_comment(&self, id: i32, content: &str) -> Result<Comment, DomainError> {
        require_text("content", content)?;

        let comment = self
            .deadline
            .run_as("comment", self.repo.update_content(id, content))
            .await?;

        self.caches.comments.put(id, comment.clone());
        self.caches.posts.invalidate(&comment.post_id);
        Ok(comment)
    }

    /// Replies always sit on their parent's post, so every cached comment
    /// of that post is evicted.
    #[instrument(skip(self))]
    async fn delete_comment(&self, id: i32) -> Result<(), DomainError> {
        let comment = self.get_comment(id).await?;

        self.deadline
            .run_as("comment", self.repo.delete(id))
            .await?;

        self.caches
            .comments
            .invalidate_where(|_, c| c.post_id == comment.post_id);
        self.caches.posts.invalidate(&comment.post_id);

        tracing::info!(comment_id = id, post_id = comment.post_id, "Comment deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_comments(
        &self,
        post_id: i32,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Comment>, DomainError> {
        if !self.post_exists(post_id).await? {
            return Err(DomainError::not_found("post"));
        }

        let comments = self
            .deadline
            .run_as("comment", self.repo.list_for_post(post_id, order, page))
            .await?;

        self.cache_all(&comments);
        Ok(comments)
    }

    #[instrument(skip(self))]
    async fn get_replies(
        &self,
        comment_id: i32,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Comment>, DomainError> {
        self.get_comment(comment_id).await?;

        let replies = self
            .deadline
            .run_as("comment", self.repo.list_replies(comment_id, order, page))
            .await?;

        self.cache_all(&replies);
        Ok(replies)
    }
}
