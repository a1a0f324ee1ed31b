//! Comment entity and repository trait.
//!
//! Maps to the `comments` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Page, SortOrder};
use crate::shared::error::{DomainError, StoreError};
use crate::shared::validation::require_text;

/// Wire value that marks a root comment.
pub const ROOT_SENTINEL: i32 = -1;

/// A comment on a post, or a reply to another comment of the same post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    /// `None` for root comments
    pub reply_to: Option<i32>,
    pub commenter: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.reply_to.is_none()
    }
}

/// Map a wire `reply_to` value onto the optional parent id.
pub fn reply_to_from_wire(raw: Option<i32>) -> Option<i32> {
    raw.filter(|id| *id != ROOT_SENTINEL && *id >= 0)
}

/// Data for a new comment.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub post_id: i32,
    pub reply_to: Option<i32>,
    pub commenter: String,
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("commenter", &self.commenter)?;
        require_text("content", &self.content)?;
        Ok(())
    }
}

/// Repository trait for Comment data access operations.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// `MissingReference` if the post, parent or commenter does not exist.
    async fn create(&self, comment: &NewComment) -> Result<Comment, StoreError>;

    async fn find(&self, id: i32) -> Result<Option<Comment>, StoreError>;

    async fn update_content(&self, id: i32, content: &str) -> Result<Comment, StoreError>;

    async fn delete(&self, id: i32) -> Result<(), StoreError>;

    /// Ids of the posts a user commented on.
    async fn post_ids_commented_by(&self, username: &str) -> Result<Vec<i32>, StoreError>;

    /// Root comments of a post, by creation time.
    async fn list_for_post(
        &self,
        post_id: i32,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError>;

    /// Direct replies to a comment, by creation time.
    async fn list_replies(
        &self,
        comment_id: i32,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError>;
}
