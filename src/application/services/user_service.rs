//! User Service
//!
//! User accounts, bookmarks and profile pictures. Each user owns one feed,
//! created together with the account.

use std::collections::HashSet;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use futures::try_join;
use tracing::instrument;

use super::post_service::{evict_post_references, PostService};
use super::username_taken;
use crate::application::resolver::{assemble_user, complete_user, resolve_ids};
use crate::domain::{
    ChannelRepository, CommentRepository, Feed, FeedRepository, FeedSorting, NewUser, Post,
    PostRepository, SearchQuery, User, UserPatch, UserRecord, UserRepository, UserSortBy,
};
use crate::infrastructure::cache::Caches;
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;

/// Hash a password with Argon2id and a random salt.
fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
fn verify_password(password: &str, hash: &str) -> Result<bool, DomainError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| DomainError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// Register a user and create their feed.
    ///
    /// If the feed can't be stored the user row is deleted again and
    /// `PersistencePartial` is returned.
    async fn add_user(&self, new: NewUser) -> Result<User, DomainError>;

    /// Get a user, cache first
    async fn get_user(&self, username: &str) -> Result<User, DomainError>;

    /// Apply a sparse update. A new password is re-hashed; a new username or
    /// email is checked for uniqueness first.
    async fn update_user(&self, username: &str, patch: UserPatch) -> Result<User, DomainError>;

    /// Delete a user with everything they wrote. A user who still owns
    /// channels is a `Conflict`; ownership has to be handed over or the
    /// channels deleted first.
    async fn delete_user(&self, username: &str) -> Result<(), DomainError>;

    /// Search users by username, email, first name or last name
    async fn search_users(&self, query: SearchQuery<UserSortBy>) -> Result<Vec<User>, DomainError>;

    // --- Bookmarks ---
    /// Bookmark a post. Bookmarking it again is a no-op.
    async fn bookmark_post(&self, username: &str, post_id: i32) -> Result<User, DomainError>;

    /// Remove a bookmark
    async fn delete_bookmark(&self, username: &str, post_id: i32) -> Result<User, DomainError>;

    /// Bookmarked posts, oldest bookmark first
    async fn get_bookmarked_posts(&self, username: &str) -> Result<Vec<Post>, DomainError>;

    // --- Picture ---
    /// Set the profile picture
    async fn add_picture(&self, username: &str, image_name: &str) -> Result<User, DomainError>;

    /// Remove the profile picture
    async fn remove_picture(&self, username: &str) -> Result<User, DomainError>;

    /// Check a username and password. Any mismatch is `Unauthorized`,
    /// whether the user is unknown or the password wrong.
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<User, DomainError>;
}

/// UserService implementation
pub struct UserServiceImpl {
    repo: Arc<dyn UserRepository>,
    channel_repo: Arc<dyn ChannelRepository>,
    feed_repo: Arc<dyn FeedRepository>,
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostService>,
    caches: Caches,
    deadline: Deadline,
    max_page_limit: i64,
}

impl UserServiceImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn UserRepository>,
        channel_repo: Arc<dyn ChannelRepository>,
        feed_repo: Arc<dyn FeedRepository>,
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostService>,
        caches: Caches,
        deadline: Deadline,
        max_page_limit: i64,
    ) -> Self {
        Self {
            repo,
            channel_repo,
            feed_repo,
            post_repo,
            comment_repo,
            posts,
            caches,
            deadline,
            max_page_limit,
        }
    }

    /// Re-assemble a user from storage and replace the cached value.
    async fn refresh(&self, username: &str) -> Result<User, DomainError> {
        let user = assemble_user(self.repo.as_ref(), self.deadline, username)
            .await?
            .ok_or_else(|| DomainError::not_found("user"))?;

        self.caches.users.put(user.username.clone(), user.clone());
        Ok(user)
    }

    /// Posts the user published and posts they commented on.
    async fn authored(&self, username: &str) -> Result<Authored, DomainError> {
        let (posted, commented) = try_join!(
            self.deadline.run(self.post_repo.ids_posted_by(username)),
            self.deadline.run(self.comment_repo.post_ids_commented_by(username)),
        )
        .map_err(|e| DomainError::from_store(e, "user"))?;

        Ok(Authored {
            posted: posted.into_iter().collect(),
            commented: commented.into_iter().collect(),
        })
    }

    /// Evict every cached value that named the user by `old_username`.
    fn evict_references(&self, old_username: &str, authored: Authored) {
        self.caches.feeds.invalidate(old_username);
        self.caches.sessions.invalidate(old_username);
        self.caches
            .channels
            .invalidate_where(|_, c| c.is_admin(old_username));

        for id in authored.posted.iter().chain(authored.commented.iter()) {
            self.caches.posts.invalidate(id);
        }
        self.caches
            .comments
            .invalidate_where(|_, c| c.commenter == old_username || authored.commented.contains(&c.post_id));
        evict_post_references(&self.caches, &authored.posted);
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self, new), fields(username = %new.username))]
    async fn add_user(&self, new: NewUser) -> Result<User, DomainError> {
        new.validate()?;

        let (taken, email_taken) = try_join!(
            username_taken(self.repo.as_ref(), self.channel_repo.as_ref(), self.deadline, &new.username),
            self.deadline.run_as("user", self.repo.email_exists(&new.email)),
        )?;
        if taken {
            return Err(DomainError::Conflict(format!(
                "username {} is already taken",
                new.username
            )));
        }
        if email_taken {
            return Err(DomainError::Conflict(format!(
                "email {} is already registered",
                new.email
            )));
        }

        let record = UserRecord {
            username: new.username,
            email: new.email,
            password_hash: hash_password(&new.password)?,
            first_name: new.first_name,
            middle_name: new.middle_name,
            last_name: new.last_name,
            bio: new.bio,
            created_at: Utc::now(),
        };
        let record = self.deadline.run_as("user", self.repo.create(&record)).await?;

        let sorting = FeedSorting::default();
        if let Err(err) = self
            .deadline
            .run(self.feed_repo.create(&record.username, sorting))
            .await
        {
            tracing::error!(username = %record.username, error = %err, "Failed to store user feed");
            if let Err(err) = self.deadline.run(self.repo.delete(&record.username)).await {
                tracing::warn!(username = %record.username, error = %err, "Compensating delete failed");
            }
            return Err(DomainError::PersistencePartial(format!(
                "feed of user {}",
                record.username
            )));
        }

        let user = User::from_parts(record, Vec::new(), None);
        self.caches.users.put(user.username.clone(), user.clone());
        self.caches.feeds.put(
            user.username.clone(),
            Feed {
                owner_username: user.username.clone(),
                sorting,
                subscriptions: Vec::new(),
            },
        );

        tracing::info!("User added");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, username: &str) -> Result<User, DomainError> {
        if let Some(user) = self.caches.users.get(username) {
            return Ok(user);
        }
        self.refresh(username).await
    }

    #[instrument(skip(self, patch))]
    async fn update_user(&self, username: &str, patch: UserPatch) -> Result<User, DomainError> {
        let user = self.get_user(username).await?;
        if patch.is_empty() {
            return Ok(user);
        }

        let mut record = user.record();
        patch.apply_to(&mut record)?;

        let renamed = record.username != username;
        let email_changed = record.email != user.email;
        let (taken, email_taken) = try_join!(
            async {
                if renamed {
                    username_taken(
                        self.repo.as_ref(),
                        self.channel_repo.as_ref(),
                        self.deadline,
                        &record.username,
                    )
                    .await
                } else {
                    Ok(false)
                }
            },
            async {
                if email_changed {
                    self.deadline
                        .run_as("user", self.repo.email_exists(&record.email))
                        .await
                } else {
                    Ok(false)
                }
            },
        )?;
        if taken {
            return Err(DomainError::Conflict(format!(
                "username {} is already taken",
                record.username
            )));
        }
        if email_taken {
            return Err(DomainError::Conflict(format!(
                "email {} is already registered",
                record.email
            )));
        }

        if let Some(password) = &patch.password {
            record.password_hash = hash_password(password)?;
        }

        let authored = if renamed {
            Some(self.authored(username).await?)
        } else {
            None
        };

        let updated = self
            .deadline
            .run_as("user", self.repo.update(username, &record))
            .await?;
        let user = user.with_record(updated);

        if let Some(authored) = authored {
            self.caches.users.invalidate(username);
            self.evict_references(username, authored);
            tracing::info!(from = username, to = %user.username, "User renamed");
        }
        self.caches.users.put(user.username.clone(), user.clone());
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, username: &str) -> Result<(), DomainError> {
        self.get_user(username).await?;

        let owned = self
            .deadline
            .run_as("channel", self.channel_repo.owned_by(username))
            .await?;
        if !owned.is_empty() {
            return Err(DomainError::Conflict(format!(
                "user {} still owns channels: {}",
                username,
                owned.join(", ")
            )));
        }

        let authored = self.authored(username).await?;

        self.deadline.run_as("user", self.repo.delete(username)).await?;

        self.caches.users.invalidate(username);
        self.evict_references(username, authored);

        tracing::info!(username, "User deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_users(&self, mut query: SearchQuery<UserSortBy>) -> Result<Vec<User>, DomainError> {
        query.page = query.page.capped(self.max_page_limit);

        let records = self.deadline.run_as("user", self.repo.search(&query)).await?;
        let users = try_join_all(
            records
                .into_iter()
                .map(|record| complete_user(self.repo.as_ref(), self.deadline, record)),
        )
        .await?;

        for user in &users {
            self.caches.users.put(user.username.clone(), user.clone());
        }
        Ok(users)
    }

    // --- Bookmarks ---
    #[instrument(skip(self))]
    async fn bookmark_post(&self, username: &str, post_id: i32) -> Result<User, DomainError> {
        let (user, _) = try_join!(self.get_user(username), self.posts.get_post(post_id))?;
        if user.has_bookmarked(post_id) {
            return Ok(user);
        }

        self.deadline
            .run_as("post", self.repo.add_bookmark(username, post_id))
            .await?;
        self.refresh(username).await
    }

    #[instrument(skip(self))]
    async fn delete_bookmark(&self, username: &str, post_id: i32) -> Result<User, DomainError> {
        let user = self.get_user(username).await?;
        if !user.has_bookmarked(post_id) {
            return Err(DomainError::not_found("bookmark"));
        }

        self.deadline
            .run_as("bookmark", self.repo.delete_bookmark(username, post_id))
            .await?;
        self.refresh(username).await
    }

    #[instrument(skip(self))]
    async fn get_bookmarked_posts(&self, username: &str) -> Result<Vec<Post>, DomainError> {
        let user = self.get_user(username).await?;

        let mut bookmarks: Vec<_> = user.bookmarked_posts.into_iter().collect();
        bookmarks.sort_by_key(|(id, at)| (*at, *id));
        let ids: Vec<i32> = bookmarks.into_iter().map(|(id, _)| id).collect();

        resolve_ids(&ids, |id| self.posts.get_post(id)).await
    }

    // --- Picture ---
    #[instrument(skip(self))]
    async fn add_picture(&self, username: &str, image_name: &str) -> Result<User, DomainError> {
        self.get_user(username).await?;
        self.deadline
            .run_as("user", self.repo.set_picture(username, image_name))
            .await?;
        self.refresh(username).await
    }

    #[instrument(skip(self))]
    async fn remove_picture(&self, username: &str) -> Result<User, DomainError> {
        let user = self.get_user(username).await?;
        if user.picture_url.is_none() {
            return Err(DomainError::not_found("picture"));
        }
        self.deadline
            .run_as("user", self.repo.remove_picture(username))
            .await?;
        self.refresh(username).await
    }

    #[instrument(skip(self, password))]
    async fn verify_credentials(&self, username: &str, password: &str) -> Result<User, DomainError> {
        let user = match self.get_user(username).await {
            Ok(user) => user,
            Err(DomainError::NotFound(_)) => {
                return Err(DomainError::Unauthorized("invalid credentials".into()))
            }
            Err(err) => return Err(err),
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(DomainError::Unauthorized("invalid credentials".into()));
        }
        Ok(user)
    }
}

/// Ids touched by a user's posts and comments.
struct Authored {
    posted: HashSet<i32>,
    commented: HashSet<i32>,
}
