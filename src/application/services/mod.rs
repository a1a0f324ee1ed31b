//! Application Services
//!
//! Business logic services that coordinate domain operations. Each service
//! is an `#[async_trait]` trait with one implementation, the only writer of
//! its own entity cache; it evicts sibling entries that a write makes stale.
//!
//! ## Available Services
//!
//! - **UserService**: Accounts, bookmarks, pictures
//! - **ChannelService**: Channels, admins, stickies, official catalog
//! - **PostService**: Posts
//! - **CommentService**: Comments and replies
//! - **ReleaseService**: Releases
//! - **FeedService**: Subscriptions and feed posts
//! - **AuthService**: Login, token refresh, logout, authentication
//! - **SearchService**: Cross-entity text search

pub mod auth_service;
pub mod channel_service;
pub mod comment_service;
pub mod feed_service;
pub mod post_service;
pub mod release_service;
pub mod search_service;
pub mod user_service;

use std::sync::Arc;

use futures::try_join;
use sqlx::PgPool;

pub use auth_service::{AuthService, AuthServiceImpl, AuthTokens, Claims};
pub use channel_service::{ChannelService, ChannelServiceImpl};
pub use comment_service::{CommentService, CommentServiceImpl};
pub use feed_service::{FeedService, FeedServiceImpl};
pub use post_service::{PostService, PostServiceImpl};
pub use release_service::{ReleaseService, ReleaseServiceImpl};
pub use search_service::{SearchService, SearchServiceImpl};
pub use user_service::{UserService, UserServiceImpl};

use crate::config::{JwtSettings, Settings};
use crate::domain::{
    AuthRepository, ChannelRepository, CommentRepository, FeedRepository, PostRepository,
    ReleaseRepository, SearchRepository, UserRepository,
};
use crate::infrastructure::cache::Caches;
use crate::infrastructure::repositories::{
    PgAuthRepository, PgChannelRepository, PgCommentRepository, PgFeedRepository,
    PgPostRepository, PgReleaseRepository, PgSearchRepository, PgUserRepository,
};
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;

/// Usernames are shared between users and channels.
pub(crate) async fn username_taken(
    users: &dyn UserRepository,
    channels: &dyn ChannelRepository,
    deadline: Deadline,
    username: &str,
) -> Result<bool, DomainError> {
    let (user, channel) = try_join!(
        deadline.run(users.username_exists(username)),
        deadline.run(channels.username_exists(username)),
    )
    .map_err(|e| DomainError::from_store(e, "username"))?;
    Ok(user || channel)
}

/// Storage handles for every repository.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub channels: Arc<dyn ChannelRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub releases: Arc<dyn ReleaseRepository>,
    pub feeds: Arc<dyn FeedRepository>,
    pub auth: Arc<dyn AuthRepository>,
    pub search: Arc<dyn SearchRepository>,
}

impl Stores {
    /// PostgreSQL repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            channels: Arc::new(PgChannelRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool.clone())),
            releases: Arc::new(PgReleaseRepository::new(pool.clone())),
            feeds: Arc::new(PgFeedRepository::new(pool.clone())),
            auth: Arc::new(PgAuthRepository::new(pool.clone())),
            search: Arc::new(PgSearchRepository::new(pool)),
        }
    }
}

/// Settings the services run with.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Bound on every storage call
    pub deadline: Deadline,
    pub jwt: JwtSettings,
    /// Upper bound on any page size
    pub max_page_limit: i64,
}

impl ServiceSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            deadline: Deadline::from_millis(settings.database.statement_timeout_ms),
            jwt: settings.jwt.clone(),
            max_page_limit: settings.pagination.max_limit,
        }
    }
}

/// Every service, wired once at startup.
#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn UserService>,
    pub channels: Arc<dyn ChannelService>,
    pub posts: Arc<dyn PostService>,
    pub comments: Arc<dyn CommentService>,
    pub releases: Arc<dyn ReleaseService>,
    pub feeds: Arc<dyn FeedService>,
    pub auth: Arc<dyn AuthService>,
    pub search: Arc<dyn SearchService>,
    pub caches: Caches,
}

impl Services {
    pub fn new(stores: Stores, settings: ServiceSettings) -> Self {
        let caches = Caches::new();
        let ServiceSettings {
            deadline,
            jwt,
            max_page_limit,
        } = settings;

        let comments: Arc<dyn CommentService> = Arc::new(CommentServiceImpl::new(
            stores.comments.clone(),
            stores.posts.clone(),
            stores.users.clone(),
            caches.clone(),
            deadline,
        ));
        let posts: Arc<dyn PostService> = Arc::new(PostServiceImpl::new(
            stores.posts.clone(),
            stores.channels.clone(),
            comments.clone(),
            caches.clone(),
            deadline,
            max_page_limit,
        ));
        let releases: Arc<dyn ReleaseService> = Arc::new(ReleaseServiceImpl::new(
            stores.releases.clone(),
            stores.channels.clone(),
            caches.clone(),
            deadline,
            max_page_limit,
        ));
        let channels: Arc<dyn ChannelService> = Arc::new(ChannelServiceImpl::new(
            stores.channels.clone(),
            stores.users.clone(),
            posts.clone(),
            releases.clone(),
            caches.clone(),
            deadline,
            max_page_limit,
        ));
        let feeds: Arc<dyn FeedService> = Arc::new(FeedServiceImpl::new(
            stores.feeds.clone(),
            stores.channels.clone(),
            posts.clone(),
            caches.clone(),
            deadline,
            max_page_limit,
        ));
        let users: Arc<dyn UserService> = Arc::new(UserServiceImpl::new(
            stores.users.clone(),
            stores.channels.clone(),
            stores.feeds.clone(),
            stores.posts.clone(),
            stores.comments.clone(),
            posts.clone(),
            caches.clone(),
            deadline,
            max_page_limit,
        ));
        let auth: Arc<dyn AuthService> = Arc::new(AuthServiceImpl::new(
            stores.auth.clone(),
            users.clone(),
            caches.clone(),
            deadline,
            jwt,
        ));
        let search: Arc<dyn SearchService> =
            Arc::new(SearchServiceImpl::new(stores.search, deadline, max_page_limit));

        Self {
            users,
            channels,
            posts,
            comments,
            releases,
            feeds,
            auth,
            search,
            caches,
        }
    }
}
