//! Cache Module
//!
//! In-memory entity caches sitting between the domain services and
//! PostgreSQL.
//!
//! # Architecture
//!
//! ```text
//! +-------------------+
//! |  Domain Service   |  <-- sole writer of its own cache
//! +-------------------+
//!      |         |
//!      v         v
//! +---------+  +-------------------+
//! | Entity  |  |   Repository      |  <-- source of truth
//! | Cache   |  +-------------------+
//! +---------+
//! ```
//!
//! Reads try the cache first and fall back to the repository, re-populating
//! on the way out. Writes go to the repository first, then replace or evict
//! the cached value.

mod entity_cache;

pub use entity_cache::EntityCache;

use crate::domain::entities::{AuthSession, Channel, Comment, Feed, Post, Release, User};

/// Cache names, used as metric labels.
pub mod names {
    pub const USERS: &str = "users";
    pub const CHANNELS: &str = "channels";
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    pub const RELEASES: &str = "releases";
    pub const FEEDS: &str = "feeds";
    pub const SESSIONS: &str = "sessions";
}

pub type UserCache = EntityCache<String, User>;
pub type ChannelCache = EntityCache<String, Channel>;
pub type PostCache = EntityCache<i32, Post>;
pub type CommentCache = EntityCache<i32, Comment>;
pub type ReleaseCache = EntityCache<i32, Release>;
pub type FeedCache = EntityCache<String, Feed>;
pub type SessionCache = EntityCache<String, AuthSession>;

/// One cache per entity type.
///
/// Services take clones of the handles they own, plus handles of sibling
/// caches they must evict from.
#[derive(Clone)]
pub struct Caches {
    pub users: UserCache,
    pub channels: ChannelCache,
    pub posts: PostCache,
    pub comments: CommentCache,
    pub releases: ReleaseCache,
    pub feeds: FeedCache,
    pub sessions: SessionCache,
}

impl Caches {
    pub fn new() -> Self {
        Self {
            users: EntityCache::new(names::USERS),
            channels: EntityCache::new(names::CHANNELS),
            posts: EntityCache::new(names::POSTS),
            comments: EntityCache::new(names::COMMENTS),
            releases: EntityCache::new(names::RELEASES),
            feeds: EntityCache::new(names::FEEDS),
            sessions: EntityCache::new(names::SESSIONS),
        }
    }

    /// Entry count of every cache, by name.
    pub fn sizes(&self) -> Vec<(&'static str, usize)> {
        vec![
            (self.users.name(), self.users.len()),
            (self.channels.name(), self.channels.len()),
            (self.posts.name(), self.posts.len()),
            (self.comments.name(), self.comments.len()),
            (self.releases.name(), self.releases.len()),
            (self.feeds.name(), self.feeds.len()),
            (self.sessions.name(), self.sessions.len()),
        ]
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}
