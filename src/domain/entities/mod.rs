//! # Domain Entities
//!
//! Core domain entities of the platform. Entities reference each other by
//! identifier only; composites are assembled by the application layer.
//!
//! ## Core Entities
//!
//! - **User**: Account with profile, bookmarks and picture
//! - **Channel**: Named publisher with admins, posts and release catalogs
//! - **Post**: Content published by a channel
//! - **Comment**: Comment on a post, or reply to another comment
//! - **Release**: Catalog item owned by a channel
//! - **Feed**: A user's channel subscriptions and sorting preference
//!
//! ## Supporting Entities
//!
//! - **AuthSession**: Refresh token state of a logged-in user
//! - **SearchResults**: Cross-entity search matches
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod channel;
mod comment;
mod feed;
mod post;
mod release;
mod search;
mod session;
mod user;

pub use user::{
    validate_username, NewUser, User, UserPatch, UserRecord, UserRepository, UserSortBy,
    USERNAME_MAX_LEN, USERNAME_MIN_LEN,
};

pub use channel::{
    Channel, ChannelPatch, ChannelRecord, ChannelRepository, ChannelSortBy, NewChannel,
    MAX_STICKIED_POSTS,
};

pub use post::{NewPost, Post, PostPatch, PostRecord, PostRepository, PostSortBy};

pub use comment::{reply_to_from_wire, Comment, CommentRepository, NewComment, ROOT_SENTINEL};

pub use release::{
    NewRelease, Release, ReleaseKind, ReleaseMetadata, ReleasePatch, ReleaseRepository,
    ReleaseSortBy,
};

pub use feed::{Feed, FeedRepository, FeedSorting, Subscription};

pub use session::{AuthRepository, AuthSession};

pub use search::{SearchRepository, SearchResults};
