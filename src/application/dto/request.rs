//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::domain::{
    parse_sort, reply_to_from_wire, ChannelPatch, FeedSorting, NewChannel, NewComment, NewPost,
    NewRelease, NewUser, Page, PostPatch, ReleaseKind, ReleaseMetadata, ReleasePatch, SearchQuery,
    SortKey, SortOrder, UserPatch,
};
use crate::shared::error::DomainError;

/// Keep an explicit `null` apart from an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// --- Auth ---

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

// --- Users ---

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 5, max = 22, message = "Username must be 5-22 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 255, message = "First name must be 1-255 characters"))]
    pub first_name: String,

    pub middle_name: Option<String>,
    pub last_name: Option<String>,

    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,
}

impl From<RegisterRequest> for NewUser {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            bio: req.bio,
        }
    }
}

/// Update user request; absent fields stay, `null` clears
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 5, max = 22, message = "Username must be 5-22 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub middle_name: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub last_name: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            bio: req.bio,
        }
    }
}

/// Bookmark request
#[derive(Debug, Deserialize)]
pub struct BookmarkRequest {
    pub post_id: i32,
}

/// Picture request; the image itself is stored elsewhere
#[derive(Debug, Deserialize, Validate)]
pub struct PictureRequest {
    #[validate(length(min = 1, max = 255, message = "Image name must be 1-255 characters"))]
    pub image_name: String,
}

// --- Channels ---

/// Create channel request; the caller becomes the owner
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChannelRequest {
    #[validate(length(min = 5, max = 22, message = "Username must be 5-22 characters"))]
    pub username: String,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

impl CreateChannelRequest {
    pub fn into_new_channel(self, owner: String) -> NewChannel {
        NewChannel {
            username: self.username,
            name: self.name,
            description: self.description,
            owner_username: owner,
        }
    }
}

/// Update channel request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChannelRequest {
    #[validate(length(min = 5, max = 22, message = "Username must be 5-22 characters"))]
    pub username: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl From<UpdateChannelRequest> for ChannelPatch {
    fn from(req: UpdateChannelRequest) -> Self {
        Self {
            username: req.username,
            name: req.name,
            description: req.description,
        }
    }
}

/// Names a user, for admin and owner changes
#[derive(Debug, Deserialize, Validate)]
pub struct UsernameRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
}

/// Official catalog entry request
#[derive(Debug, Deserialize)]
pub struct OfficialReleaseRequest {
    /// Channel post announcing the release
    pub post_id: i32,
}

// --- Posts ---

/// Create post request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(default)]
    pub content: String,
}

impl CreatePostRequest {
    pub fn into_new_post(self, channel: String, posted_by: String) -> NewPost {
        NewPost {
            channel_username: channel,
            posted_by,
            title: self.title,
            content: self.content,
        }
    }
}

/// Update post request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub content: Option<String>,
}

impl From<UpdatePostRequest> for PostPatch {
    fn from(req: UpdatePostRequest) -> Self {
        Self {
            title: req.title,
            content: req.content,
        }
    }
}

// --- Comments ---

/// Create comment request; `reply_to` of -1 or absent means a root comment
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be 1-2000 characters"))]
    pub content: String,

    pub reply_to: Option<i32>,
}

impl CreateCommentRequest {
    pub fn into_new_comment(self, post_id: i32, commenter: String) -> NewComment {
        NewComment {
            post_id,
            reply_to: reply_to_from_wire(self.reply_to),
            commenter,
            content: self.content,
        }
    }
}

/// Update comment request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be 1-2000 characters"))]
    pub content: String,
}

// --- Releases ---

/// Create release request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReleaseRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub release_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub genres: Vec<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    pub description: Option<String>,
}

impl CreateReleaseRequest {
    pub fn into_new_release(self, owner_channel: String) -> NewRelease {
        NewRelease {
            owner_channel,
            kind: self
                .kind
                .as_deref()
                .map(ReleaseKind::from_str)
                .unwrap_or_default(),
            content: self.content,
            metadata: ReleaseMetadata {
                title: self.title,
                release_date: self.release_date,
                genres: self.genres,
                authors: self.authors,
                description: self.description,
            },
        }
    }
}

/// Update release request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReleaseRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub content: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub release_date: Option<Option<DateTime<Utc>>>,

    pub genres: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl From<UpdateReleaseRequest> for ReleasePatch {
    fn from(req: UpdateReleaseRequest) -> Self {
        Self {
            kind: req.kind.as_deref().map(ReleaseKind::from_str),
            content: req.content,
            title: req.title,
            release_date: req.release_date,
            genres: req.genres,
            authors: req.authors,
            description: req.description,
        }
    }
}

// --- Feeds ---

/// Feed sorting request
#[derive(Debug, Deserialize)]
pub struct SortingRequest {
    pub sorting: String,
}

impl SortingRequest {
    pub fn parse(&self) -> Result<FeedSorting, DomainError> {
        FeedSorting::from_str(&self.sorting)
            .ok_or_else(|| DomainError::invalid(format!("unknown feed sorting {}", self.sorting)))
    }
}

// --- Query strings ---

/// `?pattern=&sort=key_dir&limit=&offset=` of entity searches
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub pattern: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn page(&self) -> Result<Page, DomainError> {
        Page::from_query(self.limit, self.offset)
    }

    pub fn to_search<S: SortKey>(&self) -> Result<SearchQuery<S>, DomainError> {
        let (sort_by, sort_order) = parse_sort::<S>(self.sort.as_deref().unwrap_or_default());
        Ok(SearchQuery::new(
            self.pattern.clone().unwrap_or_default(),
            sort_by,
            sort_order,
            self.page()?,
        ))
    }

    /// Creation-time order for comment listings: `old` is oldest first,
    /// anything else newest first.
    pub fn comment_order(&self) -> SortOrder {
        match self.sort.as_deref() {
            Some("old") => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }

    /// Feed sorting override, if the query names a valid one.
    pub fn feed_sorting(&self) -> Option<FeedSorting> {
        self.sort.as_deref().and_then(FeedSorting::from_str)
    }
}
