//! Response DTOs
//!
//! Data structures for API response bodies. Entities serialize as they are;
//! these cover the shapes that differ.

use serde::Serialize;

use crate::application::services::AuthTokens;
use crate::domain::{Comment, PostRecord, Release, SearchResults, User};

/// Authentication tokens response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<AuthTokens> for TokenResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// User as seen by someone; strangers don't see email or bookmarks.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct UserResponse(User);

impl UserResponse {
    pub fn for_viewer(user: User, viewer: Option<&str>) -> Self {
        if viewer == Some(user.username.as_str()) {
            Self(user)
        } else {
            Self(user.public_view())
        }
    }
}

/// Paginated list wrapper
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub count: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// Cross-entity search response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub posts: Vec<PostRecord>,
    pub releases: Vec<Release>,
    pub comments: Vec<Comment>,
    pub empty: bool,
}

impl From<SearchResults> for SearchResponse {
    fn from(results: SearchResults) -> Self {
        Self {
            empty: results.is_empty(),
            posts: results.posts,
            releases: results.releases,
            comments: results.comments,
        }
    }
}
