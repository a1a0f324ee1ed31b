//! Cross-Entity Reference Resolver
//!
//! Assembles composite entities from their base row and relation queries,
//! and resolves lists of foreign ids through sibling services.
//!
//! Every sub-query of one composite runs concurrently under the storage
//! deadline. If any of them fails the whole fetch fails, so a partially
//! assembled value never reaches a cache.

use std::future::Future;

use futures::future::try_join_all;
use futures::try_join;

use crate::domain::{
    Channel, ChannelRecord, ChannelRepository, Feed, FeedRepository, Post, PostRecord,
    PostRepository, User, UserRecord, UserRepository,
};
use crate::shared::deadline::Deadline;
use crate::shared::error::DomainError;

/// Fetch and assemble a user. `Ok(None)` if no such user exists.
pub async fn assemble_user(
    repo: &dyn UserRepository,
    deadline: Deadline,
    username: &str,
) -> Result<Option<User>, DomainError> {
    let (record, bookmarks, picture) = try_join!(
        deadline.run(repo.find(username)),
        deadline.run(repo.bookmarks(username)),
        deadline.run(repo.picture(username)),
    )
    .map_err(|e| DomainError::from_store(e, "user"))?;

    Ok(record.map(|record| User::from_parts(record, bookmarks, picture)))
}

/// Assemble a user around an already fetched row.
pub async fn complete_user(
    repo: &dyn UserRepository,
    deadline: Deadline,
    record: UserRecord,
) -> Result<User, DomainError> {
    let (bookmarks, picture) = try_join!(
        deadline.run(repo.bookmarks(&record.username)),
        deadline.run(repo.picture(&record.username)),
    )
    .map_err(|e| DomainError::from_store(e, "user"))?;

    Ok(User::from_parts(record, bookmarks, picture))
}

/// Fetch and assemble a channel. `Ok(None)` if no such channel exists.
///
/// A channel row without an owner is `InvalidData`.
pub async fn assemble_channel(
    repo: &dyn ChannelRepository,
    deadline: Deadline,
    username: &str,
) -> Result<Option<Channel>, DomainError> {
    let record = deadline.run_as("channel", repo.find(username)).await?;
    match record {
        Some(record) => complete_channel(repo, deadline, record).await.map(Some),
        None => Ok(None),
    }
}

/// Assemble a channel around an already fetched row.
pub async fn complete_channel(
    repo: &dyn ChannelRepository,
    deadline: Deadline,
    record: ChannelRecord,
) -> Result<Channel, DomainError> {
    let username = record.username.as_str();
    let (admins, owner, posts, stickied, releases, official, picture) = try_join!(
        deadline.run(repo.admins(username)),
        deadline.run(repo.owner(username)),
        deadline.run(repo.post_ids(username)),
        deadline.run(repo.stickied_post_ids(username)),
        deadline.run(repo.release_ids(username)),
        deadline.run(repo.official_release_ids(username)),
        deadline.run(repo.picture(username)),
    )
    .map_err(|e| DomainError::from_store(e, "channel"))?;

    let owner = owner.ok_or_else(|| {
        DomainError::invalid(format!("channel {} has no owner", record.username))
    })?;

    Ok(Channel {
        username: record.username,
        name: record.name,
        description: record.description,
        created_at: record.created_at,
        owner_username: owner,
        admin_usernames: admins,
        post_ids: posts,
        stickied_post_ids: stickied,
        release_ids: releases,
        official_release_ids: official,
        picture_url: picture,
    })
}

/// Fetch and assemble a post. `Ok(None)` if no such post exists.
pub async fn assemble_post(
    repo: &dyn PostRepository,
    deadline: Deadline,
    id: i32,
) -> Result<Option<Post>, DomainError> {
    let (record, comment_ids) = try_join!(
        deadline.run(repo.find(id)),
        deadline.run(repo.comment_ids(id)),
    )
    .map_err(|e| DomainError::from_store(e, "post"))?;

    Ok(record.map(|record| Post::from_parts(record, comment_ids)))
}

/// Assemble a post around an already fetched row.
pub async fn complete_post(
    repo: &dyn PostRepository,
    deadline: Deadline,
    record: PostRecord,
) -> Result<Post, DomainError> {
    let comment_ids = deadline.run_as("post", repo.comment_ids(record.id)).await?;
    Ok(Post::from_parts(record, comment_ids))
}

/// Fetch and assemble a feed. `Ok(None)` if the owner has no feed.
pub async fn assemble_feed(
    repo: &dyn FeedRepository,
    deadline: Deadline,
    owner: &str,
) -> Result<Option<Feed>, DomainError> {
    let (sorting, subscriptions) = try_join!(
        deadline.run(repo.sorting(owner)),
        deadline.run(repo.subscriptions(owner)),
    )
    .map_err(|e| DomainError::from_store(e, "feed"))?;

    Ok(sorting.map(|sorting| Feed {
        owner_username: owner.to_string(),
        sorting,
        subscriptions,
    }))
}

/// Resolve foreign ids in order through `fetch`, failing if any one fails.
pub async fn resolve_ids<T, F, Fut>(ids: &[i32], fetch: F) -> Result<Vec<T>, DomainError>
where
    F: FnMut(i32) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    try_join_all(ids.iter().copied().map(fetch)).await
}
