//! Channel Service Tests

use futures::future::join_all;
use pretty_assertions::assert_eq;

use issue_server::domain::{ChannelPatch, NewChannel, NewRelease, ReleaseMetadata, MAX_STICKIED_POSTS};
use issue_server::shared::error::DomainError;

use super::{add_channel, add_post, add_user};
use crate::common::{services, unique_username};

#[tokio::test]
async fn test_creator_is_sole_admin_and_owner() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    assert_eq!(channel.owner_username, owner.username);
    assert_eq!(channel.admin_usernames, vec![owner.username.clone()]);
    assert_eq!(store.owners_of(&channel.username), vec![owner.username]);
}

#[tokio::test]
async fn test_added_channel_is_served_from_cache_while_storage_is_down() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    store.set_online(false);
    let cached = services.channels.get_channel(&channel.username).await.unwrap();
    assert_eq!(cached, channel);

    let missing = services.channels.get_channel("nochannel").await;
    assert!(matches!(missing, Err(DomainError::Internal(_))));
}

#[tokio::test]
async fn test_failed_owner_write_removes_channel_again() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    store.fail_on("channels.change_owner");
    let username = unique_username();

    let result = services
        .channels
        .add_channel(NewChannel {
            username: username.clone(),
            name: "Half Written".into(),
            description: None,
            owner_username: owner.username.clone(),
        })
        .await;

    assert!(matches!(result, Err(DomainError::PersistencePartial(_))));
    assert!(store.channel_row(&username).is_none());
    assert!(matches!(
        services.channels.get_channel(&username).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_unknown_owner_is_not_found() {
    let (services, _store) = services();
    let result = services
        .channels
        .add_channel(NewChannel {
            username: unique_username(),
            name: "Orphan".into(),
            description: None,
            owner_username: "nobodyhere".into(),
        })
        .await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_change_owner_leaves_exactly_one_owner() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let admin = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    services
        .channels
        .add_admin(&channel.username, &admin.username)
        .await
        .unwrap();
    let channel = services
        .channels
        .change_owner(&channel.username, &admin.username)
        .await
        .unwrap();

    assert_eq!(channel.owner_username, admin.username);
    assert!(channel.is_admin(&owner.username));
    assert_eq!(store.owners_of(&channel.username), vec![admin.username.clone()]);

    // Only admins can become owner
    let stranger = add_user(&services).await;
    let result = services
        .channels
        .change_owner(&channel.username, &stranger.username)
        .await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_owner_cannot_be_removed_from_admins() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    let result = services
        .channels
        .remove_admin(&channel.username, &owner.username)
        .await;
    assert!(matches!(result, Err(DomainError::InvalidData(_))));

    let result = services.channels.add_admin(&channel.username, &owner.username).await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn test_stickied_posts_are_capped() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    let mut posts = Vec::new();
    for i in 0..=MAX_STICKIED_POSTS {
        posts.push(add_post(&services, &channel.username, &owner.username, &format!("Notice {}", i)).await);
    }

    for post in &posts[..MAX_STICKIED_POSTS] {
        services.channels.sticky_post(&channel.username, post.id).await.unwrap();
    }
    // Stickying again is a no-op
    let channel_after = services
        .channels
        .sticky_post(&channel.username, posts[0].id)
        .await
        .unwrap();
    assert_eq!(channel_after.stickied_post_ids.len(), MAX_STICKIED_POSTS);

    let result = services
        .channels
        .sticky_post(&channel.username, posts[MAX_STICKIED_POSTS].id)
        .await;
    assert!(matches!(result, Err(DomainError::StickiedPostFull)));

    services
        .channels
        .unsticky_post(&channel.username, posts[0].id)
        .await
        .unwrap();
    let channel_after = services
        .channels
        .sticky_post(&channel.username, posts[MAX_STICKIED_POSTS].id)
        .await
        .unwrap();
    assert!(channel_after.is_stickied(posts[MAX_STICKIED_POSTS].id));
}

#[tokio::test]
async fn test_concurrent_stickies_respect_the_cap() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    let mut posts = Vec::new();
    for i in 0..=MAX_STICKIED_POSTS {
        posts.push(add_post(&services, &channel.username, &owner.username, &format!("Rush {}", i)).await);
    }
    // Every request starts from the same cached channel with no stickies
    services.channels.get_channel(&channel.username).await.unwrap();

    let results = join_all(
        posts
            .iter()
            .map(|post| services.channels.sticky_post(&channel.username, post.id)),
    )
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), MAX_STICKIED_POSTS);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(DomainError::StickiedPostFull))));
    assert_eq!(store.sticky_count(&channel.username), MAX_STICKIED_POSTS);

    let channel = services.channels.get_channel(&channel.username).await.unwrap();
    assert_eq!(channel.stickied_post_ids.len(), MAX_STICKIED_POSTS);
}

#[tokio::test]
async fn test_sticky_requires_own_post() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let mine = add_channel(&services, &owner.username).await;
    let other = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &other.username, &owner.username, "Elsewhere").await;

    let result = services.channels.sticky_post(&mine.username, post.id).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_channel_removes_its_posts() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Farewell").await;

    services.channels.delete_channel(&channel.username).await.unwrap();

    assert!(matches!(
        services.channels.get_channel(&channel.username).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        services.posts.get_post(post.id).await,
        Err(DomainError::NotFound(_))
    ));
    assert_eq!(store.post_count(), 0);
}

#[tokio::test]
async fn test_rename_channel_keeps_posts() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Moved").await;

    let renamed = unique_username();
    let updated = services
        .channels
        .update_channel(
            &channel.username,
            ChannelPatch {
                username: Some(renamed.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.username, renamed);
    assert_eq!(updated.post_ids, vec![post.id]);
    assert_eq!(updated.description, channel.description);
    let post = services.posts.get_post(post.id).await.unwrap();
    assert_eq!(post.channel_username, renamed);
}

#[tokio::test]
async fn test_official_catalog() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Out now").await;
    let release = services
        .releases
        .add_release(NewRelease {
            owner_channel: channel.username.clone(),
            content: "cover.png".into(),
            metadata: ReleaseMetadata {
                title: "Volume 1".into(),
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!release.official);

    let channel_after = services
        .channels
        .add_official_release(&channel.username, release.id, post.id)
        .await
        .unwrap();
    assert_eq!(channel_after.official_release_ids, vec![release.id]);
    assert!(services.releases.get_release(release.id).await.unwrap().official);

    let again = services
        .channels
        .add_official_release(&channel.username, release.id, post.id)
        .await;
    assert!(matches!(again, Err(DomainError::Conflict(_))));

    services
        .channels
        .remove_official_release(&channel.username, release.id)
        .await
        .unwrap();
    assert!(!services.releases.get_release(release.id).await.unwrap().official);
}
