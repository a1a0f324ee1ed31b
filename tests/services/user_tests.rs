//! User Service Tests

use pretty_assertions::assert_eq;

use issue_server::domain::{Page, SearchQuery, SortOrder, UserPatch, UserRepository, UserSortBy};
use issue_server::shared::error::{DomainError, StoreError};

use super::{add_channel, add_post, add_user};
use crate::common::{new_user, services, unique_username, PASSWORD};

#[tokio::test]
async fn test_added_user_is_served_from_cache_while_storage_is_down() {
    let (services, store) = services();
    let user = add_user(&services).await;

    store.set_online(false);
    let cached = services.users.get_user(&user.username).await.unwrap();
    assert_eq!(cached, user);

    let missing = services.users.get_user("nobodyhere").await;
    assert!(matches!(missing, Err(DomainError::Internal(_))));
}

#[tokio::test]
async fn test_get_after_delete_is_not_found() {
    let (services, store) = services();
    let user = add_user(&services).await;

    services.users.delete_user(&user.username).await.unwrap();

    let result = services.users.get_user(&user.username).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
    assert!(store.user_row(&user.username).is_none());
}

#[tokio::test]
async fn test_channel_owner_cannot_be_deleted() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let heir = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    let result = services.users.delete_user(&owner.username).await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));
    assert!(store.user_row(&owner.username).is_some());
    assert_eq!(store.owners_of(&channel.username), vec![owner.username.clone()]);

    // Storage refuses on its own too
    let result = UserRepository::delete(store.as_ref(), &owner.username).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));

    services
        .channels
        .add_admin(&channel.username, &heir.username)
        .await
        .unwrap();
    services
        .channels
        .change_owner(&channel.username, &heir.username)
        .await
        .unwrap();
    services.users.delete_user(&owner.username).await.unwrap();

    let channel = services.channels.get_channel(&channel.username).await.unwrap();
    assert_eq!(channel.owner_username, heir.username);
    assert_eq!(channel.admin_usernames, vec![heir.username.clone()]);
    assert_eq!(store.owners_of(&channel.username), vec![heir.username.clone()]);
}

#[tokio::test]
async fn test_sparse_update_keeps_untouched_fields() {
    let (services, _store) = services();
    let mut new = new_user(&unique_username());
    new.last_name = Some("Marlowe".into());
    new.bio = Some("Reads everything".into());
    let user = services.users.add_user(new).await.unwrap();

    let updated = services
        .users
        .update_user(
            &user.username,
            UserPatch {
                first_name: Some("Ada".into()),
                bio: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.first_name, "Ada");
    assert_eq!(updated.bio, None);
    assert_eq!(updated.last_name.as_deref(), Some("Marlowe"));
    assert_eq!(updated.email, user.email);
    assert_eq!(updated.password_hash, user.password_hash);
}

#[tokio::test]
async fn test_username_conflict_leaves_original_intact() {
    let (services, _store) = services();
    let original = add_user(&services).await;

    let mut duplicate = new_user(&original.username);
    duplicate.first_name = "Impostor".into();
    let result = services.users.add_user(duplicate).await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));

    let stored = services.users.get_user(&original.username).await.unwrap();
    assert_eq!(stored, original);
}

#[tokio::test]
async fn test_username_is_shared_with_channels() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    let result = services.users.add_user(new_user(&channel.username)).await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn test_failed_feed_write_removes_user_again() {
    let (services, store) = services();
    store.fail_on("feeds.create");
    let username = unique_username();

    let result = services.users.add_user(new_user(&username)).await;

    assert!(matches!(result, Err(DomainError::PersistencePartial(_))));
    assert!(store.user_row(&username).is_none());

    store.heal("feeds.create");
    assert!(services.users.add_user(new_user(&username)).await.is_ok());
}

#[tokio::test]
async fn test_rename_moves_authored_content() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Chapter 1").await;

    let renamed = unique_username();
    services
        .users
        .update_user(
            &owner.username,
            UserPatch {
                username: Some(renamed.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let post = services.posts.get_post(post.id).await.unwrap();
    assert_eq!(post.posted_by, renamed);
    let channel = services.channels.get_channel(&channel.username).await.unwrap();
    assert_eq!(channel.owner_username, renamed);
    assert!(matches!(
        services.users.get_user(&owner.username).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_bookmarks_resolve_in_bookmark_order() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let first = add_post(&services, &channel.username, &owner.username, "First").await;
    let second = add_post(&services, &channel.username, &owner.username, "Second").await;

    services.users.bookmark_post(&owner.username, second.id).await.unwrap();
    services.users.bookmark_post(&owner.username, first.id).await.unwrap();

    let posts = services.users.get_bookmarked_posts(&owner.username).await.unwrap();
    let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    services.users.delete_bookmark(&owner.username, second.id).await.unwrap();
    let result = services.users.delete_bookmark(&owner.username, second.id).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_verify_credentials() {
    let (services, _store) = services();
    let user = add_user(&services).await;

    assert!(services
        .users
        .verify_credentials(&user.username, PASSWORD)
        .await
        .is_ok());
    assert!(matches!(
        services.users.verify_credentials(&user.username, "wrong-password").await,
        Err(DomainError::Unauthorized(_))
    ));
    assert!(matches!(
        services.users.verify_credentials("ghostuser", PASSWORD).await,
        Err(DomainError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_search_by_username_ascending() {
    let (services, _store) = services();
    let first = add_user(&services).await;
    let second = add_user(&services).await;

    let found = services
        .users
        .search_users(SearchQuery::new(
            "",
            UserSortBy::Username,
            SortOrder::Ascending,
            Page::default(),
        ))
        .await
        .unwrap();

    let mut expected = vec![first.username, second.username];
    expected.sort();
    let names: Vec<String> = found.into_iter().map(|u| u.username).collect();
    assert_eq!(names, expected);
}
