//! Feed and Auth Service Tests

use pretty_assertions::assert_eq;

use issue_server::domain::{FeedSorting, NewComment, Page, Post};
use issue_server::shared::error::DomainError;

use super::{add_channel, add_post, add_user};
use crate::common::{services, PASSWORD};

#[tokio::test]
async fn test_new_user_gets_default_feed() {
    let (services, store) = services();
    let user = add_user(&services).await;

    store.set_online(false);
    let feed = services.feeds.get_feed(&user.username).await.unwrap();
    assert_eq!(feed.sorting, FeedSorting::New);
    assert!(feed.subscriptions.is_empty());
}

#[tokio::test]
async fn test_subscriptions() {
    let (services, _store) = services();
    let user = add_user(&services).await;
    let channel = add_channel(&services, &user.username).await;

    let feed = services
        .feeds
        .subscribe(&user.username, &channel.username)
        .await
        .unwrap();
    assert!(feed.is_subscribed(&channel.username));

    let again = services.feeds.subscribe(&user.username, &channel.username).await;
    assert!(matches!(again, Err(DomainError::Conflict(_))));

    let feed = services
        .feeds
        .unsubscribe(&user.username, &channel.username)
        .await
        .unwrap();
    assert!(feed.subscriptions.is_empty());

    let again = services.feeds.unsubscribe(&user.username, &channel.username).await;
    assert!(matches!(again, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_feed_posts_follow_sorting() {
    let (services, _store) = services();
    let user = add_user(&services).await;
    let followed = add_channel(&services, &user.username).await;
    let ignored = add_channel(&services, &user.username).await;

    let older = add_post(&services, &followed.username, &user.username, "Older").await;
    let newer = add_post(&services, &followed.username, &user.username, "Newer").await;
    add_post(&services, &ignored.username, &user.username, "Unseen").await;
    services
        .comments
        .add_comment(NewComment {
            post_id: older.id,
            reply_to: None,
            commenter: user.username.clone(),
            content: "Still the best one".into(),
        })
        .await
        .unwrap();

    services
        .feeds
        .subscribe(&user.username, &followed.username)
        .await
        .unwrap();

    let ids = |posts: Vec<Post>| posts.into_iter().map(|p| p.id).collect::<Vec<_>>();

    let by_new = services
        .feeds
        .get_feed_posts(&user.username, None, Page::default())
        .await
        .unwrap();
    assert_eq!(ids(by_new), vec![newer.id, older.id]);

    let by_top = services
        .feeds
        .get_feed_posts(&user.username, Some(FeedSorting::Top), Page::default())
        .await
        .unwrap();
    assert_eq!(ids(by_top), vec![older.id, newer.id]);

    services
        .feeds
        .set_sorting(&user.username, FeedSorting::Hot)
        .await
        .unwrap();
    let by_hot = services
        .feeds
        .get_feed_posts(&user.username, None, Page::new(1, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(ids(by_hot), vec![older.id]);
}

#[tokio::test]
async fn test_deleted_channel_leaves_feeds() {
    let (services, _store) = services();
    let user = add_user(&services).await;
    let channel = add_channel(&services, &user.username).await;
    services
        .feeds
        .subscribe(&user.username, &channel.username)
        .await
        .unwrap();

    services.channels.delete_channel(&channel.username).await.unwrap();

    let feed = services.feeds.get_feed(&user.username).await.unwrap();
    assert!(!feed.is_subscribed(&channel.username));
}

// --- Auth ---

#[tokio::test]
async fn test_login_refresh_logout() {
    let (services, _store) = services();
    let user = add_user(&services).await;

    let tokens = services.auth.login(&user.username, PASSWORD).await.unwrap();
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(
        services.auth.authenticate(&tokens.access_token).await.unwrap(),
        user.username
    );

    let refreshed = services
        .auth
        .refresh(&user.username, &tokens.refresh_token)
        .await
        .unwrap();
    assert_ne!(refreshed.refresh_token, tokens.refresh_token);

    // The old refresh token is spent
    let reused = services.auth.refresh(&user.username, &tokens.refresh_token).await;
    assert!(matches!(reused, Err(DomainError::Unauthorized(_))));

    services.auth.logout(&user.username).await.unwrap();
    let after = services.auth.authenticate(&refreshed.access_token).await;
    assert!(matches!(after, Err(DomainError::Unauthorized(_))));
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let (services, _store) = services();
    let user = add_user(&services).await;

    let result = services.auth.login(&user.username, "not-the-password").await;
    assert!(matches!(result, Err(DomainError::Unauthorized(_))));

    let result = services.auth.authenticate("garbage.token.value").await;
    assert!(matches!(result, Err(DomainError::Unauthorized(_))));
}
