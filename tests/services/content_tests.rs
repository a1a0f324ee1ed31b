//! Post, Comment, Release and Search Service Tests

use std::collections::HashSet;

use futures::future::join_all;
use pretty_assertions::assert_eq;

use issue_server::domain::{
    NewComment, NewPost, NewRelease, Page, PostPatch, PostSortBy, ReleaseKind, ReleaseMetadata,
    ReleasePatch, SearchQuery, SortOrder,
};
use issue_server::shared::error::DomainError;

use super::{add_channel, add_post, add_user};
use crate::common::services;

// --- Posts ---

#[tokio::test]
async fn test_only_admins_can_post() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let outsider = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    let result = services
        .posts
        .add_post(NewPost {
            channel_username: channel.username.clone(),
            posted_by: outsider.username.clone(),
            title: "Drive-by".into(),
            content: String::new(),
        })
        .await;
    assert!(matches!(result, Err(DomainError::Unauthorized(_))));

    let result = services
        .posts
        .add_post(NewPost {
            channel_username: "nochannel".into(),
            posted_by: owner.username.clone(),
            title: "Lost".into(),
            content: String::new(),
        })
        .await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_new_post_shows_up_in_channel() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    // Channel is cached now; the post must evict it
    services.channels.get_channel(&channel.username).await.unwrap();

    let post = add_post(&services, &channel.username, &owner.username, "Fresh").await;

    let channel = services.channels.get_channel(&channel.username).await.unwrap();
    assert_eq!(channel.post_ids, vec![post.id]);
}

#[tokio::test]
async fn test_post_sparse_update_and_delete() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Draft").await;

    let updated = services
        .posts
        .update_post(
            post.id,
            PostPatch {
                title: Some("Final".into()),
                content: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.content, post.content);

    services.posts.delete_post(post.id).await.unwrap();
    assert!(matches!(
        services.posts.get_post(post.id).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        services.posts.delete_post(post.id).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_concurrent_adds_are_all_retrievable() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    let results = join_all((0..16).map(|i| {
        services.posts.add_post(NewPost {
            channel_username: channel.username.clone(),
            posted_by: owner.username.clone(),
            title: format!("Parallel {}", i),
            content: String::new(),
        })
    }))
    .await;

    let posts: Vec<_> = results
        .into_iter()
        .map(|result| result.expect("post added"))
        .collect();
    let ids: HashSet<i32> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 16);

    for post in &posts {
        let fetched = services.posts.get_post(post.id).await.unwrap();
        assert_eq!(&fetched, post);
    }
    let channel = services.channels.get_channel(&channel.username).await.unwrap();
    assert_eq!(channel.post_ids.len(), 16);
}

#[tokio::test]
async fn test_concurrent_updates_leave_one_whole_value() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Contested").await;

    let results = join_all((0..12).map(|i| {
        services.posts.update_post(
            post.id,
            PostPatch {
                title: Some(format!("Title {}", i)),
                content: Some(format!("Content {}", i)),
            },
        )
    }))
    .await;
    for result in results {
        result.expect("post updated");
    }

    let cached = services.posts.get_post(post.id).await.unwrap();
    let suffix = cached.title.trim_start_matches("Title ");
    assert_eq!(cached.content, format!("Content {}", suffix));

    // Storage and cache agree once writes settle
    store.set_online(false);
    let again = services.posts.get_post(post.id).await.unwrap();
    assert_eq!(again, cached);
}

#[tokio::test]
async fn test_search_returns_newest_page_descending() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;

    let mut posts = Vec::new();
    for i in 0..5 {
        posts.push(add_post(&services, &channel.username, &owner.username, &format!("Issue {}", i)).await);
    }

    let found = services
        .posts
        .search_posts(SearchQuery::new(
            "issue",
            PostSortBy::CreationTime,
            SortOrder::Descending,
            Page::new(2, 0).unwrap(),
        ))
        .await
        .unwrap();

    let ids: Vec<i32> = found.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![posts[4].id, posts[3].id]);
}

#[tokio::test]
async fn test_search_page_is_capped() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    add_post(&services, &channel.username, &owner.username, "Only").await;

    let found = services
        .posts
        .search_posts(SearchQuery::new(
            "",
            PostSortBy::Title,
            SortOrder::Ascending,
            Page::new(10_000, 0).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}

// --- Comments ---

#[tokio::test]
async fn test_comment_threads() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Discuss").await;

    let root = services
        .comments
        .add_comment(NewComment {
            post_id: post.id,
            reply_to: None,
            commenter: owner.username.clone(),
            content: "First!".into(),
        })
        .await
        .unwrap();
    let reply = services
        .comments
        .add_comment(NewComment {
            post_id: post.id,
            reply_to: Some(root.id),
            commenter: owner.username.clone(),
            content: "Replying".into(),
        })
        .await
        .unwrap();

    let roots = services
        .comments
        .get_comments(post.id, SortOrder::Descending, Page::default())
        .await
        .unwrap();
    assert_eq!(roots, vec![root.clone()]);

    let replies = services
        .comments
        .get_replies(root.id, SortOrder::Ascending, Page::default())
        .await
        .unwrap();
    assert_eq!(replies, vec![reply.clone()]);

    let post_after = services.posts.get_post(post.id).await.unwrap();
    assert_eq!(post_after.comment_ids.len(), 2);

    // Deleting the root takes the reply along
    services.comments.delete_comment(root.id).await.unwrap();
    assert!(matches!(
        services.comments.get_comment(reply.id).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(services.posts.get_post(post.id).await.unwrap().comment_ids.is_empty());
}

#[tokio::test]
async fn test_delete_reaches_replies_below_an_uncached_reply() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Deep").await;

    let mut parent = None;
    let mut thread = Vec::new();
    for content in ["Root", "Middle", "Leaf"] {
        let comment = services
            .comments
            .add_comment(NewComment {
                post_id: post.id,
                reply_to: parent,
                commenter: owner.username.clone(),
                content: content.into(),
            })
            .await
            .unwrap();
        parent = Some(comment.id);
        thread.push(comment);
    }
    let (root, middle, leaf) = (&thread[0], &thread[1], &thread[2]);

    // Leaf stays cached while the reply linking it to the root is cold
    services.comments.get_comment(leaf.id).await.unwrap();
    services.caches.comments.invalidate(&middle.id);

    services.comments.delete_comment(root.id).await.unwrap();

    assert!(!services.caches.comments.contains(&leaf.id));
    for id in [root.id, middle.id, leaf.id] {
        assert!(matches!(
            services.comments.get_comment(id).await,
            Err(DomainError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn test_deleted_comment_is_not_found() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Gone").await;
    let comment = services
        .comments
        .add_comment(NewComment {
            post_id: post.id,
            reply_to: None,
            commenter: owner.username.clone(),
            content: "Soon removed".into(),
        })
        .await
        .unwrap();
    services.comments.get_comment(comment.id).await.unwrap();

    services.comments.delete_comment(comment.id).await.unwrap();

    assert!(matches!(
        services.comments.get_comment(comment.id).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        services.comments.delete_comment(comment.id).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_added_comment_is_served_from_cache_while_storage_is_down() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Cached").await;
    let comment = services
        .comments
        .add_comment(NewComment {
            post_id: post.id,
            reply_to: None,
            commenter: owner.username.clone(),
            content: "Still here".into(),
        })
        .await
        .unwrap();

    store.set_online(false);
    let cached = services.comments.get_comment(comment.id).await.unwrap();
    assert_eq!(cached, comment);

    let missing = services.comments.get_comment(comment.id + 1000).await;
    assert!(matches!(missing, Err(DomainError::Internal(_))));
}

#[tokio::test]
async fn test_reply_must_stay_on_its_post() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let first = add_post(&services, &channel.username, &owner.username, "One").await;
    let second = add_post(&services, &channel.username, &owner.username, "Two").await;

    let root = services
        .comments
        .add_comment(NewComment {
            post_id: first.id,
            reply_to: None,
            commenter: owner.username.clone(),
            content: "Here".into(),
        })
        .await
        .unwrap();

    let result = services
        .comments
        .add_comment(NewComment {
            post_id: second.id,
            reply_to: Some(root.id),
            commenter: owner.username.clone(),
            content: "There".into(),
        })
        .await;
    assert!(matches!(result, Err(DomainError::InvalidData(_))));
}

#[tokio::test]
async fn test_update_comment_content() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Edits").await;
    let comment = services
        .comments
        .add_comment(NewComment {
            post_id: post.id,
            reply_to: None,
            commenter: owner.username.clone(),
            content: "Typo".into(),
        })
        .await
        .unwrap();

    let updated = services
        .comments
        .update_comment(comment.id, "Fixed")
        .await
        .unwrap();
    assert_eq!(updated.content, "Fixed");
    assert_eq!(updated.created_at, comment.created_at);

    assert!(matches!(
        services.comments.update_comment(comment.id, "  ").await,
        Err(DomainError::InvalidData(_))
    ));
}

// --- Releases ---

#[tokio::test]
async fn test_release_sparse_update() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let release = services
        .releases
        .add_release(NewRelease {
            owner_channel: channel.username.clone(),
            kind: ReleaseKind::Text,
            content: "Chapter text".into(),
            metadata: ReleaseMetadata {
                title: "Chapter 7".into(),
                genres: vec!["drama".into()],
                description: Some("Rain".into()),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    let updated = services
        .releases
        .update_release(
            release.id,
            ReleasePatch {
                description: Some(None),
                authors: Some(vec!["Ines".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.metadata.title, "Chapter 7");
    assert_eq!(updated.metadata.genres, vec!["drama".to_string()]);
    assert_eq!(updated.metadata.authors, vec!["Ines".to_string()]);
    assert_eq!(updated.metadata.description, None);
    assert_eq!(updated.kind, ReleaseKind::Text);

    let channel = services.channels.get_channel(&channel.username).await.unwrap();
    assert_eq!(channel.release_ids, vec![release.id]);

    services.releases.delete_release(release.id).await.unwrap();
    assert!(matches!(
        services.releases.get_release(release.id).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_added_release_is_served_from_cache_while_storage_is_down() {
    let (services, store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let release = services
        .releases
        .add_release(NewRelease {
            owner_channel: channel.username.clone(),
            kind: ReleaseKind::Text,
            content: "Chapter text".into(),
            metadata: ReleaseMetadata {
                title: "Chapter 8".into(),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    store.set_online(false);
    let cached = services.releases.get_release(release.id).await.unwrap();
    assert_eq!(cached, release);

    let missing = services.releases.get_release(release.id + 1000).await;
    assert!(matches!(missing, Err(DomainError::Internal(_))));
}

// --- Search ---

#[tokio::test]
async fn test_cross_entity_search() {
    let (services, _store) = services();
    let owner = add_user(&services).await;
    let channel = add_channel(&services, &owner.username).await;
    let post = add_post(&services, &channel.username, &owner.username, "Lantern festival").await;
    services
        .comments
        .add_comment(NewComment {
            post_id: post.id,
            reply_to: None,
            commenter: owner.username.clone(),
            content: "Loved the LANTERN scene".into(),
        })
        .await
        .unwrap();

    let results = services
        .search
        .search("lantern", Page::default())
        .await
        .unwrap();
    assert_eq!(results.posts.len(), 1);
    assert_eq!(results.comments.len(), 1);
    assert!(results.releases.is_empty());

    let nothing = services.search.search("zeppelin", Page::default()).await.unwrap();
    assert!(nothing.is_empty());
}
