//! Channel, Post and Comment API Tests

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{unique_username, TestApp};

async fn create_channel(app: &TestApp, token: &str) -> String {
    let username = unique_username();
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/channels",
            Some(json!({ "username": username, "name": "Night Owl Translations" })),
            Some(token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], username.as_str());
    username
}

async fn create_post(app: &TestApp, token: &str, channel: &str, title: &str) -> Value {
    let (status, body) = app
        .request(
            "POST",
            &format!("/api/v1/channels/{}/posts", channel),
            Some(json!({ "title": title, "content": "Read it here" })),
            Some(token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_channel_lifecycle() {
    let app = TestApp::new();
    let owner = unique_username();
    let token = app.register_and_login(&owner).await;
    let channel = create_channel(&app, &token).await;

    let (status, body) = app.get(&format!("/api/v1/channels/{}", channel)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_username"], owner.as_str());
    assert_eq!(body["admin_usernames"], json!([owner]));

    let (status, body) = app
        .request(
            "PATCH",
            &format!("/api/v1/channels/{}", channel),
            Some(json!({ "description": "Now with a description" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Now with a description");
    assert_eq!(body["name"], "Night Owl Translations");

    let (status, _) = app
        .request("DELETE", &format!("/api/v1/channels/{}", channel), None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/api/v1/channels/{}", channel)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 10001);
}

#[tokio::test]
async fn test_owner_account_delete_is_conflict() {
    let app = TestApp::new();
    let owner = unique_username();
    let token = app.register_and_login(&owner).await;
    let channel = create_channel(&app, &token).await;

    let (status, _) = app
        .request("DELETE", &format!("/api/v1/users/{}", owner), None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get(&format!("/api/v1/channels/{}", channel)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_username"], owner.as_str());
}

#[tokio::test]
async fn test_outsiders_cannot_manage_channel() {
    let app = TestApp::new();
    let owner_token = app.register_and_login(&unique_username()).await;
    let outsider_token = app.register_and_login(&unique_username()).await;
    let channel = create_channel(&app, &owner_token).await;

    let (status, _) = app
        .request(
            "PATCH",
            &format!("/api/v1/channels/{}", channel),
            Some(json!({ "name": "Taken over" })),
            Some(&outsider_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Posting is checked by the service: not an admin is unauthorized
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/channels/{}/posts", channel),
            Some(json!({ "title": "Spam" })),
            Some(&outsider_token),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_third_sticky_is_conflict() {
    let app = TestApp::new();
    let token = app.register_and_login(&unique_username()).await;
    let channel = create_channel(&app, &token).await;

    let mut ids = Vec::new();
    for title in ["Rules", "Schedule", "Recruiting"] {
        let post = create_post(&app, &token, &channel, title).await;
        ids.push(post["id"].as_i64().unwrap());
    }

    for id in &ids[..2] {
        let (status, _) = app
            .request(
                "PUT",
                &format!("/api/v1/channels/{}/stickies/{}", channel, id),
                None,
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/v1/channels/{}/stickies/{}", channel, ids[2]),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get(&format!("/api/v1/channels/{}/stickies", channel)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_comments_and_replies() {
    let app = TestApp::new();
    let owner_token = app.register_and_login(&unique_username()).await;
    let reader = unique_username();
    let reader_token = app.register_and_login(&reader).await;
    let channel = create_channel(&app, &owner_token).await;
    let post = create_post(&app, &owner_token, &channel, "Chapter 12").await;
    let post_id = post["id"].as_i64().unwrap();

    let (status, root) = app
        .request(
            "POST",
            &format!("/api/v1/posts/{}/comments", post_id),
            Some(json!({ "content": "Great chapter", "reply_to": -1 })),
            Some(&reader_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(root["commenter"], reader.as_str());
    assert!(root["reply_to"].is_null());
    let root_id = root["id"].as_i64().unwrap();

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/posts/{}/comments", post_id),
            Some(json!({ "content": "Agreed", "reply_to": root_id })),
            Some(&owner_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get(&format!("/api/v1/posts/{}/comments", post_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = app
        .get(&format!("/api/v1/posts/{}/comments/{}/replies", post_id, root_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["content"], "Agreed");

    // Only the author edits
    let (status, _) = app
        .request(
            "PATCH",
            &format!("/api/v1/posts/{}/comments/{}", post_id, root_id),
            Some(json!({ "content": "Edited by someone else" })),
            Some(&owner_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A channel admin may still delete it
    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/v1/posts/{}/comments/{}", post_id, root_id),
            None,
            Some(&owner_token),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.get(&format!("/api/v1/posts/{}", post_id)).await;
    assert_eq!(body["comment_ids"], json!([]));
}

#[tokio::test]
async fn test_search_endpoint() {
    let app = TestApp::new();
    let token = app.register_and_login(&unique_username()).await;
    let channel = create_channel(&app, &token).await;
    create_post(&app, &token, &channel, "Harbor lights").await;
    create_post(&app, &token, &channel, "Mountain pass").await;

    let (status, body) = app.get("/api/v1/search?pattern=harbor").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["empty"], false);

    let (status, body) = app.get("/api/v1/posts?sort=title&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["title"], "Harbor lights");

    let (status, _) = app.get("/api/v1/posts?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
