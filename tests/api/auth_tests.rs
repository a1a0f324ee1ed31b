//! Authentication API Tests

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{unique_username, TestApp, PASSWORD};

#[tokio::test]
async fn test_register_with_valid_data() {
    let app = TestApp::new();
    let username = unique_username();

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/users",
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
                "first_name": "Nadia",
            })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["email"], format!("{}@example.com", username));
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/users",
            Some(json!({
                "username": unique_username(),
                "email": "not-an-email",
                "password": PASSWORD,
                "first_name": "Nadia",
            })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("email"));
}

#[tokio::test]
async fn test_register_with_short_password_fails() {
    let app = TestApp::new();

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/users",
            Some(json!({
                "username": unique_username(),
                "email": "short@example.com",
                "password": "short",
                "first_name": "Nadia",
            })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_with_taken_username_fails() {
    let app = TestApp::new();
    let username = unique_username();
    app.register_and_login(&username).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/users",
            Some(json!({
                "username": username,
                "email": "someone.else@example.com",
                "password": PASSWORD,
                "first_name": "Other",
            })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 10005);
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let app = TestApp::new();
    let username = unique_username();
    app.register_and_login(&username).await;

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "username": username, "password": "WrongPassword1" })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let app = TestApp::new();
    let username = unique_username();
    app.register_and_login(&username).await;

    let (_, tokens) = app
        .request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "username": username, "password": PASSWORD })),
            None,
        )
        .await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();

    let (status, refreshed) = app
        .request(
            "POST",
            "/api/v1/auth/refresh",
            Some(json!({ "username": username, "refresh_token": refresh_token })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["token_type"], "Bearer");
    let access_token = refreshed["access_token"].as_str().unwrap().to_string();

    let (status, _) = app
        .request("POST", "/api/v1/auth/logout", None, Some(&access_token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The session is gone, and the token with it
    let (status, _) = app
        .request("POST", "/api/v1/auth/logout", None, Some(&access_token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_without_token_fails() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/channels",
            Some(json!({ "username": unique_username(), "name": "Nope" })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 10003);
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let app = TestApp::new();

    let (status, _) = app
        .request("GET", "/api/v1/channels", None, Some("not-a-jwt"))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_can_only_edit_themselves() {
    let app = TestApp::new();
    let alice = unique_username();
    let bob = unique_username();
    app.register_and_login(&alice).await;
    let bob_token = app.register_and_login(&bob).await;

    let (status, _) = app
        .request(
            "PATCH",
            &format!("/api/v1/users/{}", alice),
            Some(json!({ "bio": "hijacked" })),
            Some(&bob_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Strangers see the public profile only
    let (status, body) = app
        .request("GET", &format!("/api/v1/users/{}", alice), None, Some(&bob_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "");
}
