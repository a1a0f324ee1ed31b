//! Service Tests
//!
//! Domain services over the in-memory store: cache behavior, compensation
//! and concurrency.

mod channel_tests;
mod content_tests;
mod feed_tests;
mod user_tests;

use issue_server::application::services::Services;
use issue_server::domain::{Channel, NewChannel, NewPost, Post, User};

use crate::common::{new_user, unique_username};

async fn add_user(services: &Services) -> User {
    services
        .users
        .add_user(new_user(&unique_username()))
        .await
        .expect("user added")
}

async fn add_channel(services: &Services, owner: &str) -> Channel {
    services
        .channels
        .add_channel(NewChannel {
            username: unique_username(),
            name: "Moonlit Scans".into(),
            description: Some("Weekly chapters".into()),
            owner_username: owner.to_string(),
        })
        .await
        .expect("channel added")
}

async fn add_post(services: &Services, channel: &str, posted_by: &str, title: &str) -> Post {
    services
        .posts
        .add_post(NewPost {
            channel_username: channel.to_string(),
            posted_by: posted_by.to_string(),
            title: title.to_string(),
            content: format!("{} body", title),
        })
        .await
        .expect("post added")
}
