//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, logging};
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(logging::track_metrics))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let size = state.db.size();
    let idle = state.db.num_idle() as u32;
    metrics::update_db_pool_stats(
        idle,
        size.saturating_sub(idle),
        state.settings.database.max_connections,
    );

    for (cache, entries) in state.services.caches.sizes() {
        metrics::set_cache_entries(cache, entries);
    }

    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics::gather_metrics(),
    )
}

/// API v1 routes. Reads are public; writes need a bearer token, which the
/// handlers demand through `AuthUser`.
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(channel_routes())
        .merge(post_routes())
        .merge(release_routes())
        .route("/search", get(handlers::search::search))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh_token))
        .route("/auth/logout", post(handlers::auth::logout))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(handlers::user::search_users).post(handlers::user::register),
        )
        .route(
            "/users/{username}",
            get(handlers::user::get_user)
                .patch(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route(
            "/users/{username}/bookmarks",
            get(handlers::user::get_bookmarks).post(handlers::user::add_bookmark),
        )
        .route(
            "/users/{username}/bookmarks/{post_id}",
            delete(handlers::user::delete_bookmark),
        )
        .route(
            "/users/{username}/picture",
            put(handlers::user::set_picture).delete(handlers::user::delete_picture),
        )
        .route("/users/{username}/feed", get(handlers::feed::get_feed))
        .route("/users/{username}/feed/sorting", put(handlers::feed::set_sorting))
        .route("/users/{username}/feed/posts", get(handlers::feed::get_feed_posts))
        .route(
            "/users/{username}/feed/channels/{channel}",
            put(handlers::feed::subscribe).delete(handlers::feed::unsubscribe),
        )
}

fn channel_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/channels",
            get(handlers::channel::search_channels).post(handlers::channel::create_channel),
        )
        .route(
            "/channels/{username}",
            get(handlers::channel::get_channel)
                .patch(handlers::channel::update_channel)
                .delete(handlers::channel::delete_channel),
        )
        .route("/channels/{username}/admins", post(handlers::channel::add_admin))
        .route(
            "/channels/{username}/admins/{admin}",
            delete(handlers::channel::remove_admin),
        )
        .route("/channels/{username}/owner", put(handlers::channel::change_owner))
        .route(
            "/channels/{username}/posts",
            get(handlers::channel::get_channel_posts).post(handlers::channel::create_post),
        )
        .route(
            "/channels/{username}/stickies",
            get(handlers::channel::get_stickied_posts),
        )
        .route(
            "/channels/{username}/stickies/{post_id}",
            put(handlers::channel::sticky_post).delete(handlers::channel::unsticky_post),
        )
        .route(
            "/channels/{username}/releases",
            get(handlers::channel::get_channel_releases)
                .post(handlers::channel::create_release),
        )
        .route(
            "/channels/{username}/official",
            get(handlers::channel::get_official_releases),
        )
        .route(
            "/channels/{username}/official/{release_id}",
            put(handlers::channel::add_official_release)
                .delete(handlers::channel::remove_official_release),
        )
        .route(
            "/channels/{username}/picture",
            put(handlers::channel::set_picture).delete(handlers::channel::delete_picture),
        )
}

fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(handlers::post::search_posts))
        .route(
            "/posts/{id}",
            get(handlers::post::get_post)
                .patch(handlers::post::update_post)
                .delete(handlers::post::delete_post),
        )
        .route(
            "/posts/{id}/comments",
            get(handlers::comment::get_comments).post(handlers::comment::create_comment),
        )
        .route(
            "/posts/{id}/comments/{comment_id}",
            get(handlers::comment::get_comment)
                .patch(handlers::comment::update_comment)
                .delete(handlers::comment::delete_comment),
        )
        .route(
            "/posts/{id}/comments/{comment_id}/replies",
            get(handlers::comment::get_replies),
        )
}

fn release_routes() -> Router<AppState> {
    Router::new()
        .route("/releases", get(handlers::release::search_releases))
        .route(
            "/releases/{id}",
            get(handlers::release::get_release)
                .patch(handlers::release::update_release)
                .delete(handlers::release::delete_release),
        )
}
