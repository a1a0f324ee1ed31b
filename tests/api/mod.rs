//! REST API Tests
//!
//! Requests go through the full router, middleware included, against the
//! in-memory store.

mod auth_tests;
mod channel_tests;
mod health_tests;
