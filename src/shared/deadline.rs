//! Storage Deadlines
//!
//! Every repository call made by a domain service runs under a deadline.
//! Cache operations never do; they complete in bounded time.

use std::future::Future;
use std::time::Duration;

use super::error::{DomainError, StoreError};

/// Upper bound on a single storage call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Duration);

impl Deadline {
    pub fn new(limit: Duration) -> Self {
        Self(limit)
    }

    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub fn limit(&self) -> Duration {
        self.0
    }

    /// Await a storage future, failing with [`StoreError::Timeout`] once the
    /// deadline elapses.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.0, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.0.as_millis() as u64)),
        }
    }

    /// Like [`Deadline::run`], classifying the failure for `entity`.
    pub async fn run_as<T, F>(&self, entity: &str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.run(fut)
            .await
            .map_err(|e| DomainError::from_store(e, entity))
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self(Duration::from_secs(5))
    }
}
