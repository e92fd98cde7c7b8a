//! Session storage backends.
//!
//! The HTTP layer doesn't care WHERE session records live — it only needs
//! something that implements [`SessionStore`]. [`MemoryStore`] keeps them
//! in process; a Redis or database backend would implement the same trait.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::{SessionConfig, SessionData, SessionError, SessionToken};

/// Loads and saves session records by token.
///
/// Concurrency is the store's business: two requests from the same visitor
/// may load and save concurrently, and the last save wins.
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the record for `token`, or `None` if it doesn't exist or
    /// has expired.
    fn load(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<Option<SessionData>, SessionError>> + Send;

    /// Creates or replaces the record for `token` and resets its idle timer.
    fn save(
        &self,
        token: &SessionToken,
        data: SessionData,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Deletes the record for `token`. Deleting a missing record is not an
    /// error.
    fn destroy(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Entry {
    data: SessionData,
    touched: Instant,
}

/// An in-process [`SessionStore`].
///
/// Records vanish when the process exits. Clones share the same map, so
/// one clone can go to the HTTP layer and another to a sweeper task that
/// calls [`expire_stale`](Self::expire_stale) periodically.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<SessionToken, Entry>>>,
    lifetime: Duration,
}

impl MemoryStore {
    /// Creates an empty store whose records expire after `lifetime` of
    /// inactivity.
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: Arc::default(),
            lifetime,
        }
    }

    /// Creates an empty store using `config.lifetime_secs`.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(Duration::from_secs(config.lifetime_secs))
    }

    /// Removes every record idle for longer than the lifetime.
    ///
    /// Returns how many records were removed.
    pub async fn expire_stale(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.touched.elapsed() <= self.lifetime);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::info!(removed, "expired idle sessions");
        }
        removed
    }

    /// Number of stored records (expired ones included until swept).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl SessionStore for MemoryStore {
    async fn load(
        &self,
        token: &SessionToken,
    ) -> Result<Option<SessionData>, SessionError> {
        let entries = self.entries.read().await;
        let data = entries
            .get(token)
            .filter(|entry| entry.touched.elapsed() <= self.lifetime)
            .map(|entry| entry.data.clone());
        if data.is_none() {
            tracing::debug!(%token, "no live session for token");
        }
        Ok(data)
    }

    async fn save(
        &self,
        token: &SessionToken,
        data: SessionData,
    ) -> Result<(), SessionError> {
        self.entries.write().await.insert(
            token.clone(),
            Entry {
                data,
                touched: Instant::now(),
            },
        );
        Ok(())
    }

    async fn destroy(&self, token: &SessionToken) -> Result<(), SessionError> {
        self.entries.write().await.remove(token);
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
