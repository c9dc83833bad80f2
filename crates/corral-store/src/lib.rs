//! # Corral Store - Document Store Abstraction
//!
//! Defines the [`DocumentStore`] trait: the set of backend primitives the
//! repository layer is built on. Backends are opaque to the rest of Corral;
//! the repository only ever sees this interface.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryBackend`] - a full in-process implementation for tests and
//!   development.
//! - `RedisBackend` - a Redis implementation behind the `redis` cargo
//!   feature, using plain keys for documents, `SET NX PX` for leases, and
//!   `FT.SEARCH` for full-text queries.
//!
//! A backend's connection object must be safe for concurrent use by many
//! logical operations; this crate adds no locking of its own.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub mod error;
pub mod factory;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use error::{StoreError, StoreResult};
pub use factory::{BackendType, DeploymentMode, StoreConfig, StoreFactory};
pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use redis::RedisBackend;

/// Sort direction for full-text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending sort order.
    Asc,
    /// Descending sort order.
    Desc,
}

impl SortDirection {
    /// Wire form of the direction (`"ASC"` / `"DESC"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One matched key in a search reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The matched key.
    pub key: String,
    /// Backend-assigned relevance score.
    pub score: f64,
}

/// Parsed full-text search result envelope.
///
/// `total` is the backend's total match count, which may exceed the number
/// of hits returned for the requested page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchReply {
    /// Total number of matches, before paging.
    pub total: u64,
    /// The matched keys for the requested page, in backend order.
    pub hits: Vec<SearchHit>,
}

/// An open subscription: an unbounded, ordered stream of opaque payloads.
///
/// The stream ends (`recv` returns `None`) when the backend subscription
/// closes, which happens on unsubscribe or connection loss.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<String>,
}

impl Subscription {
    /// Wrap a receiver as a subscription stream.
    pub fn new(rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self { rx }
    }

    /// Receive the next payload, or `None` once the stream has closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Unwrap into the underlying receiver.
    pub fn into_inner(self) -> mpsc::UnboundedReceiver<String> {
        self.rx
    }
}

/// Backend primitives required by the repository layer.
///
/// Documents are opaque text (the repository serializes values to JSON
/// before they reach a backend). Every operation is a single backend
/// round-trip; no primitive retries internally.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Number of existing keys among the given key (0 or 1).
    async fn exists(&self, key: &str) -> StoreResult<u64>;

    /// Fetch the document stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `document` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, document: &str) -> StoreResult<()>;

    /// Delete `key`, returning the number of keys removed (0 or 1).
    async fn delete(&self, key: &str) -> StoreResult<u64>;

    /// Enumerate all keys starting with `prefix`, in backend order.
    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Run a full-text query against the named search index.
    async fn search(
        &self,
        index: &str,
        query: &str,
        offset: usize,
        limit: usize,
        sort_by: &str,
        sort_dir: SortDirection,
    ) -> StoreResult<SearchReply>;

    /// Atomically set `key` to `value` with the given expiry, only if the
    /// key does not already exist. Returns whether the set happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Publish an opaque payload to a channel.
    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()>;

    /// Open a subscription to a channel.
    async fn subscribe(&self, channel: &str) -> StoreResult<Subscription>;

    /// Liveness check against the backend.
    async fn ping(&self) -> StoreResult<()>;

    /// Release the backend connection. Further operations fail.
    async fn close(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_direction_wire_form() {
        assert_eq!(SortDirection::Asc.as_str(), "ASC");
        assert_eq!(SortDirection::Desc.as_str(), "DESC");
    }
}
