//! In-memory document store backend for testing and development.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, RwLock, RwLockWriteGuard};

use crate::{
    DocumentStore, SearchHit, SearchReply, SortDirection, StoreError, StoreResult, Subscription,
};

/// Broadcast ring size per channel. Subscribers that fall further behind
/// than this lose messages, which mirrors a real pub/sub backend.
const CHANNEL_CAPACITY: usize = 256;

struct MemoryState {
    /// Documents keyed by full key. BTreeMap gives deterministic
    /// enumeration order for prefix scans.
    documents: BTreeMap<String, String>,
    /// Expiry deadlines for keys written through `set_if_absent`.
    expiries: HashMap<String, Instant>,
}

impl MemoryState {
    fn purge_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .expiries
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.expiries.remove(&key);
            self.documents.remove(&key);
        }
    }
}

/// In-process [`DocumentStore`] with documents, expiring leases, prefix
/// enumeration, substring full-text search, and broadcast pub/sub.
///
/// Concurrency-safe behind a `tokio::sync::RwLock`; suitable for tests,
/// development, and single-process deployments.
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                documents: BTreeMap::new(),
                expiries: HashMap::new(),
            }),
            channels: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Write-lock the state with expired leases purged.
    async fn state(&self) -> RwLockWriteGuard<'_, MemoryState> {
        let mut state = self.state.write().await;
        state.purge_expired();
        state
    }

    /// Number of live documents, for test assertions.
    pub async fn len(&self) -> usize {
        self.state().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn exists(&self, key: &str) -> StoreResult<u64> {
        self.ensure_open()?;
        let state = self.state().await;
        Ok(u64::from(state.documents.contains_key(key)))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.ensure_open()?;
        let state = self.state().await;
        Ok(state.documents.get(key).cloned())
    }

    async fn set(&self, key: &str, document: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let mut state = self.state().await;
        state.documents.insert(key.to_string(), document.to_string());
        // A plain set clears any lease expiry on the key.
        state.expiries.remove(key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        self.ensure_open()?;
        let mut state = self.state().await;
        state.expiries.remove(key);
        Ok(u64::from(state.documents.remove(key).is_some()))
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        let state = self.state().await;
        Ok(state
            .documents
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn search(
        &self,
        index: &str,
        query: &str,
        offset: usize,
        limit: usize,
        _sort_by: &str,
        sort_dir: SortDirection,
    ) -> StoreResult<SearchReply> {
        self.ensure_open()?;
        let state = self.state().await;

        // Substring matching stands in for the real full-text engine;
        // "*" matches every document under the index prefix.
        let mut keys: Vec<&String> = state
            .documents
            .iter()
            .filter(|(key, document)| {
                key.starts_with(index) && (query == "*" || document.contains(query))
            })
            .map(|(key, _)| key)
            .collect();
        if sort_dir == SortDirection::Desc {
            keys.reverse();
        }

        let total = keys.len() as u64;
        let hits = keys
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|key| SearchHit { key: key.clone(), score: 1.0 })
            .collect();

        Ok(SearchReply { total, hits })
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.ensure_open()?;
        let mut state = self.state().await;
        if state.documents.contains_key(key) {
            return Ok(false);
        }
        state.documents.insert(key.to_string(), value.to_string());
        if !ttl.is_zero() {
            state.expiries.insert(key.to_string(), Instant::now() + ttl);
        }
        Ok(true)
    }

    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(channel) {
            // A send error just means there are currently no subscribers.
            let _ = sender.send(payload.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<Subscription> {
        self.ensure_open()?;
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        let mut source = sender.subscribe();

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(rx))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_open()
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders ends every forwarding task, closing all
        // open subscriptions.
        self.channels.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_exists_delete() {
        let store = MemoryBackend::new();

        assert_eq!(store.exists("app:user:1").await.unwrap(), 0);
        store.set("app:user:1", "{\"name\":\"alice\"}").await.unwrap();
        assert_eq!(store.exists("app:user:1").await.unwrap(), 1);
        assert_eq!(
            store.get("app:user:1").await.unwrap().as_deref(),
            Some("{\"name\":\"alice\"}")
        );

        assert_eq!(store.delete("app:user:1").await.unwrap(), 1);
        assert_eq!(store.delete("app:user:1").await.unwrap(), 0);
        assert_eq!(store.get("app:user:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn prefix_enumeration_is_ordered() {
        let store = MemoryBackend::new();
        store.set("app:user:2", "{}").await.unwrap();
        store.set("app:user:1", "{}").await.unwrap();
        store.set("app:order:9", "{}").await.unwrap();

        let keys = store.keys_with_prefix("app:user:").await.unwrap();
        assert_eq!(keys, vec!["app:user:1", "app:user:2"]);

        let all = store.keys_with_prefix("app:").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn set_if_absent_respects_existing_keys() {
        let store = MemoryBackend::new();
        assert!(store
            .set_if_absent("app:job:1:lock", "1", Duration::from_secs(30))
            .await
            .unwrap());
        assert!(!store
            .set_if_absent("app:job:1:lock", "1", Duration::from_secs(30))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn leases_expire() {
        let store = MemoryBackend::new();
        assert!(store
            .set_if_absent("app:job:1:lock", "1", Duration::from_millis(30))
            .await
            .unwrap());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.exists("app:job:1:lock").await.unwrap(), 0);
        assert!(store
            .set_if_absent("app:job:1:lock", "1", Duration::from_millis(30))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn plain_set_clears_lease() {
        let store = MemoryBackend::new();
        store
            .set_if_absent("app:flag", "1", Duration::from_millis(30))
            .await
            .unwrap();
        store.set("app:flag", "2").await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.exists("app:flag").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_pages_and_counts() {
        let store = MemoryBackend::new();
        for i in 0..5 {
            store
                .set(&format!("app:user:{i}"), &format!("{{\"team\":\"blue\",\"n\":{i}}}"))
                .await
                .unwrap();
        }
        store.set("app:user:9", "{\"team\":\"red\"}").await.unwrap();

        let reply = store
            .search("app", "blue", 0, 10, "key", SortDirection::Asc)
            .await
            .unwrap();
        assert_eq!(reply.total, 5);
        assert_eq!(reply.hits.len(), 5);
        assert_eq!(reply.hits[0].key, "app:user:0");

        let page = store
            .search("app", "blue", 2, 2, "key", SortDirection::Asc)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[0].key, "app:user:2");

        let desc = store
            .search("app", "blue", 0, 1, "key", SortDirection::Desc)
            .await
            .unwrap();
        assert_eq!(desc.hits[0].key, "app:user:4");

        let none = store
            .search("app", "green", 0, 10, "key", SortDirection::Asc)
            .await
            .unwrap();
        assert_eq!(none.total, 0);
        assert!(none.hits.is_empty());
    }

    #[tokio::test]
    async fn pubsub_delivers_in_order() {
        let store = MemoryBackend::new();
        let mut sub = store.subscribe("app:channel:events").await.unwrap();

        store.publish("app:channel:events", "one").await.unwrap();
        store.publish("app:channel:events", "two").await.unwrap();
        store.publish("app:channel:events", "three").await.unwrap();

        assert_eq!(sub.recv().await.as_deref(), Some("one"));
        assert_eq!(sub.recv().await.as_deref(), Some("two"));
        assert_eq!(sub.recv().await.as_deref(), Some("three"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let store = MemoryBackend::new();
        store.publish("app:channel:events", "dropped").await.unwrap();
    }

    #[tokio::test]
    async fn close_ends_subscriptions_and_rejects_operations() {
        let store = MemoryBackend::new();
        let mut sub = store.subscribe("app:channel:events").await.unwrap();

        store.close().await.unwrap();
        assert_eq!(sub.recv().await, None);

        assert!(matches!(store.ping().await, Err(StoreError::Closed)));
        assert!(matches!(store.get("app:user:1").await, Err(StoreError::Closed)));
    }
}
