//! Redis document store backend.
//!
//! Maps the [`DocumentStore`] primitives onto Redis commands: plain
//! GET/SET for documents, `SET NX PX` for expiring leases, `KEYS` for
//! prefix enumeration, `FT.SEARCH` for full-text queries, and native
//! pub/sub with a forwarding task per subscription.
//!
//! Only the standalone topology is implemented here; sentinel and cluster
//! modes are recognized in configuration but rejected at connect time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Value};
use tokio::sync::mpsc;

use crate::factory::{DeploymentMode, StoreConfig};
use crate::{
    DocumentStore, SearchHit, SearchReply, SortDirection, StoreError, StoreResult, Subscription,
};

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split a `host:port` endpoint, defaulting the port to 6379.
fn parse_addr(addr: &str) -> StoreResult<(String, u16)> {
    match addr.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| StoreError::Config(format!("invalid port in address: {}", addr)))?;
            Ok((host.to_string(), port))
        }
        None => Ok((addr.to_string(), 6379)),
    }
}

/// Redis-backed [`DocumentStore`].
///
/// Holds one multiplexed connection shared by all operations; the
/// underlying client is safe for concurrent use. Subscriptions open a
/// dedicated pub/sub connection each.
pub struct RedisBackend {
    client: Client,
    manager: ConnectionManager,
    closed: AtomicBool,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("client", &self.client)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connect to the backend described by `config`.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        if config.mode != DeploymentMode::Standalone {
            return Err(StoreError::Config(format!(
                "unsupported deployment mode: {}",
                config.mode.as_str()
            )));
        }
        let addr = config
            .addrs
            .first()
            .ok_or_else(|| StoreError::Config("no backend address configured".to_string()))?;
        let (host, port) = parse_addr(addr)?;

        let info = redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(host, port),
            redis: redis::RedisConnectionInfo {
                db: config.db,
                username: non_empty(&config.username),
                password: non_empty(&config.password),
                ..Default::default()
            },
        };

        let client = Client::open(info)?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;

        tracing::debug!(addr = %addr, db = config.db, "connected to redis");
        Ok(Self { client, manager, closed: AtomicBool::new(false) })
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn connection(&self) -> StoreResult<ConnectionManager> {
        self.ensure_open()?;
        Ok(self.manager.clone())
    }
}

fn value_as_string(value: Value) -> StoreResult<String> {
    match value {
        Value::BulkString(bytes) => String::from_utf8(bytes)
            .map_err(|_| StoreError::Protocol("non-utf8 string in search reply".to_string())),
        Value::SimpleString(s) => Ok(s),
        Value::Int(n) => Ok(n.to_string()),
        other => Err(StoreError::Protocol(format!(
            "expected string in search reply, got {:?}",
            other
        ))),
    }
}

fn value_as_f64(value: Value) -> StoreResult<f64> {
    match value {
        Value::Double(d) => Ok(d),
        Value::Int(n) => Ok(n as f64),
        Value::BulkString(_) | Value::SimpleString(_) => value_as_string(value)?
            .parse::<f64>()
            .map_err(|_| StoreError::Protocol("unparseable score in search reply".to_string())),
        other => Err(StoreError::Protocol(format!(
            "expected score in search reply, got {:?}",
            other
        ))),
    }
}

/// Parse the `FT.SEARCH ... NOCONTENT WITHSCORES` reply envelope:
/// `[total, key1, score1, key2, score2, ...]`.
fn parse_search_reply(value: Value) -> StoreResult<SearchReply> {
    let Value::Array(items) = value else {
        return Err(StoreError::Protocol("unexpected search reply shape".to_string()));
    };
    let mut items = items.into_iter();

    let total = match items.next() {
        Some(Value::Int(n)) if n >= 0 => n as u64,
        _ => return Err(StoreError::Protocol("missing total in search reply".to_string())),
    };

    let mut hits = Vec::new();
    while let Some(key) = items.next() {
        let key = value_as_string(key)?;
        let score = match items.next() {
            Some(value) => value_as_f64(value)?,
            None => {
                return Err(StoreError::Protocol(
                    "search reply ended mid key/score pair".to_string(),
                ))
            }
        };
        hits.push(SearchHit { key, score });
    }

    Ok(SearchReply { total, hits })
}

#[async_trait]
impl DocumentStore for RedisBackend {
    async fn exists(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.connection()?;
        let count: u64 = conn.exists(key).await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection()?;
        let document: Option<String> = conn.get(key).await?;
        Ok(document)
    }

    async fn set(&self, key: &str, document: &str) -> StoreResult<()> {
        let mut conn = self.connection()?;
        let _: () = conn.set(key, document).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.connection()?;
        let removed: u64 = conn.del(key).await?;
        Ok(removed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.connection()?;
        let keys: Vec<String> = conn.keys(format!("{}*", prefix)).await?;
        Ok(keys)
    }

    async fn search(
        &self,
        index: &str,
        query: &str,
        offset: usize,
        limit: usize,
        sort_by: &str,
        sort_dir: SortDirection,
    ) -> StoreResult<SearchReply> {
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("FT.SEARCH");
        cmd.arg(index)
            .arg(query)
            .arg("NOCONTENT")
            .arg("WITHSCORES")
            .arg("SORTBY")
            .arg(sort_by)
            .arg(sort_dir.as_str())
            .arg("LIMIT")
            .arg(offset)
            .arg(limit);
        let reply: Value = cmd.query_async(&mut conn).await?;
        parse_search_reply(reply)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if !ttl.is_zero() {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }
        // SET NX replies OK when the key was written and nil otherwise.
        let acquired: bool = cmd.query_async(&mut conn).await?;
        Ok(acquired)
    }

    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()> {
        let mut conn = self.connection()?;
        let _: () = conn.publish(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<Subscription> {
        self.ensure_open()?;
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut messages = pubsub.on_message();
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::warn!(error = %err, "dropping undecodable pub/sub payload");
                        continue;
                    }
                };
                if tx.send(payload).is_err() {
                    // Receiver gone; dropping the pub/sub connection
                    // unsubscribes.
                    break;
                }
            }
        });

        Ok(Subscription::new(rx))
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection()?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        // The multiplexed connection has no explicit shutdown; marking the
        // handle closed fails further operations and lets drops release it.
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_addr_forms() {
        assert_eq!(parse_addr("localhost:6380").unwrap(), ("localhost".to_string(), 6380));
        assert_eq!(parse_addr("localhost").unwrap(), ("localhost".to_string(), 6379));
        assert!(parse_addr("localhost:notaport").is_err());
    }

    #[test]
    fn parse_search_envelope() {
        let reply = Value::Array(vec![
            Value::Int(2),
            Value::BulkString(b"app:user:1".to_vec()),
            Value::BulkString(b"1.5".to_vec()),
            Value::BulkString(b"app:user:2".to_vec()),
            Value::Double(0.5),
        ]);
        let parsed = parse_search_reply(reply).unwrap();
        assert_eq!(parsed.total, 2);
        assert_eq!(parsed.hits.len(), 2);
        assert_eq!(parsed.hits[0].key, "app:user:1");
        assert_eq!(parsed.hits[0].score, 1.5);
        assert_eq!(parsed.hits[1].score, 0.5);
    }

    #[test]
    fn parse_search_empty_result() {
        let parsed = parse_search_reply(Value::Array(vec![Value::Int(0)])).unwrap();
        assert_eq!(parsed.total, 0);
        assert!(parsed.hits.is_empty());
    }

    #[test]
    fn parse_search_rejects_malformed_envelopes() {
        assert!(matches!(
            parse_search_reply(Value::Nil),
            Err(StoreError::Protocol(_))
        ));
        assert!(matches!(
            parse_search_reply(Value::Array(vec![])),
            Err(StoreError::Protocol(_))
        ));
        // Key without a score.
        assert!(matches!(
            parse_search_reply(Value::Array(vec![
                Value::Int(1),
                Value::BulkString(b"app:user:1".to_vec()),
            ])),
            Err(StoreError::Protocol(_))
        ));
    }

    #[test]
    fn rejects_non_standalone_modes() {
        let config = StoreConfig {
            mode: DeploymentMode::Cluster,
            addrs: vec!["localhost:6379".to_string()],
            ..StoreConfig::default()
        };
        let err = futures::executor::block_on(RedisBackend::connect(&config)).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
