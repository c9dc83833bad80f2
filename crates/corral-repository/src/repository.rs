//! Repository operations over a document store.
//!
//! A [`Repository`] owns a shared backend handle plus the immutable key
//! schema and exposes the entity-level operations: CRUD, pattern listing,
//! full-text search, distributed locking, and pub/sub. Every operation
//! renders its identifier through the schema first, so no unvalidated key
//! ever reaches the backend.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

use corral_store::{DocumentStore, SortDirection, StoreFactory, Subscription};
use corral_types::{Identifier, KeySchema};

use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, RepositoryResult};

/// Default page size for search queries.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Sentinel value stored under a lock key. Existence of the key is the
/// lock state; the value itself carries no meaning.
const LOCK_SENTINEL: &str = "1";

/// Parameters for a full-text search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Free-text query, passed through to the backend search engine.
    pub query: String,
    /// Number of matches to skip.
    pub offset: usize,
    /// Maximum number of matches to return.
    pub limit: usize,
    /// Field to sort by.
    pub sort_by: String,
    /// Sort direction.
    pub sort_dir: SortDirection,
}

impl SearchQuery {
    /// A query sorted ascending by `id` with the default page size.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            offset: 0,
            limit: DEFAULT_SEARCH_LIMIT,
            sort_by: "id".to_string(),
            sort_dir: SortDirection::Asc,
        }
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_dir: SortDirection) -> Self {
        self.sort_by = sort_by.into();
        self.sort_dir = sort_dir;
        self
    }
}

/// Entity repository over a schemaless document store.
///
/// Cheap to clone; all clones share one backend connection. The handle is
/// safe for concurrent use by any number of callers, and the key schema is
/// immutable for its lifetime.
///
/// # Example
///
/// ```
/// use corral_repository::{Repository, RepositoryConfig};
/// use corral_types::Identifier;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User { name: String }
///
/// # async fn demo() -> Result<(), corral_repository::RepositoryError> {
/// let repo = Repository::open(&RepositoryConfig::default()).await?;
/// let id = Identifier::entity("user", "42");
/// repo.create(&id, &User { name: "alice".into() }).await?;
/// let fetched: User = repo.read(&id).await?;
/// # let _ = fetched;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    schema: KeySchema,
}

impl Repository {
    /// Wrap an already-connected store with the given key schema.
    pub fn new(store: Arc<dyn DocumentStore>, schema: KeySchema) -> Self {
        Self { store, schema }
    }

    /// Connect a backend per `config` and build a repository on it.
    pub async fn open(config: &RepositoryConfig) -> RepositoryResult<Self> {
        let store = StoreFactory::create(&config.store).await?;
        let schema = KeySchema::new(&config.store.key_prefix, &config.store.key_separator);
        Ok(Self::new(store, schema))
    }

    /// The key schema this repository encodes identifiers with.
    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    /// Store a new entity. Fails with [`RepositoryError::AlreadyExists`]
    /// if the key is already present.
    ///
    /// The existence probe and the write are two separate backend calls;
    /// two concurrent creates of the same identifier can race past the
    /// probe, last write winning.
    #[tracing::instrument(skip_all, fields(identifier = %identifier))]
    pub async fn create<T: Serialize>(
        &self,
        identifier: &Identifier,
        value: &T,
    ) -> RepositoryResult<()> {
        let key = self.schema.key_for(identifier)?;
        if self.store.exists(&key).await? > 0 {
            return Err(RepositoryError::AlreadyExists);
        }
        let document = serde_json::to_string(value)?;
        self.store.set(&key, &document).await?;
        tracing::debug!(key = %key, "created entity");
        Ok(())
    }

    /// Fetch an entity and deserialize it into `T`.
    #[tracing::instrument(skip_all, fields(identifier = %identifier))]
    pub async fn read<T: DeserializeOwned>(&self, identifier: &Identifier) -> RepositoryResult<T> {
        let key = self.schema.key_for(identifier)?;
        match self.store.get(&key).await? {
            Some(document) => Ok(serde_json::from_str(&document)?),
            None => Err(RepositoryError::NotFound),
        }
    }

    /// Overwrite an existing entity. Fails with
    /// [`RepositoryError::NotFound`] if the key is absent; creates nothing.
    #[tracing::instrument(skip_all, fields(identifier = %identifier))]
    pub async fn update<T: Serialize>(
        &self,
        identifier: &Identifier,
        value: &T,
    ) -> RepositoryResult<()> {
        let key = self.schema.key_for(identifier)?;
        if self.store.exists(&key).await? == 0 {
            return Err(RepositoryError::NotFound);
        }
        let document = serde_json::to_string(value)?;
        self.store.set(&key, &document).await?;
        Ok(())
    }

    /// Delete an entity. Fails with [`RepositoryError::NotFound`] if no
    /// key was removed.
    #[tracing::instrument(skip_all, fields(identifier = %identifier))]
    pub async fn delete(&self, identifier: &Identifier) -> RepositoryResult<()> {
        let key = self.schema.key_for(identifier)?;
        if self.store.delete(&key).await? == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Enumerate identifiers whose keys start with the pattern's key.
    ///
    /// Keys in the shared keyspace that fail validation or decoding are
    /// silently skipped: enumeration must tolerate keys written by other
    /// components or under a different key scheme.
    #[tracing::instrument(skip_all, fields(pattern = %pattern))]
    pub async fn list(&self, pattern: &Identifier) -> RepositoryResult<Vec<Identifier>> {
        let pattern_key = self.schema.key_for(pattern)?;
        let keys = self.store.keys_with_prefix(&pattern_key).await?;

        let mut identifiers = Vec::with_capacity(keys.len());
        for key in keys {
            match self.schema.identifier_for(&key) {
                Ok(identifier) => identifiers.push(identifier),
                Err(err) => {
                    tracing::debug!(key = %key, error = %err, "skipping undecodable key");
                }
            }
        }
        Ok(identifiers)
    }

    /// Full-text search across the repository's keyspace, delegating to
    /// the backend's search engine with the key prefix as the index name.
    ///
    /// A query with zero total matches returns an empty sequence, not an
    /// error. Undecodable keys among the hits are silently skipped.
    #[tracing::instrument(skip_all, fields(query = %query.query))]
    pub async fn search(&self, query: &SearchQuery) -> RepositoryResult<Vec<Identifier>> {
        let reply = self
            .store
            .search(
                self.schema.prefix(),
                &query.query,
                query.offset,
                query.limit,
                &query.sort_by,
                query.sort_dir,
            )
            .await?;

        if reply.total == 0 {
            return Ok(Vec::new());
        }

        let mut identifiers = Vec::with_capacity(reply.hits.len());
        for hit in reply.hits {
            match self.schema.identifier_for(&hit.key) {
                Ok(identifier) => identifiers.push(identifier),
                Err(err) => {
                    tracing::debug!(key = %hit.key, error = %err, "skipping undecodable key");
                }
            }
        }
        Ok(identifiers)
    }

    /// Try to acquire the distributed lock derived from an identifier.
    ///
    /// Returns `true` if this caller now holds the lock and `false` if it
    /// is already held; neither outcome is an error. The lock auto-expires
    /// after `ttl` as a backstop against a holder crashing without
    /// releasing. `ttl` must be positive.
    #[tracing::instrument(skip_all, fields(identifier = %identifier))]
    pub async fn acquire_lock(
        &self,
        identifier: &Identifier,
        ttl: Duration,
    ) -> RepositoryResult<bool> {
        if ttl.is_zero() {
            return Err(RepositoryError::Validation("lock ttl must be positive".to_string()));
        }
        let lock_key = self.schema.lock_key(identifier)?;
        let acquired = self.store.set_if_absent(&lock_key, LOCK_SENTINEL, ttl).await?;
        tracing::debug!(lock_key = %lock_key, acquired, "lock attempt");
        Ok(acquired)
    }

    /// Release the lock derived from an identifier. Fails with
    /// [`RepositoryError::NotFound`] if the lock was not held.
    #[tracing::instrument(skip_all, fields(identifier = %identifier))]
    pub async fn release_lock(&self, identifier: &Identifier) -> RepositoryResult<()> {
        let lock_key = self.schema.lock_key(identifier)?;
        if self.store.delete(&lock_key).await? == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Publish an opaque payload to a logical channel.
    #[tracing::instrument(skip_all, fields(channel = channel))]
    pub async fn publish(&self, channel: &str, payload: &str) -> RepositoryResult<()> {
        let full_channel = self.schema.channel(channel);
        self.store.publish(&full_channel, payload).await?;
        Ok(())
    }

    /// Subscribe to a logical channel.
    ///
    /// A background task forwards each incoming payload onto the returned
    /// unbounded stream, in backend delivery order, until the backend
    /// subscription closes; the stream then ends.
    #[tracing::instrument(skip_all, fields(channel = channel))]
    pub async fn subscribe(&self, channel: &str) -> RepositoryResult<Subscription> {
        let full_channel = self.schema.channel(channel);
        let mut source = self.store.subscribe(&full_channel).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(payload) = source.recv().await {
                if tx.send(payload).is_err() {
                    break;
                }
            }
            // Dropping tx closes the output so consumers observe
            // end-of-stream instead of blocking forever.
        });

        Ok(Subscription::new(rx))
    }

    /// Liveness check against the backend.
    pub async fn ping(&self) -> RepositoryResult<()> {
        self.store.ping().await?;
        Ok(())
    }

    /// Release the backend connection.
    pub async fn close(&self) -> RepositoryResult<()> {
        self.store.close().await?;
        Ok(())
    }
}
