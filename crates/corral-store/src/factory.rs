//! Store factory for creating backend instances.
//!
//! Provides a flexible way to instantiate different storage backends
//! without exposing implementation details to consumers.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::memory::MemoryBackend;
use crate::{DocumentStore, StoreError, StoreResult};
use corral_types::{DEFAULT_KEY_PREFIX, DEFAULT_KEY_SEPARATOR};

#[cfg(feature = "redis")]
use crate::redis::RedisBackend;

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// In-memory storage (for testing and development).
    #[default]
    Memory,
    /// Redis storage (for production).
    #[cfg(feature = "redis")]
    Redis,
}

impl FromStr for BackendType {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendType::Memory),
            #[cfg(feature = "redis")]
            "redis" => Ok(BackendType::Redis),
            _ => Err(StoreError::Config(format!("unknown backend type: {}", s))),
        }
    }
}

impl BackendType {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Memory => "memory",
            #[cfg(feature = "redis")]
            BackendType::Redis => "redis",
        }
    }
}

/// Deployment topology of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// A single backend instance.
    #[default]
    Standalone,
    /// Sentinel-managed failover topology.
    Sentinel,
    /// Sharded cluster topology.
    Cluster,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Standalone => "standalone",
            DeploymentMode::Sentinel => "sentinel",
            DeploymentMode::Cluster => "cluster",
        }
    }
}

/// Configuration for a document store backend.
///
/// All fields have serde defaults so partial configuration files and
/// environment overrides compose cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type to use.
    #[serde(default)]
    pub backend: BackendType,
    /// Backend endpoints as `host:port` pairs.
    #[serde(default)]
    pub addrs: Vec<String>,
    /// Master set name (sentinel mode only).
    #[serde(default)]
    pub master_name: String,
    /// Username for authenticating with sentinels.
    #[serde(default)]
    pub sentinel_username: String,
    /// Password for authenticating with sentinels.
    #[serde(default)]
    pub sentinel_password: String,
    /// Username for the data connection.
    #[serde(default)]
    pub username: String,
    /// Password for the data connection.
    #[serde(default)]
    pub password: String,
    /// Logical database index.
    #[serde(default)]
    pub db: i64,
    /// Deployment topology.
    #[serde(default)]
    pub mode: DeploymentMode,
    /// Keyspace prefix for all keys this process owns.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Separator between key parts.
    #[serde(default = "default_key_separator")]
    pub key_separator: String,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_key_separator() -> String {
    DEFAULT_KEY_SEPARATOR.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            addrs: Vec::new(),
            master_name: String::new(),
            sentinel_username: String::new(),
            sentinel_password: String::new(),
            username: String::new(),
            password: String::new(),
            db: 0,
            mode: DeploymentMode::default(),
            key_prefix: default_key_prefix(),
            key_separator: default_key_separator(),
        }
    }
}

impl StoreConfig {
    /// Config for an in-memory backend.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Config for a standalone Redis backend.
    #[cfg(feature = "redis")]
    pub fn redis(addrs: Vec<String>) -> Self {
        Self { backend: BackendType::Redis, addrs, ..Self::default() }
    }

    /// Render the connection parameters as a single diagnostic string:
    /// `mode;master;sentinel_user;sentinel_pass;user;pass;db;addrs`.
    pub fn connection_string(&self) -> String {
        format!(
            "{};{};{};{};{};{};{};{}",
            self.mode.as_str(),
            self.master_name,
            self.sentinel_username,
            self.sentinel_password,
            self.username,
            self.password,
            self.db,
            self.addrs.join(",")
        )
    }
}

/// Factory for creating backend instances from configuration.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a document store from configuration.
    pub async fn create(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
        match config.backend {
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new()) as Arc<dyn DocumentStore>),
            #[cfg(feature = "redis")]
            BackendType::Redis => {
                let backend = RedisBackend::connect(config).await?;
                Ok(Arc::new(backend) as Arc<dyn DocumentStore>)
            }
        }
    }

    /// Create a default memory backend.
    pub fn memory() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryBackend::new()) as Arc<dyn DocumentStore>
    }
}
