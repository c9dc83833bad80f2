//! Configuration loading for a repository process.
//!
//! Configuration composes from an optional file plus `CORRAL_`-prefixed
//! environment variables, with serde defaults filling the gaps, e.g.
//! `CORRAL_STORE__KEY_PREFIX=svc` overrides `store.key_prefix`.

use std::path::Path;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use corral_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Top-level repository configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Backend store configuration, including key prefix and separator.
    #[serde(default)]
    pub store: StoreConfig,
}

impl RepositoryConfig {
    /// Load configuration from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("CORRAL").separator("__"));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_store::BackendType;

    #[test]
    fn defaults_are_memory_backend_with_app_prefix() {
        let config = RepositoryConfig::default();
        assert_eq!(config.store.backend, BackendType::Memory);
        assert_eq!(config.store.key_prefix, "app");
        assert_eq!(config.store.key_separator, ":");
    }

    #[test]
    fn loads_without_a_file() {
        let config = RepositoryConfig::load(None).unwrap();
        assert_eq!(config.store.backend, BackendType::Memory);
    }
}
