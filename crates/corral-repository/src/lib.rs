//! # Corral Repository - Entity Storage Abstraction
//!
//! A generic entity repository backed by a schemaless key-value/document
//! store: CRUD, pattern listing, full-text search, distributed mutual
//! exclusion, and publish/subscribe notification over a single logical
//! keyspace. Application code persists arbitrary serde-serializable values
//! under typed identifiers without depending on a specific backend API.
//!
//! ```
//! use corral_repository::{Repository, RepositoryConfig};
//! use corral_types::Identifier;
//!
//! # async fn demo() -> Result<(), corral_repository::RepositoryError> {
//! let repo = Repository::open(&RepositoryConfig::default()).await?;
//! repo.create(&Identifier::entity("user", "42"), &serde_json::json!({"name": "alice"})).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod repository;

pub use config::RepositoryConfig;
pub use error::{RepositoryError, RepositoryResult};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use repository::{Repository, SearchQuery, DEFAULT_SEARCH_LIMIT};

// Re-export the pieces of the lower layers that appear in this crate's API.
pub use corral_store::{SortDirection, StoreError, Subscription};
pub use corral_types::{Identifier, KeyError, KeySchema};
