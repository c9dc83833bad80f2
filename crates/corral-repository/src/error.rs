//! Repository error types.
//!
//! This module provides a [`RepositoryError`] enum that wraps key-grammar
//! and store-level errors and adds domain-specific variants for repository
//! operations.

use corral_store::StoreError;
use corral_types::KeyError;

/// Result type alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur during repository operations.
///
/// `NotFound` and `AlreadyExists` are domain-level outcomes of CRUD
/// preconditions, distinct from `Operation`, which wraps a failure of the
/// backend call itself with the original cause preserved.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The identifier could not be rendered into a valid key.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[source] KeyError),

    /// The requested entity was not found.
    #[error("not found")]
    NotFound,

    /// An entity with the same identifier already exists.
    #[error("already exists")]
    AlreadyExists,

    /// Validation of operation arguments failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization or deserialization of a stored value failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend reported an error executing the operation.
    #[error("operation failed: {0}")]
    Operation(#[from] StoreError),
}

impl From<KeyError> for RepositoryError {
    fn from(err: KeyError) -> Self {
        RepositoryError::InvalidIdentifier(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_errors_wrap_as_invalid_identifier() {
        let err: RepositoryError = KeyError::EmptyKeyPart.into();
        assert!(matches!(
            err,
            RepositoryError::InvalidIdentifier(KeyError::EmptyKeyPart)
        ));
        assert_eq!(
            err.to_string(),
            "invalid identifier: empty key part used but not allowed"
        );
    }

    #[test]
    fn store_errors_wrap_with_cause_preserved() {
        let err: RepositoryError = StoreError::Connection("refused".to_string()).into();
        assert_eq!(err.to_string(), "operation failed: connection error: refused");
        assert!(std::error::Error::source(&err).is_some());
    }
}
