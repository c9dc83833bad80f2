//! Store-level error types.

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a document store backend.
///
/// These wrap backend-level failures (network, protocol, configuration);
/// domain outcomes such as "not found" are expressed in the primitive
/// signatures themselves (`Option`, counts, booleans), not as errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to reach or authenticate with the backend.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend reported an error executing a command.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend returned a reply this crate cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The store configuration is invalid or unsupported.
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(
            StoreError::Connection("refused".to_string()).to_string(),
            "connection error: refused"
        );
        assert_eq!(StoreError::Closed.to_string(), "store is closed");
    }
}
