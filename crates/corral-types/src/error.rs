//! Errors produced by key validation and identifier encoding.

use crate::keys::{MAX_KEY_LENGTH, MIN_KEY_LENGTH};

/// Errors that can occur while validating a key or encoding an identifier.
///
/// Validation runs its checks in a fixed order and stops at the first
/// failure, so each variant pinpoints exactly which rule was broken.
/// This matters because keys are assembled from caller-supplied identifier
/// fragments: a diagnostic failure reason makes malformed input traceable
/// to its source.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    /// Key length falls outside the allowed range.
    #[error(
        "key length must be between {MIN_KEY_LENGTH} and {MAX_KEY_LENGTH} characters, got {0}"
    )]
    InvalidLength(usize),

    /// Key contains a character outside `[A-Za-z0-9_:.-]`.
    #[error(
        "key must contain only alphanumeric characters, underscores, colons, dots, and hyphens"
    )]
    InvalidChars,

    /// Key does not start with the configured prefix and separator.
    #[error("key must start with {0}")]
    InvalidPrefix(String),

    /// Key has no non-empty part after the prefix.
    #[error("key must have at least one non-empty part after the prefix")]
    InvalidSuffix,

    /// Some part of the key (including the prefix) is the empty string.
    /// Catches doubled separators anywhere in the key.
    #[error("empty key part used but not allowed")]
    EmptyKeyPart,

    /// Entity prefix does not match `letter (letter | digit | _)*`.
    #[error(
        "invalid entity prefix: must start with a letter and contain only \
         letters, numbers, and underscores"
    )]
    InvalidEntityPrefix,
}
