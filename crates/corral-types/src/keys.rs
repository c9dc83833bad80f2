//! Key grammar and the identifier <-> key codec.
//!
//! A [`KeySchema`] holds the configured keyspace prefix and separator and is
//! the single authority on what a well-formed key looks like. Every key the
//! schema produces or consumes passes full validation; rendering never skips
//! it, even for internally constructed keys.

use crate::error::KeyError;
use crate::identifier::Identifier;

/// Default keyspace prefix when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "app";
/// Default part separator when none is configured.
pub const DEFAULT_KEY_SEPARATOR: &str = ":";
/// Minimum accepted key length, inclusive.
pub const MIN_KEY_LENGTH: usize = 5;
/// Maximum accepted key length, inclusive.
pub const MAX_KEY_LENGTH: usize = 256;
/// Trailing part appended to an entity key to derive its lock key.
pub const LOCK_PART: &str = "lock";
/// Fixed marker part in derived pub/sub channel names.
pub const CHANNEL_PART: &str = "channel";

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')
}

/// Keyspace configuration plus the validation and codec rules built on it.
///
/// Immutable for the lifetime of a repository handle.
///
/// # Example
///
/// ```
/// use corral_types::{Identifier, KeySchema};
///
/// let schema = KeySchema::default();
/// let key = schema.key_for(&Identifier::entity("user", "42")).unwrap();
/// assert_eq!(key, "app:user:42");
/// assert_eq!(schema.identifier_for(&key).unwrap(), Identifier::entity("user", "42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    prefix: String,
    separator: String,
}

impl Default for KeySchema {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX, DEFAULT_KEY_SEPARATOR)
    }
}

impl KeySchema {
    /// Create a schema with the given prefix and separator.
    ///
    /// Empty strings fall back to the defaults (`"app"`, `":"`).
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if prefix.is_empty() {
            prefix = DEFAULT_KEY_PREFIX.to_string();
        }
        let mut separator = separator.into();
        if separator.is_empty() {
            separator = DEFAULT_KEY_SEPARATOR.to_string();
        }
        Self { prefix, separator }
    }

    /// The configured keyspace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The configured part separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Validate a key against the grammar.
    ///
    /// Checks run in a fixed order and the first failure wins:
    ///
    /// 1. length in `[MIN_KEY_LENGTH, MAX_KEY_LENGTH]`
    /// 2. characters in `[A-Za-z0-9_:.-]`
    /// 3. key starts with `prefix + separator`
    /// 4. at least one non-empty part after the prefix
    /// 5. no part anywhere is empty
    pub fn validate_key(&self, key: &str) -> Result<(), KeyError> {
        if key.len() < MIN_KEY_LENGTH || key.len() > MAX_KEY_LENGTH {
            return Err(KeyError::InvalidLength(key.len()));
        }

        if !key.chars().all(is_key_char) {
            return Err(KeyError::InvalidChars);
        }

        let lead = format!("{}{}", self.prefix, self.separator);
        if !key.starts_with(&lead) {
            return Err(KeyError::InvalidPrefix(lead));
        }

        let parts: Vec<&str> = key.split(self.separator.as_str()).collect();
        if parts.len() < 2 || parts[1].is_empty() {
            return Err(KeyError::InvalidSuffix);
        }

        if parts.iter().any(|part| part.is_empty()) {
            return Err(KeyError::EmptyKeyPart);
        }

        Ok(())
    }

    /// Validate an entity prefix in isolation.
    ///
    /// Stricter than the general key grammar: must match
    /// `letter (letter | digit | _)*`. Applied only to composite
    /// identifiers, before their key is rendered.
    pub fn validate_entity_prefix(entity_prefix: &str) -> Result<(), KeyError> {
        let mut chars = entity_prefix.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {}
            _ => return Err(KeyError::InvalidEntityPrefix),
        }
        if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(())
        } else {
            Err(KeyError::InvalidEntityPrefix)
        }
    }

    /// Join the prefix and the given parts into a key, then validate it.
    pub fn create_key(&self, parts: &[&str]) -> Result<String, KeyError> {
        let mut key = self.prefix.clone();
        for part in parts {
            key.push_str(&self.separator);
            key.push_str(part);
        }
        self.validate_key(&key)?;
        Ok(key)
    }

    /// Validate a key and return its parts after the prefix.
    pub fn parse_key(&self, key: &str) -> Result<Vec<String>, KeyError> {
        self.validate_key(key)?;
        Ok(key
            .split(self.separator.as_str())
            .skip(1)
            .map(str::to_owned)
            .collect())
    }

    /// Render an identifier into a validated key.
    ///
    /// For composite identifiers the entity-prefix grammar check runs first,
    /// so its failure surfaces distinctly from general key validation.
    pub fn key_for(&self, identifier: &Identifier) -> Result<String, KeyError> {
        match identifier {
            Identifier::Entity { prefix, id } => {
                Self::validate_entity_prefix(prefix)?;
                self.create_key(&[prefix, id])
            }
            Identifier::Simple(value) => self.create_key(&[value]),
        }
    }

    /// Decode a validated key back into an identifier.
    ///
    /// Shape-driven: two or more parts after the prefix decode to a
    /// composite identifier from the first two parts (any further parts
    /// are dropped); exactly one part decodes to a simple identifier.
    pub fn identifier_for(&self, key: &str) -> Result<Identifier, KeyError> {
        let parts = self.parse_key(key)?;
        if parts.len() >= 2 {
            Ok(Identifier::Entity { prefix: parts[0].clone(), id: parts[1].clone() })
        } else {
            Ok(Identifier::Simple(parts.join(self.separator.as_str())))
        }
    }

    /// Derive the lock key for an identifier: `key + separator + "lock"`.
    pub fn lock_key(&self, identifier: &Identifier) -> Result<String, KeyError> {
        let key = self.key_for(identifier)?;
        Ok(format!("{}{}{}", key, self.separator, LOCK_PART))
    }

    /// Derive the full pub/sub channel name for a logical channel:
    /// `prefix + separator + "channel" + separator + logical`.
    pub fn channel(&self, logical: &str) -> String {
        format!(
            "{p}{s}{m}{s}{c}",
            p = self.prefix,
            s = self.separator,
            m = CHANNEL_PART,
            c = logical
        )
    }
}
