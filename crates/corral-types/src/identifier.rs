//! Typed identifiers for stored entities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed, structured value naming "which entity" a key addresses.
///
/// The two shapes are a closed set; the codec switches on the variant
/// rather than inspecting types at runtime.
///
/// # Example
///
/// ```
/// use corral_types::Identifier;
///
/// let user = Identifier::entity("user", "42");
/// let flag = Identifier::simple("maintenance_mode");
/// assert_eq!(user.to_string(), "user:42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// Composite identifier: an entity-type tag plus an instance id.
    ///
    /// The entity prefix must start with a letter and contain only
    /// letters, digits, and underscores.
    Entity {
        /// Entity-type tag, e.g. `"user"`.
        prefix: String,
        /// Instance id, e.g. `"42"`.
        id: String,
    },
    /// Simple identifier: a single opaque key segment.
    Simple(String),
}

impl Identifier {
    /// Create a composite identifier.
    pub fn entity(prefix: impl Into<String>, id: impl Into<String>) -> Self {
        Identifier::Entity { prefix: prefix.into(), id: id.into() }
    }

    /// Create a simple identifier.
    pub fn simple(value: impl Into<String>) -> Self {
        Identifier::Simple(value.into())
    }

    /// The key segments this identifier contributes, in order.
    pub fn parts(&self) -> Vec<&str> {
        match self {
            Identifier::Entity { prefix, id } => vec![prefix, id],
            Identifier::Simple(value) => vec![value],
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Entity { prefix, id } => write!(f, "{}:{}", prefix, id),
            Identifier::Simple(value) => f.write_str(value),
        }
    }
}
