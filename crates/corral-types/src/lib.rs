//! # Corral Types - Keyspace Protocol
//!
//! Defines the textual shape of a valid storage key, the typed identifiers
//! that map onto keys, and the errors both can produce. This crate is the
//! dependency-free core of Corral: no async, no backend, just the key
//! grammar and the identifier codec that every other layer builds on.
//!
//! # Key Schema
//!
//! Every key is a separator-joined sequence of parts starting with a
//! configured prefix:
//!
//! - `app:{segment}` - simple identifier
//! - `app:{entity}:{id}` - composite identifier
//! - `app:{entity}:{id}:lock` - derived lock key
//! - `app:channel:{name}` - derived pub/sub channel

pub mod error;
pub mod identifier;
pub mod keys;

pub use error::KeyError;
pub use identifier::Identifier;
pub use keys::{
    KeySchema, CHANNEL_PART, DEFAULT_KEY_PREFIX, DEFAULT_KEY_SEPARATOR, LOCK_PART, MAX_KEY_LENGTH,
    MIN_KEY_LENGTH,
};
