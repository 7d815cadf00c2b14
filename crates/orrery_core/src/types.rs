//! Core type definitions for Orrery.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A reference to a record: its type (model name) and id.
///
/// Identities are immutable and compare structurally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordIdentity {
    /// The record type (model name).
    #[serde(rename = "type")]
    pub kind: String,
    /// The record id, unique within its type.
    pub id: String,
}

impl RecordIdentity {
    /// Creates a new record identity.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Unique identifier of a transform.
///
/// Transform ids are the entries of a transform log and the keys under which
/// inverse operations are stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformId(String);

impl TransformId {
    /// Creates a new random transform id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a transform id from an explicit string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransformId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransformId {
    fn from(id: &str) -> Self {
        Self::from_string(id)
    }
}

impl From<String> for TransformId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
