//! Operations and transforms.
//!
//! An [`Operation`] is one atomic graph mutation. It is plain data: it names
//! its target by identity and never holds references into the graph, so the
//! same operation can be stored, logged, inverted, and replayed.

use crate::record::Record;
use crate::types::{RecordIdentity, TransformId};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One atomic graph mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    /// Adds a record, replacing any record with the same identity.
    AddRecord {
        /// The record to add.
        record: Record,
    },
    /// Merges attributes, keys, and the named relationships into a record.
    UpdateRecord {
        /// The fields to merge.
        record: Record,
    },
    /// Removes a record.
    RemoveRecord {
        /// The record to remove.
        record: RecordIdentity,
    },
    /// Replaces one attribute value.
    ReplaceAttribute {
        /// The target record.
        record: RecordIdentity,
        /// The attribute name.
        attribute: String,
        /// The new value; `Null` clears the attribute.
        value: Value,
    },
    /// Replaces one key value.
    ReplaceKey {
        /// The target record.
        record: RecordIdentity,
        /// The key name.
        key: String,
        /// The new value; `None` clears the key.
        value: Option<String>,
    },
    /// Adds a member to a hasMany relationship.
    AddToRelatedRecords {
        /// The target record.
        record: RecordIdentity,
        /// The relationship name.
        relationship: String,
        /// The member to add.
        related: RecordIdentity,
    },
    /// Removes a member from a hasMany relationship.
    RemoveFromRelatedRecords {
        /// The target record.
        record: RecordIdentity,
        /// The relationship name.
        relationship: String,
        /// The member to remove.
        related: RecordIdentity,
    },
    /// Replaces a hasOne relationship.
    ReplaceRelatedRecord {
        /// The target record.
        record: RecordIdentity,
        /// The relationship name.
        relationship: String,
        /// The new value.
        related: Option<RecordIdentity>,
    },
    /// Replaces every member of a hasMany relationship.
    ReplaceRelatedRecords {
        /// The target record.
        record: RecordIdentity,
        /// The relationship name.
        relationship: String,
        /// The new members.
        related: Vec<RecordIdentity>,
    },
}

impl Operation {
    /// Creates an `AddRecord` operation.
    pub fn add_record(record: Record) -> Self {
        Operation::AddRecord { record }
    }

    /// Creates an `UpdateRecord` operation.
    pub fn update_record(record: Record) -> Self {
        Operation::UpdateRecord { record }
    }

    /// Creates a `RemoveRecord` operation.
    pub fn remove_record(record: RecordIdentity) -> Self {
        Operation::RemoveRecord { record }
    }

    /// Creates a `ReplaceAttribute` operation.
    pub fn replace_attribute(
        record: RecordIdentity,
        attribute: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Operation::ReplaceAttribute {
            record,
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Creates a `ReplaceKey` operation.
    pub fn replace_key(record: RecordIdentity, key: impl Into<String>, value: Option<String>) -> Self {
        Operation::ReplaceKey {
            record,
            key: key.into(),
            value,
        }
    }

    /// Creates an `AddToRelatedRecords` operation.
    pub fn add_to_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related: RecordIdentity,
    ) -> Self {
        Operation::AddToRelatedRecords {
            record,
            relationship: relationship.into(),
            related,
        }
    }

    /// Creates a `RemoveFromRelatedRecords` operation.
    pub fn remove_from_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related: RecordIdentity,
    ) -> Self {
        Operation::RemoveFromRelatedRecords {
            record,
            relationship: relationship.into(),
            related,
        }
    }

    /// Creates a `ReplaceRelatedRecord` operation.
    pub fn replace_related_record(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related: Option<RecordIdentity>,
    ) -> Self {
        Operation::ReplaceRelatedRecord {
            record,
            relationship: relationship.into(),
            related,
        }
    }

    /// Creates a `ReplaceRelatedRecords` operation.
    pub fn replace_related_records(
        record: RecordIdentity,
        relationship: impl Into<String>,
        related: impl IntoIterator<Item = RecordIdentity>,
    ) -> Self {
        Operation::ReplaceRelatedRecords {
            record,
            relationship: relationship.into(),
            related: related.into_iter().collect(),
        }
    }

    /// Returns the identity of the record this operation targets.
    pub fn target(&self) -> &RecordIdentity {
        match self {
            Operation::AddRecord { record } | Operation::UpdateRecord { record } => &record.identity,
            Operation::RemoveRecord { record }
            | Operation::ReplaceAttribute { record, .. }
            | Operation::ReplaceKey { record, .. }
            | Operation::AddToRelatedRecords { record, .. }
            | Operation::RemoveFromRelatedRecords { record, .. }
            | Operation::ReplaceRelatedRecord { record, .. }
            | Operation::ReplaceRelatedRecords { record, .. } => record,
        }
    }

    /// Returns the operation kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::AddRecord { .. } => "addRecord",
            Operation::UpdateRecord { .. } => "updateRecord",
            Operation::RemoveRecord { .. } => "removeRecord",
            Operation::ReplaceAttribute { .. } => "replaceAttribute",
            Operation::ReplaceKey { .. } => "replaceKey",
            Operation::AddToRelatedRecords { .. } => "addToRelatedRecords",
            Operation::RemoveFromRelatedRecords { .. } => "removeFromRelatedRecords",
            Operation::ReplaceRelatedRecord { .. } => "replaceRelatedRecord",
            Operation::ReplaceRelatedRecords { .. } => "replaceRelatedRecords",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.target())
    }
}

/// An identified, ordered batch of operations applied together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    /// Globally unique id.
    pub id: TransformId,
    /// Operations, applied in order.
    pub operations: Vec<Operation>,
}

impl Transform {
    /// Creates a transform with a fresh id.
    pub fn new(operations: Vec<Operation>) -> Self {
        Self::with_id(TransformId::new(), operations)
    }

    /// Creates a transform with an explicit id.
    pub fn with_id(id: impl Into<TransformId>, operations: Vec<Operation>) -> Self {
        Self {
            id: id.into(),
            operations,
        }
    }
}

impl From<Operation> for Transform {
    fn from(operation: Operation) -> Self {
        Transform::new(vec![operation])
    }
}
