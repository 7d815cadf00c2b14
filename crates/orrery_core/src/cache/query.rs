//! Read-only queries over the record graph.

use crate::record::Record;
use crate::types::RecordIdentity;
use serde::{Deserialize, Serialize};

/// A request for records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Query {
    /// One record by identity. Fails if the record does not exist.
    FindRecord {
        /// The record.
        record: RecordIdentity,
    },
    /// Every record of a type.
    FindRecords {
        /// The record type.
        #[serde(rename = "type")]
        kind: String,
    },
    /// The record referenced by a hasOne relationship.
    FindRelatedRecord {
        /// The owning record.
        record: RecordIdentity,
        /// The relationship name.
        relationship: String,
    },
    /// The records referenced by a hasMany relationship.
    FindRelatedRecords {
        /// The owning record.
        record: RecordIdentity,
        /// The relationship name.
        relationship: String,
    },
}

impl Query {
    /// Creates a `FindRecord` query.
    pub fn find_record(record: RecordIdentity) -> Self {
        Query::FindRecord { record }
    }

    /// Creates a `FindRecords` query.
    pub fn find_records(kind: impl Into<String>) -> Self {
        Query::FindRecords { kind: kind.into() }
    }

    /// Creates a `FindRelatedRecord` query.
    pub fn find_related_record(record: RecordIdentity, relationship: impl Into<String>) -> Self {
        Query::FindRelatedRecord {
            record,
            relationship: relationship.into(),
        }
    }

    /// Creates a `FindRelatedRecords` query.
    pub fn find_related_records(record: RecordIdentity, relationship: impl Into<String>) -> Self {
        Query::FindRelatedRecords {
            record,
            relationship: relationship.into(),
        }
    }
}

/// The answer to a [`Query`].
///
/// Related records that are referenced but not present are omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// Answer to `FindRecord`.
    Record(Record),
    /// Answer to `FindRecords`, ordered by id.
    Records(Vec<Record>),
    /// Answer to `FindRelatedRecord`.
    RelatedRecord(Option<Record>),
    /// Answer to `FindRelatedRecords`, ordered by identity.
    RelatedRecords(Vec<Record>),
}

impl QueryResult {
    /// Returns the single record, if this result holds one.
    pub fn record(&self) -> Option<&Record> {
        match self {
            QueryResult::Record(record) => Some(record),
            QueryResult::RelatedRecord(record) => record.as_ref(),
            QueryResult::Records(_) | QueryResult::RelatedRecords(_) => None,
        }
    }

    /// Returns every record in this result.
    pub fn records(&self) -> Vec<&Record> {
        match self {
            QueryResult::Record(record) => vec![record],
            QueryResult::RelatedRecord(record) => record.iter().collect(),
            QueryResult::Records(records) | QueryResult::RelatedRecords(records) => records.iter().collect(),
        }
    }
}
