//! Error types for Orrery core.

use crate::types::{RecordIdentity, TransformId};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Orrery core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bucket (persistence) error.
    #[error("bucket error: {0}")]
    Bucket(#[from] orrery_bucket::BucketError),

    /// The schema definition itself is inconsistent.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of the problem.
        message: String,
    },

    /// An operation targets a model the schema does not define.
    #[error("model not defined: {model}")]
    ModelNotDefined {
        /// The unknown model (record type).
        model: String,
    },

    /// An operation targets an attribute the model does not define.
    #[error("attribute not defined: {model}.{attribute}")]
    AttributeNotDefined {
        /// The model.
        model: String,
        /// The unknown attribute.
        attribute: String,
    },

    /// An operation targets a key the model does not define.
    #[error("key not defined: {model}.{key}")]
    KeyNotDefined {
        /// The model.
        model: String,
        /// The unknown key.
        key: String,
    },

    /// An operation targets a relationship the model does not define.
    #[error("relationship not defined: {model}.{relationship}")]
    RelationshipNotDefined {
        /// The model.
        model: String,
        /// The unknown relationship.
        relationship: String,
    },

    /// An operation uses a relationship with the wrong cardinality.
    #[error("relationship {model}.{relationship} is not {expected}")]
    RelationshipKindMismatch {
        /// The model.
        model: String,
        /// The relationship.
        relationship: String,
        /// The cardinality the operation requires.
        expected: &'static str,
    },

    /// A relationship member is not of the related model.
    #[error("relationship {model}.{relationship} relates {expected}, not {found}")]
    RelatedModelMismatch {
        /// The model.
        model: String,
        /// The relationship.
        relationship: String,
        /// The related model the schema declares.
        expected: String,
        /// The type of the offending member.
        found: String,
    },

    /// An operation targets a record path that does not exist.
    #[error("record not found: {record}")]
    RecordNotFound {
        /// The missing record.
        record: RecordIdentity,
    },

    /// The transform log does not contain the requested transform.
    #[error("transform not logged: {id}")]
    TransformNotLogged {
        /// The unknown transform.
        id: TransformId,
    },

    /// A computed log position falls outside the log.
    #[error("log position {position} out of range (len {len})")]
    OutOfRange {
        /// The computed position.
        position: i64,
        /// The current log length.
        len: usize,
    },

    /// A transform id was appended twice.
    #[error("transform already logged: {id}")]
    DuplicateTransform {
        /// The duplicate transform.
        id: TransformId,
    },
}

impl CoreError {
    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a record not found error.
    pub fn record_not_found(record: &RecordIdentity) -> Self {
        Self::RecordNotFound {
            record: record.clone(),
        }
    }

    /// Returns true if this error is a schema violation.
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            CoreError::ModelNotDefined { .. }
                | CoreError::AttributeNotDefined { .. }
                | CoreError::KeyNotDefined { .. }
                | CoreError::RelationshipNotDefined { .. }
                | CoreError::RelationshipKindMismatch { .. }
                | CoreError::RelatedModelMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_violation_classification() {
        let err = CoreError::ModelNotDefined {
            model: "comet".into(),
        };
        assert!(err.is_schema_violation());

        let err = CoreError::record_not_found(&RecordIdentity::new("planet", "earth"));
        assert!(!err.is_schema_violation());
        assert_eq!(err.to_string(), "record not found: planet:earth");
    }

    #[test]
    fn out_of_range_display() {
        let err = CoreError::OutOfRange {
            position: -1,
            len: 3,
        };
        assert!(err.to_string().contains("-1"));
        assert!(err.to_string().contains("3"));
    }
}
