//! Error types for sources, the coordinator and action queues.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The source is already registered with the coordinator.
    #[error("source already registered: {0}")]
    SourceAlreadyRegistered(String),

    /// The source is not registered with the coordinator.
    #[error("source not registered: {0}")]
    SourceNotRegistered(String),

    /// Record graph or transform log error.
    #[error("core error: {0}")]
    Core(#[from] orrery_core::CoreError),

    /// Bucket (persistence) error.
    #[error("bucket error: {0}")]
    Bucket(#[from] orrery_bucket::BucketError),

    /// An operator control needs an action but the queue is empty.
    #[error("action queue is empty")]
    QueueEmpty,
}

impl SyncError {
    /// Returns true if this error comes from a schema violation.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, SyncError::Core(err) if err.is_schema_violation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::SourceAlreadyRegistered("memory".into());
        assert_eq!(err.to_string(), "source already registered: memory");
        assert_eq!(SyncError::QueueEmpty.to_string(), "action queue is empty");
    }

    #[test]
    fn wraps_core_errors() {
        let err: SyncError = orrery_core::CoreError::ModelNotDefined {
            model: "comet".into(),
        }
        .into();
        assert!(err.is_schema_violation());
        assert!(!SyncError::QueueEmpty.is_schema_violation());
    }
}
