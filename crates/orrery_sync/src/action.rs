//! Queued units of asynchronous work.

use async_trait::async_trait;
use orrery_core::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why an action failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ActionError {
    /// Description of the failure.
    pub message: String,
    /// Whether performing the action again may succeed. Informational only.
    pub retryable: bool,
}

impl ActionError {
    /// Creates a non-retryable error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a retryable error.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }
}

/// The object an action queue performs actions against.
#[async_trait]
pub trait ActionTarget: Send + Sync {
    /// Performs `action`, dispatching on its method.
    async fn perform(&self, action: &Action) -> Result<Value, ActionError>;
}

/// A unit of work: a method to call on the target, with its data.
///
/// An action moves from unstarted to started to settled once per attempt;
/// [`Action::reset`] returns it to unstarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Unique id.
    pub id: String,
    /// Target method name.
    pub method: String,
    /// Method argument.
    #[serde(default)]
    pub data: Value,
    /// Caller-defined metadata, not passed to the target.
    #[serde(default)]
    pub meta: Value,
    #[serde(default)]
    started: bool,
    #[serde(default)]
    settled: bool,
}

impl Action {
    /// Creates an unstarted action with a fresh id.
    pub fn new(method: impl Into<String>, data: impl Into<Value>, meta: impl Into<Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            data: data.into(),
            meta: meta.into(),
            started: false,
            settled: false,
        }
    }

    /// Returns true once processing began.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Returns true once processing finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Returns the action to the unstarted state.
    pub fn reset(&mut self) {
        self.started = false;
        self.settled = false;
    }

    /// Performs the action against `target` and settles it.
    pub async fn process(&mut self, target: &dyn ActionTarget) -> Result<Value, ActionError> {
        self.started = true;
        self.settled = false;
        let result = target.perform(self).await;
        self.settled = true;
        result
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.method, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ActionTarget for Echo {
        async fn perform(&self, action: &Action) -> Result<Value, ActionError> {
            match action.method.as_str() {
                "echo" => Ok(action.data.clone()),
                other => Err(ActionError::new(format!("unknown method {other}"))),
            }
        }
    }

    #[tokio::test]
    async fn process_settles_on_success() {
        let mut action = Action::new("echo", "hello", Value::Null);
        assert!(!action.is_started());

        let result = action.process(&Echo).await.unwrap();
        assert_eq!(result, Value::from("hello"));
        assert!(action.is_started());
        assert!(action.is_settled());
    }

    #[tokio::test]
    async fn process_settles_on_failure_and_resets() {
        let mut action = Action::new("launch", Value::Null, Value::Null);
        let err = action.process(&Echo).await.unwrap_err();
        assert!(!err.retryable);
        assert!(action.is_settled());

        action.reset();
        assert!(!action.is_started());
        assert!(!action.is_settled());
    }

    #[test]
    fn ids_are_unique() {
        let a = Action::new("echo", Value::Null, Value::Null);
        let b = Action::new("echo", Value::Null, Value::Null);
        assert_ne!(a.id, b.id);
    }
}
