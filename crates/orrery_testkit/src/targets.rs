//! Scripted action targets.

use async_trait::async_trait;
use orrery_core::Value;
use orrery_sync::{Action, ActionError, ActionTarget};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::trace;

/// An action target that records every call and fails scripted methods.
///
/// Successful calls resolve to the action's data.
#[derive(Debug, Default)]
pub struct ScriptedTarget {
    calls: Mutex<Vec<Action>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl ScriptedTarget {
    /// Creates a target that accepts every method.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a target that sleeps for `delay` inside every call.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Makes calls to `method` fail until [`ScriptedTarget::heal`] is called.
    pub fn fail_on(&self, method: &str) {
        self.failing.lock().insert(method.to_string());
    }

    /// Lets calls to `method` succeed again.
    pub fn heal(&self, method: &str) {
        self.failing.lock().remove(method);
    }

    /// Returns the performed actions, in call order.
    pub fn calls(&self) -> Vec<Action> {
        self.calls.lock().clone()
    }

    /// Returns the methods of the performed actions, in call order.
    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|a| a.method.clone()).collect()
    }

    /// Returns the highest number of calls that overlapped.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionTarget for ScriptedTarget {
    async fn perform(&self, action: &Action) -> Result<Value, ActionError> {
        trace!(action = %action, "scripted target performing");
        self.calls.lock().push(action.clone());
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().contains(&action.method) {
            return Err(ActionError::retryable(format!("{} rejected", action.method)));
        }
        Ok(action.data.clone())
    }
}
