//! Durable, sequential action queue.
//!
//! Actions run one at a time, head first. A successful action is dequeued
//! and the remaining list persisted before the next one starts. A failed
//! action halts the queue: it stays at the head, the error is kept, and
//! nothing further runs until an operator calls [`ActionQueue::retry`],
//! [`ActionQueue::skip`], [`ActionQueue::clear`] or
//! [`ActionQueue::unshift`].
//!
//! At most one processing pass runs at a time. Every call to
//! [`ActionQueue::process`] made while a pass is running returns a handle to
//! that same pass.

use crate::action::{Action, ActionError, ActionTarget};
use crate::config::QueueConfig;
use crate::error::{SyncError, SyncResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use orrery_bucket::{get_value, set_value, Bucket};
use orrery_core::{EventFeed, Subscription, SubscriptionId, Value};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a processing pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Every queued action settled successfully; the queue is empty.
    Settled,
    /// An action failed and the queue halted with it at the head.
    Halted(ActionError),
}

impl ProcessOutcome {
    /// Returns true if the pass emptied the queue.
    pub fn is_settled(&self) -> bool {
        matches!(self, ProcessOutcome::Settled)
    }
}

/// A change announced by an action queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// An action settled successfully and was dequeued.
    Action(Action),
    /// An action failed; the queue halted.
    Fail {
        /// The failed action, still at the head.
        action: Action,
        /// The failure.
        error: ActionError,
    },
    /// A processing pass emptied the queue.
    Complete,
}

type Pass = Shared<BoxFuture<'static, ProcessOutcome>>;

#[derive(Default)]
struct QueueState {
    actions: VecDeque<Action>,
    error: Option<ActionError>,
    in_flight: Option<Pass>,
}

struct QueueInner {
    config: QueueConfig,
    target: Arc<dyn ActionTarget>,
    bucket: Option<Arc<dyn Bucket>>,
    state: Mutex<QueueState>,
    /// Orders bucket writes so the last write holds the latest snapshot.
    persist_lock: tokio::sync::Mutex<()>,
    events: EventFeed<QueueEvent>,
}

/// A FIFO of actions performed against one target.
///
/// Cloning a queue yields another handle to the same instance.
#[derive(Clone)]
pub struct ActionQueue {
    inner: Arc<QueueInner>,
}

impl ActionQueue {
    /// Creates an empty, volatile queue.
    pub fn new(target: Arc<dyn ActionTarget>, config: QueueConfig) -> Self {
        Self::build(target, None, config, VecDeque::new())
    }

    /// Opens a queue persisted in `bucket`.
    ///
    /// Stored actions are restored unstarted, so an action that was in
    /// flight when the previous process stopped is attempted again. A
    /// non-empty queue starts processing if `auto_process` is set.
    pub async fn open(
        target: Arc<dyn ActionTarget>,
        bucket: Arc<dyn Bucket>,
        config: QueueConfig,
    ) -> SyncResult<Self> {
        let stored: Option<Vec<Action>> = get_value(bucket.as_ref(), &config.bucket_key).await?;
        let mut actions: VecDeque<Action> = stored.unwrap_or_default().into();
        for action in &mut actions {
            action.reset();
        }

        debug!(queue = %config.name, actions = actions.len(), "queue reified");
        let queue = Self::build(target, Some(bucket), config, actions);
        if queue.inner.config.auto_process && !queue.is_empty() {
            drop(queue.process());
        }
        Ok(queue)
    }

    fn build(
        target: Arc<dyn ActionTarget>,
        bucket: Option<Arc<dyn Bucket>>,
        config: QueueConfig,
        actions: VecDeque<Action>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                config,
                target,
                bucket,
                state: Mutex::new(QueueState {
                    actions,
                    ..QueueState::default()
                }),
                persist_lock: tokio::sync::Mutex::new(()),
                events: EventFeed::new(),
            }),
        }
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Returns the number of queued actions.
    pub fn len(&self) -> usize {
        self.inner.state.lock().actions.len()
    }

    /// Returns true if no actions are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().actions.is_empty()
    }

    /// Returns the head action.
    pub fn current(&self) -> Option<Action> {
        self.inner.state.lock().actions.front().cloned()
    }

    /// Returns the error that halted the queue.
    pub fn error(&self) -> Option<ActionError> {
        self.inner.state.lock().error.clone()
    }

    /// Returns every queued action, head first.
    pub fn actions(&self) -> Vec<Action> {
        self.inner.state.lock().actions.iter().cloned().collect()
    }

    /// Returns true while a processing pass is running.
    pub fn is_processing(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    /// Subscribes to queue events.
    pub fn subscribe(&self) -> Subscription<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Cancels a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// Appends an action and returns it.
    ///
    /// Starts processing if `auto_process` is set.
    pub async fn push(
        &self,
        method: impl Into<String>,
        data: impl Into<Value>,
        meta: impl Into<Value>,
    ) -> SyncResult<Action> {
        let action = Action::new(method, data, meta);
        self.inner.state.lock().actions.push_back(action.clone());
        self.inner.persist_or_discard(&action.id).await?;
        debug!(queue = %self.name(), action = %action, "action pushed");

        if self.inner.config.auto_process {
            drop(self.process());
        }
        Ok(action)
    }

    /// Inserts an action at the head and resumes processing.
    pub async fn unshift(
        &self,
        method: impl Into<String>,
        data: impl Into<Value>,
        meta: impl Into<Value>,
    ) -> SyncResult<Action> {
        let action = Action::new(method, data, meta);
        self.inner.state.lock().actions.push_front(action.clone());
        self.inner.persist_or_discard(&action.id).await?;
        debug!(queue = %self.name(), action = %action, "action unshifted");

        drop(self.process());
        Ok(action)
    }

    /// Resets the head action, clears the error and resumes processing.
    pub async fn retry(&self) -> SyncResult<()> {
        {
            let mut state = self.inner.state.lock();
            let head = state.actions.front_mut().ok_or(SyncError::QueueEmpty)?;
            head.reset();
            state.error = None;
        }
        self.inner.persist().await?;
        debug!(queue = %self.name(), "retrying head action");

        drop(self.process());
        Ok(())
    }

    /// Drops the head action, clears the error and resumes processing.
    ///
    /// Returns the dropped action.
    pub async fn skip(&self) -> SyncResult<Action> {
        let skipped = {
            let mut state = self.inner.state.lock();
            let skipped = state.actions.pop_front().ok_or(SyncError::QueueEmpty)?;
            state.error = None;
            skipped
        };
        self.inner.persist().await?;
        debug!(queue = %self.name(), action = %skipped, "action skipped");

        drop(self.process());
        Ok(skipped)
    }

    /// Drops every action, clears the error and resumes processing.
    ///
    /// Returns the dropped actions.
    pub async fn clear(&self) -> SyncResult<Vec<Action>> {
        let cleared: Vec<Action> = {
            let mut state = self.inner.state.lock();
            state.error = None;
            state.actions.drain(..).collect()
        };
        self.inner.persist().await?;
        debug!(queue = %self.name(), cleared = cleared.len(), "queue cleared");

        drop(self.process());
        Ok(cleared)
    }

    /// Starts a processing pass, or joins the one already running.
    ///
    /// The returned future resolves when the pass ends. The pass itself runs
    /// as a spawned task and continues if the future is dropped, so this
    /// must be called from within a Tokio runtime.
    pub fn process(&self) -> impl Future<Output = ProcessOutcome> + Send + 'static {
        let mut state = self.inner.state.lock();
        if let Some(pass) = &state.in_flight {
            return pass.clone();
        }

        let task = tokio::spawn(Arc::clone(&self.inner).drain());
        let inner = Arc::clone(&self.inner);
        let pass: Pass = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    let error = ActionError::new(format!("processing task failed: {err}"));
                    let mut state = inner.state.lock();
                    state.in_flight = None;
                    state.error = Some(error.clone());
                    ProcessOutcome::Halted(error)
                }
            }
        }
        .boxed()
        .shared();

        // Set while still holding the lock: the pass clears it under the
        // same lock when it ends.
        state.in_flight = Some(pass.clone());
        pass
    }
}

impl std::fmt::Debug for ActionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionQueue")
            .field("name", &self.inner.config.name)
            .field("len", &self.len())
            .field("processing", &self.is_processing())
            .finish()
    }
}

impl QueueInner {
    /// Runs queued actions until the queue is empty or one fails.
    async fn drain(self: Arc<Self>) -> ProcessOutcome {
        loop {
            let mut action = {
                let mut state = self.state.lock();
                let head = state.actions.front().cloned();
                let Some(head) = head else {
                    state.in_flight = None;
                    drop(state);
                    debug!(queue = %self.config.name, "queue settled");
                    self.events.emit(QueueEvent::Complete);
                    return ProcessOutcome::Settled;
                };

                // A head that already settled failed earlier; it waits for
                // an operator.
                if head.is_settled() {
                    let error = state
                        .error
                        .clone()
                        .unwrap_or_else(|| ActionError::new(format!("action {head} failed earlier")));
                    state.in_flight = None;
                    return ProcessOutcome::Halted(error);
                }
                head
            };

            let result = action.process(self.target.as_ref()).await;
            match result {
                Ok(_) => {
                    {
                        // An unshift while the action ran may have moved it
                        // off the head.
                        let mut state = self.state.lock();
                        state.actions.retain(|queued| queued.id != action.id);
                    }
                    if let Err(err) = self.persist().await {
                        warn!(queue = %self.config.name, error = %err, "failed to persist queue");
                    }
                    debug!(queue = %self.config.name, action = %action, "action settled");
                    self.events.emit(QueueEvent::Action(action));
                }
                Err(error) => {
                    {
                        let mut state = self.state.lock();
                        if let Some(queued) = state
                            .actions
                            .iter_mut()
                            .find(|queued| queued.id == action.id)
                        {
                            *queued = action.clone();
                        }
                        state.error = Some(error.clone());
                        state.in_flight = None;
                    }
                    warn!(
                        queue = %self.config.name,
                        action = %action,
                        error = %error,
                        "action failed; queue halted"
                    );
                    self.events.emit(QueueEvent::Fail {
                        action,
                        error: error.clone(),
                    });
                    return ProcessOutcome::Halted(error);
                }
            }
        }
    }

    /// Persists after adding the action `id`; drops it again if that fails.
    async fn persist_or_discard(&self, id: &str) -> SyncResult<()> {
        if let Err(err) = self.persist().await {
            self.state.lock().actions.retain(|action| action.id != id);
            return Err(err);
        }
        Ok(())
    }

    /// Writes the current action list to the bucket.
    async fn persist(&self) -> SyncResult<()> {
        let Some(bucket) = &self.bucket else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().await;
        let snapshot: Vec<Action> = self.state.lock().actions.iter().cloned().collect();
        set_value(bucket.as_ref(), &self.config.bucket_key, &snapshot).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orrery_bucket::InMemoryBucket;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Records every call; fails a method a set number of times first.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        failures: Mutex<HashMap<String, usize>>,
        delay: Option<Duration>,
    }

    impl Recorder {
        fn failing(method: &str, times: usize) -> Self {
            let recorder = Self::default();
            recorder.failures.lock().insert(method.to_string(), times);
            recorder
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ActionTarget for Recorder {
        async fn perform(&self, action: &Action) -> Result<Value, ActionError> {
            self.calls.lock().push(action.method.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut failures = self.failures.lock();
            match failures.get_mut(&action.method) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    Err(ActionError::retryable(format!("{} unavailable", action.method)))
                }
                _ => Ok(action.data.clone()),
            }
        }
    }

    fn manual() -> QueueConfig {
        QueueConfig::new("test").with_auto_process(false)
    }

    #[tokio::test]
    async fn processes_in_order_and_completes() {
        let target = Arc::new(Recorder::default());
        let queue = ActionQueue::new(target.clone(), manual());
        let mut events = queue.subscribe();

        let first = queue.push("dock", "iss", Value::Null).await.unwrap();
        let second = queue.push("undock", "iss", Value::Null).await.unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.process().await, ProcessOutcome::Settled);
        assert!(queue.is_empty());
        assert!(!queue.is_processing());
        assert_eq!(target.calls(), vec!["dock", "undock"]);

        let events = events.drain();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], QueueEvent::Action(a) if a.id == first.id && a.is_settled()));
        assert!(matches!(&events[1], QueueEvent::Action(a) if a.id == second.id));
        assert_eq!(events[2], QueueEvent::Complete);
    }

    #[tokio::test]
    async fn failure_halts_until_skipped() {
        let target = Arc::new(Recorder::failing("launch", usize::MAX));
        let queue = ActionQueue::new(target.clone(), manual());
        let mut events = queue.subscribe();

        queue.push("fuel", Value::Null, Value::Null).await.unwrap();
        queue.push("launch", Value::Null, Value::Null).await.unwrap();
        queue.push("orbit", Value::Null, Value::Null).await.unwrap();

        let outcome = queue.process().await;
        assert!(matches!(&outcome, ProcessOutcome::Halted(e) if e.message == "launch unavailable"));
        assert_eq!(queue.len(), 2);
        let head = queue.current().unwrap();
        assert_eq!(head.method, "launch");
        assert!(head.is_settled());
        assert_eq!(queue.error().map(|e| e.message), Some("launch unavailable".to_string()));

        let drained = events.drain();
        assert!(matches!(drained.last(), Some(QueueEvent::Fail { action, .. }) if action.method == "launch"));

        // A halted queue does not perform its head again on its own.
        assert!(!queue.process().await.is_settled());
        assert_eq!(target.calls(), vec!["fuel", "launch"]);
        assert!(events.drain().is_empty());

        let skipped = queue.skip().await.unwrap();
        assert_eq!(skipped.method, "launch");
        assert_eq!(queue.process().await, ProcessOutcome::Settled);
        assert_eq!(target.calls(), vec!["fuel", "launch", "orbit"]);
        assert!(queue.error().is_none());
    }

    #[tokio::test]
    async fn retry_performs_head_again() {
        let target = Arc::new(Recorder::failing("launch", 1));
        let queue = ActionQueue::new(target.clone(), manual());

        queue.push("launch", Value::Null, Value::Null).await.unwrap();
        assert!(!queue.process().await.is_settled());

        queue.retry().await.unwrap();
        assert_eq!(queue.process().await, ProcessOutcome::Settled);
        assert_eq!(target.calls(), vec!["launch", "launch"]);
        assert!(queue.error().is_none());
    }

    #[tokio::test]
    async fn unshift_runs_before_failed_head() {
        let target = Arc::new(Recorder::failing("launch", 1));
        let queue = ActionQueue::new(target.clone(), manual());

        queue.push("launch", Value::Null, Value::Null).await.unwrap();
        assert!(!queue.process().await.is_settled());

        queue.unshift("refuel", Value::Null, Value::Null).await.unwrap();
        queue.process().await;
        assert_eq!(target.calls(), vec!["launch", "refuel"]);
        assert_eq!(queue.current().map(|a| a.method), Some("launch".to_string()));
    }

    #[tokio::test]
    async fn unshift_while_running_performs_each_action_once() {
        let target = Arc::new(Recorder {
            delay: Some(Duration::from_millis(20)),
            ..Recorder::default()
        });
        let queue = ActionQueue::new(target.clone(), manual());
        queue.push("dock", Value::Null, Value::Null).await.unwrap();
        queue.push("undock", Value::Null, Value::Null).await.unwrap();

        let pass = queue.process();
        tokio::time::sleep(Duration::from_millis(5)).await;
        queue.unshift("refuel", Value::Null, Value::Null).await.unwrap();

        assert_eq!(pass.await, ProcessOutcome::Settled);
        assert_eq!(target.calls(), vec!["dock", "refuel", "undock"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let target = Arc::new(Recorder::failing("launch", usize::MAX));
        let queue = ActionQueue::new(target, manual());
        queue.push("launch", Value::Null, Value::Null).await.unwrap();
        queue.push("orbit", Value::Null, Value::Null).await.unwrap();
        queue.process().await;

        let cleared = queue.clear().await.unwrap();
        assert_eq!(cleared.len(), 2);
        assert!(queue.is_empty());
        assert!(queue.error().is_none());
    }

    #[tokio::test]
    async fn controls_on_empty_queue_fail() {
        let queue = ActionQueue::new(Arc::new(Recorder::default()), manual());
        assert!(matches!(queue.retry().await, Err(SyncError::QueueEmpty)));
        assert!(matches!(queue.skip().await, Err(SyncError::QueueEmpty)));
        assert!(queue.clear().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_process_calls_share_one_pass() {
        let target = Arc::new(Recorder {
            delay: Some(Duration::from_millis(20)),
            ..Recorder::default()
        });
        let queue = ActionQueue::new(target.clone(), manual());
        queue.push("dock", Value::Null, Value::Null).await.unwrap();
        queue.push("undock", Value::Null, Value::Null).await.unwrap();

        let (a, b) = tokio::join!(queue.process(), queue.process());
        assert_eq!(a, ProcessOutcome::Settled);
        assert_eq!(b, ProcessOutcome::Settled);
        assert_eq!(target.calls(), vec!["dock", "undock"]);
    }

    #[tokio::test]
    async fn reopened_queue_restores_unstarted_actions() {
        let bucket: Arc<dyn Bucket> = Arc::new(InMemoryBucket::new());
        let target = Arc::new(Recorder::failing("launch", usize::MAX));

        let queue = ActionQueue::open(target.clone(), Arc::clone(&bucket), manual())
            .await
            .unwrap();
        queue.push("launch", Value::Null, Value::Null).await.unwrap();
        queue.push("orbit", Value::Null, Value::Null).await.unwrap();
        queue.process().await;
        drop(queue);

        let reopened = ActionQueue::open(target, bucket, manual()).await.unwrap();
        let actions = reopened.actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].method, "launch");
        assert!(!actions[0].is_started());
        assert!(reopened.error().is_none());
    }
}
