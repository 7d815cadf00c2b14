//! Transform log.
//!
//! A source's history: the ids of the transforms it applied, in application
//! order. Positions are computed relative to a logged id:
//!
//! | Call | Position | Result |
//! |------|----------|--------|
//! | `before(id, n)` | `index(id) + n` | entries before the position |
//! | `after(id, n)` | `index(id) + 1 + n` | entries from the position on |
//! | `truncate(id, n)` | `index(id) + n` | drops entries before the position |
//! | `rollback(id, n)` | `index(id) + 1 + n` | drops entries from the position on |
//!
//! A position outside `0..=len` is an error and leaves the log untouched.
//!
//! A log opened over a [`Bucket`] loads its entries on first use and
//! persists the new entry list before any mutating call returns.

use crate::config::LogConfig;
use crate::error::{CoreError, CoreResult};
use crate::events::{EventFeed, Subscription, SubscriptionId};
use crate::types::TransformId;
use orrery_bucket::{get_value, set_value, Bucket};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// A change announced by a transform log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// An id was appended.
    Append(TransformId),
    /// Entries were dropped from the front.
    Truncate {
        /// The dropped ids, oldest first.
        removed: Vec<TransformId>,
    },
    /// Entries were dropped from the back.
    Rollback {
        /// The dropped ids, oldest first.
        removed: Vec<TransformId>,
    },
    /// Every entry was dropped.
    Clear {
        /// The dropped ids, oldest first.
        removed: Vec<TransformId>,
    },
}

impl LogEvent {
    /// Returns the ids this event removed from the log.
    pub fn removed(&self) -> &[TransformId] {
        match self {
            LogEvent::Append(_) => &[],
            LogEvent::Truncate { removed }
            | LogEvent::Rollback { removed }
            | LogEvent::Clear { removed } => removed,
        }
    }
}

#[derive(Debug)]
struct LogState {
    entries: Vec<TransformId>,
    reified: bool,
}

/// An ordered, append-only list of transform ids.
pub struct TransformLog {
    config: LogConfig,
    bucket: Option<Arc<dyn Bucket>>,
    state: Mutex<LogState>,
    events: EventFeed<LogEvent>,
}

impl TransformLog {
    /// Creates a volatile, empty log.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            config: LogConfig::new(name),
            bucket: None,
            state: Mutex::new(LogState {
                entries: Vec::new(),
                reified: true,
            }),
            events: EventFeed::new(),
        }
    }

    /// Creates a log backed by `bucket`.
    ///
    /// Entries are loaded from the bucket on first use.
    pub fn open(config: LogConfig, bucket: Arc<dyn Bucket>) -> Self {
        Self {
            config,
            bucket: Some(bucket),
            state: Mutex::new(LogState {
                entries: Vec::new(),
                reified: false,
            }),
            events: EventFeed::new(),
        }
    }

    /// Returns the log name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns true if the log persists to a bucket.
    pub fn is_durable(&self) -> bool {
        self.bucket.is_some()
    }

    /// Loads entries from the bucket if that has not happened yet.
    pub async fn reified(&self) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await
    }

    /// Subscribes to log events.
    pub fn subscribe(&self) -> Subscription<LogEvent> {
        self.events.subscribe()
    }

    /// Cancels a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Returns every entry, oldest first.
    pub async fn entries(&self) -> CoreResult<Vec<TransformId>> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;
        Ok(state.entries.clone())
    }

    /// Returns the newest entry.
    pub async fn head(&self) -> CoreResult<Option<TransformId>> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;
        Ok(state.entries.last().cloned())
    }

    /// Returns the number of entries.
    pub async fn len(&self) -> CoreResult<usize> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;
        Ok(state.entries.len())
    }

    /// Returns true if the log holds no entries.
    pub async fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Returns true if `id` is logged.
    pub async fn contains(&self, id: &TransformId) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;
        Ok(state.entries.contains(id))
    }

    /// Appends an id.
    pub async fn append(&self, id: TransformId) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;

        if state.entries.contains(&id) {
            return Err(CoreError::DuplicateTransform { id });
        }

        let mut entries = state.entries.clone();
        entries.push(id.clone());
        self.commit(&mut state, entries).await?;

        debug!(log = %self.config.name, transform = %id, "transform logged");
        self.events.emit(LogEvent::Append(id));
        Ok(())
    }

    /// Returns the entries before `index(id) + offset`.
    pub async fn before(&self, id: &TransformId, offset: i64) -> CoreResult<Vec<TransformId>> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;
        let position = position_of(&state.entries, id, 0, offset)?;
        Ok(state.entries[..position].to_vec())
    }

    /// Returns the entries from `index(id) + 1 + offset` on.
    pub async fn after(&self, id: &TransformId, offset: i64) -> CoreResult<Vec<TransformId>> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;
        let position = position_of(&state.entries, id, 1, offset)?;
        Ok(state.entries[position..].to_vec())
    }

    /// Drops the entries before `index(id) + offset`.
    ///
    /// Returns the dropped ids.
    pub async fn truncate(&self, id: &TransformId, offset: i64) -> CoreResult<Vec<TransformId>> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;
        let position = position_of(&state.entries, id, 0, offset)?;

        let removed = state.entries[..position].to_vec();
        let kept = state.entries[position..].to_vec();
        self.commit(&mut state, kept).await?;

        debug!(log = %self.config.name, removed = removed.len(), "log truncated");
        self.events.emit(LogEvent::Truncate {
            removed: removed.clone(),
        });
        Ok(removed)
    }

    /// Drops the entries from `index(id) + 1 + offset` on.
    ///
    /// Returns the dropped ids.
    pub async fn rollback(&self, id: &TransformId, offset: i64) -> CoreResult<Vec<TransformId>> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;
        let position = position_of(&state.entries, id, 1, offset)?;

        let removed = state.entries[position..].to_vec();
        let kept = state.entries[..position].to_vec();
        self.commit(&mut state, kept).await?;

        debug!(log = %self.config.name, removed = removed.len(), "log rolled back");
        self.events.emit(LogEvent::Rollback {
            removed: removed.clone(),
        });
        Ok(removed)
    }

    /// Drops every entry.
    ///
    /// Returns the dropped ids.
    pub async fn clear(&self) -> CoreResult<Vec<TransformId>> {
        let mut state = self.state.lock().await;
        self.reify(&mut state).await?;

        let removed = state.entries.clone();
        self.commit(&mut state, Vec::new()).await?;

        debug!(log = %self.config.name, removed = removed.len(), "log cleared");
        self.events.emit(LogEvent::Clear {
            removed: removed.clone(),
        });
        Ok(removed)
    }

    async fn reify(&self, state: &mut LogState) -> CoreResult<()> {
        if state.reified {
            return Ok(());
        }
        if let Some(bucket) = &self.bucket {
            let stored: Option<Vec<TransformId>> =
                get_value(bucket.as_ref(), &self.config.bucket_key).await?;
            state.entries = stored.unwrap_or_default();
            debug!(
                log = %self.config.name,
                entries = state.entries.len(),
                "log reified"
            );
        }
        state.reified = true;
        Ok(())
    }

    /// Persists `entries`, then makes them current.
    async fn commit(&self, state: &mut LogState, entries: Vec<TransformId>) -> CoreResult<()> {
        if let Some(bucket) = &self.bucket {
            set_value(bucket.as_ref(), &self.config.bucket_key, &entries).await?;
        }
        state.entries = entries;
        Ok(())
    }
}

impl std::fmt::Debug for TransformLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformLog")
            .field("name", &self.config.name)
            .field("durable", &self.bucket.is_some())
            .finish()
    }
}

/// Resolves `index(id) + base + offset` to a position in `0..=len`.
///
/// Saturates instead of overflowing, so an extreme offset is out of range.
fn position_of(entries: &[TransformId], id: &TransformId, base: i64, offset: i64) -> CoreResult<usize> {
    let index = entries
        .iter()
        .position(|entry| entry == id)
        .ok_or_else(|| CoreError::TransformNotLogged { id: id.clone() })?;

    let position = (index as i64 + base).saturating_add(offset);
    if position < 0 || position > entries.len() as i64 {
        return Err(CoreError::OutOfRange {
            position,
            len: entries.len(),
        });
    }
    Ok(position as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_bucket::InMemoryBucket;

    fn id(s: &str) -> TransformId {
        TransformId::from(s)
    }

    async fn log_with(ids: &[&str]) -> TransformLog {
        let log = TransformLog::in_memory("test");
        for entry in ids {
            log.append(id(entry)).await.unwrap();
        }
        log
    }

    #[tokio::test]
    async fn append_and_contains() {
        let log = log_with(&["a", "b"]).await;
        assert!(log.contains(&id("a")).await.unwrap());
        assert!(!log.contains(&id("z")).await.unwrap());
        assert_eq!(log.head().await.unwrap(), Some(id("b")));
        assert_eq!(log.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_append_is_rejected() {
        let log = log_with(&["a"]).await;
        assert!(matches!(
            log.append(id("a")).await,
            Err(CoreError::DuplicateTransform { .. })
        ));
        assert_eq!(log.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn before_and_after() {
        let log = log_with(&["a", "b", "c", "d"]).await;

        assert_eq!(log.before(&id("c"), 0).await.unwrap(), vec![id("a"), id("b")]);
        assert_eq!(log.before(&id("c"), 1).await.unwrap(), vec![id("a"), id("b"), id("c")]);
        assert_eq!(log.after(&id("b"), 0).await.unwrap(), vec![id("c"), id("d")]);
        assert_eq!(log.after(&id("b"), -1).await.unwrap(), vec![id("b"), id("c"), id("d")]);
        assert!(log.after(&id("d"), 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn truncate_drops_prefix() {
        let log = log_with(&["a", "b", "c"]).await;
        let mut events = log.subscribe();

        let removed = log.truncate(&id("b"), 1).await.unwrap();
        assert_eq!(removed, vec![id("a"), id("b")]);
        assert_eq!(log.entries().await.unwrap(), vec![id("c")]);
        assert_eq!(events.drain(), vec![LogEvent::Truncate { removed }]);
    }

    #[tokio::test]
    async fn rollback_drops_suffix() {
        let log = log_with(&["a", "b", "c"]).await;

        let removed = log.rollback(&id("a"), 0).await.unwrap();
        assert_eq!(removed, vec![id("b"), id("c")]);
        assert_eq!(log.entries().await.unwrap(), vec![id("a")]);

        let removed = log.rollback(&id("a"), -1).await.unwrap();
        assert_eq!(removed, vec![id("a")]);
        assert!(log.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn unlogged_and_out_of_range() {
        let log = log_with(&["a", "b"]).await;

        assert!(matches!(
            log.truncate(&id("z"), 0).await,
            Err(CoreError::TransformNotLogged { .. })
        ));
        assert!(matches!(
            log.before(&id("a"), -1).await,
            Err(CoreError::OutOfRange { position: -1, len: 2 })
        ));
        assert!(matches!(
            log.rollback(&id("b"), 1).await,
            Err(CoreError::OutOfRange { position: 3, len: 2 })
        ));
        assert_eq!(log.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn extreme_offsets_are_out_of_range() {
        let log = log_with(&["a", "b"]).await;

        assert!(matches!(
            log.after(&id("b"), i64::MAX).await,
            Err(CoreError::OutOfRange { position: i64::MAX, len: 2 })
        ));
        assert!(matches!(
            log.rollback(&id("a"), i64::MAX).await,
            Err(CoreError::OutOfRange { .. })
        ));
        assert!(matches!(
            log.truncate(&id("b"), i64::MIN).await,
            Err(CoreError::OutOfRange { .. })
        ));
        assert!(matches!(
            log.before(&id("a"), i64::MIN).await,
            Err(CoreError::OutOfRange { position: i64::MIN, len: 2 })
        ));
        assert_eq!(log.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn clear_reports_removed() {
        let log = log_with(&["a", "b"]).await;
        let removed = log.clear().await.unwrap();
        assert_eq!(removed, vec![id("a"), id("b")]);
        assert!(log.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn durable_log_resumes() {
        let bucket: Arc<dyn Bucket> = Arc::new(InMemoryBucket::new());

        let log = TransformLog::open(LogConfig::new("local"), Arc::clone(&bucket));
        log.append(id("a")).await.unwrap();
        log.append(id("b")).await.unwrap();
        log.append(id("c")).await.unwrap();
        log.truncate(&id("a"), 1).await.unwrap();
        drop(log);

        let reopened = TransformLog::open(LogConfig::new("local"), bucket);
        assert!(reopened.is_durable());
        reopened.reified().await.unwrap();
        assert_eq!(reopened.entries().await.unwrap(), vec![id("b"), id("c")]);
    }
}
