//! Sources: record graphs with a history.

use crate::error::SyncResult;
use orrery_core::{
    Cache, CacheConfig, EventFeed, LogEvent, Operation, Query, QueryResult, Record, Schema,
    Subscription, SubscriptionId, Transform, TransformId, TransformLog,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// A change announced by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A transform was applied and logged.
    Transform(Transform),
}

/// A participant in log coordination.
///
/// A source owns a [`TransformLog`] and announces every transform it
/// applies after logging it.
pub trait Source: Send + Sync {
    /// Returns the source name, unique within a coordinator.
    fn name(&self) -> &str;

    /// Returns the source's transform log.
    fn transform_log(&self) -> &TransformLog;

    /// Subscribes to source events.
    fn subscribe(&self) -> Subscription<SourceEvent>;

    /// Cancels a subscription.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// A source backed by an in-memory record graph.
///
/// Transforms are applied to the cache first and logged second; a transform
/// whose id is already logged is skipped. Inverse operations of transforms
/// that leave the log (truncation, rollback, clear) are discarded.
pub struct MemorySource {
    name: String,
    cache: Mutex<Cache>,
    log: TransformLog,
    log_events: Mutex<Subscription<LogEvent>>,
    /// Serializes apply-then-log sequences.
    apply_lock: tokio::sync::Mutex<()>,
    events: EventFeed<SourceEvent>,
}

impl MemorySource {
    /// Creates a source with an empty cache and a volatile log.
    pub fn new(name: impl Into<String>, schema: Arc<Schema>) -> Self {
        let name = name.into();
        let log = TransformLog::in_memory(name.clone());
        Self::with_parts(name, Cache::with_config(schema, CacheConfig::default()), log)
    }

    /// Creates a source from an existing cache and log.
    pub fn with_parts(name: impl Into<String>, cache: Cache, log: TransformLog) -> Self {
        let log_events = log.subscribe();
        Self {
            name: name.into(),
            cache: Mutex::new(cache),
            log,
            log_events: Mutex::new(log_events),
            apply_lock: tokio::sync::Mutex::new(()),
            events: EventFeed::new(),
        }
    }

    /// Applies and logs a transform, returning its inverse operations.
    ///
    /// Returns an empty list without touching the cache if the transform is
    /// already logged.
    pub async fn transform(&self, transform: Transform) -> SyncResult<Vec<Operation>> {
        let _guard = self.apply_lock.lock().await;
        self.discard_pruned();

        if self.log.contains(&transform.id).await? {
            debug!(source = %self.name, transform = %transform.id, "transform already logged");
            return Ok(Vec::new());
        }

        let inverse = self.cache.lock().transform(&transform)?;

        if let Err(err) = self.log.append(transform.id.clone()).await {
            self.cache.lock().revert(&transform.id)?;
            return Err(err.into());
        }

        debug!(
            source = %self.name,
            transform = %transform.id,
            inverse = inverse.len(),
            "source transformed"
        );
        self.events.emit(SourceEvent::Transform(transform));
        Ok(inverse)
    }

    /// Undoes every transform logged after `id` and drops them from the log.
    ///
    /// Returns the undone ids in application order.
    pub async fn rollback(&self, id: &TransformId) -> SyncResult<Vec<TransformId>> {
        let _guard = self.apply_lock.lock().await;
        self.discard_pruned();

        self.log.rollback(id, 0).await?;
        let undone = self.cache.lock().rollback(id)?;
        self.discard_pruned();

        debug!(source = %self.name, to = %id, undone = undone.len(), "source rolled back");
        Ok(undone)
    }

    /// Replaces the cache content and clears the log.
    pub async fn reset(&self, records: Vec<Record>) -> SyncResult<()> {
        let _guard = self.apply_lock.lock().await;
        self.cache.lock().reset(records)?;
        self.log.clear().await?;
        self.discard_pruned();
        Ok(())
    }

    /// Answers a query against the cache.
    pub fn query(&self, query: &Query) -> SyncResult<QueryResult> {
        Ok(self.cache.lock().query(query)?)
    }

    /// Runs `f` with read access to the cache.
    pub fn read<R>(&self, f: impl FnOnce(&Cache) -> R) -> R {
        f(&self.cache.lock())
    }

    /// Returns the ids whose inverse operations are still held.
    pub fn retained_inverses(&self) -> Vec<TransformId> {
        self.discard_pruned();
        self.cache.lock().applied()
    }

    /// Drops the inverse operations of every id that left the log.
    fn discard_pruned(&self) {
        let events = self.log_events.lock().drain();
        let removed: Vec<TransformId> = events
            .iter()
            .flat_map(|event| event.removed().iter().cloned())
            .collect();
        if !removed.is_empty() {
            self.cache.lock().forget(&removed);
        }
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform_log(&self) -> &TransformLog {
        &self.log
    }

    fn subscribe(&self) -> Subscription<SourceEvent> {
        self.events.subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySource")
            .field("name", &self.name)
            .field("log", &self.log)
            .finish()
    }
}
