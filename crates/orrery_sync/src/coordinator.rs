//! Reconciles the transform logs of several sources.
//!
//! Every source keeps its own log. Once a prefix of history has been seen by
//! all of them it is no longer needed to compute deltas between sources, so
//! the coordinator finds the longest contiguous prefix common to every log
//! and truncates it everywhere.
//!
//! ## Review passes
//!
//! A review runs once on activation and again whenever a registered source
//! announces a transform. Reviews never overlap: a review requested while
//! one is running marks one more pass as needed, and that pass starts as
//! soon as the current one ends, however many requests arrived meanwhile.

use crate::error::{SyncError, SyncResult};
use crate::source::{Source, SourceEvent};
use orrery_core::{SubscriptionId, TransformId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct ReviewState {
    running: bool,
    queued: bool,
}

struct Listener {
    subscription: SubscriptionId,
    task: JoinHandle<()>,
}

struct CoordinatorInner {
    sources: RwLock<Vec<Arc<dyn Source>>>,
    listeners: Mutex<HashMap<String, Listener>>,
    active: AtomicBool,
    review: Mutex<ReviewState>,
    review_count: AtomicU64,
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        for (_, listener) in self.listeners.get_mut().drain() {
            listener.task.abort();
        }
    }
}

/// Prunes history shared by every registered source.
///
/// Cloning a coordinator yields another handle to the same instance.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

impl Coordinator {
    /// Creates an inactive coordinator with no sources.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                sources: RwLock::new(Vec::new()),
                listeners: Mutex::new(HashMap::new()),
                active: AtomicBool::new(false),
                review: Mutex::new(ReviewState::default()),
                review_count: AtomicU64::new(0),
            }),
        }
    }

    /// Creates an inactive coordinator over `sources`.
    pub fn with_sources(sources: impl IntoIterator<Item = Arc<dyn Source>>) -> SyncResult<Self> {
        let coordinator = Self::new();
        for source in sources {
            coordinator.add_source(source)?;
        }
        Ok(coordinator)
    }

    /// Registers a source.
    ///
    /// Must be called from within a Tokio runtime while the coordinator is
    /// active.
    pub fn add_source(&self, source: Arc<dyn Source>) -> SyncResult<()> {
        {
            let mut sources = self.inner.sources.write();
            if sources.iter().any(|s| s.name() == source.name()) {
                return Err(SyncError::SourceAlreadyRegistered(source.name().to_string()));
            }
            sources.push(Arc::clone(&source));
        }
        debug!(source = source.name(), "source registered");

        if self.is_active() {
            self.listen(source);
        }
        Ok(())
    }

    /// Unregisters a source by name and returns it.
    pub fn remove_source(&self, name: &str) -> SyncResult<Arc<dyn Source>> {
        let source = {
            let mut sources = self.inner.sources.write();
            let index = sources
                .iter()
                .position(|s| s.name() == name)
                .ok_or_else(|| SyncError::SourceNotRegistered(name.to_string()))?;
            sources.remove(index)
        };
        self.unlisten(source.as_ref());
        debug!(source = name, "source unregistered");
        Ok(source)
    }

    /// Returns the registered sources, in registration order.
    pub fn sources(&self) -> Vec<Arc<dyn Source>> {
        self.inner.sources.read().clone()
    }

    /// Returns a registered source by name.
    pub fn source(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.inner
            .sources
            .read()
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    /// Returns true while the coordinator listens to its sources.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Returns the number of completed review passes.
    pub fn review_count(&self) -> u64 {
        self.inner.review_count.load(Ordering::SeqCst)
    }

    /// Runs a review, then starts listening to every source.
    pub async fn activate(&self) -> SyncResult<()> {
        if self.is_active() {
            return Ok(());
        }
        self.review().await?;
        self.inner.active.store(true, Ordering::SeqCst);
        for source in self.sources() {
            self.listen(source);
        }
        debug!("coordinator activated");
        Ok(())
    }

    /// Stops listening to every source.
    pub fn deactivate(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
        for source in self.sources() {
            self.unlisten(source.as_ref());
        }
        debug!("coordinator deactivated");
    }

    /// Reconciles the logs of every registered source.
    ///
    /// If a review is already running this only schedules one more pass and
    /// returns immediately.
    pub async fn review(&self) -> SyncResult<()> {
        {
            let mut state = self.inner.review.lock();
            if state.running {
                state.queued = true;
                trace!("review coalesced");
                return Ok(());
            }
            state.running = true;
        }

        loop {
            let result = self.inner.review_pass().await;
            let mut state = self.inner.review.lock();
            if result.is_err() || !state.queued {
                state.running = false;
                state.queued = false;
                return result;
            }
            state.queued = false;
        }
    }

    fn listen(&self, source: Arc<dyn Source>) {
        let mut subscription = source.subscribe();
        let subscription_id = subscription.id();
        let weak: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);
        let name = source.name().to_string();

        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let SourceEvent::Transform(transform) = event;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                trace!(transform = %transform.id, "source transformed; reviewing");
                if let Err(err) = (Coordinator { inner }).review().await {
                    warn!(error = %err, "review failed");
                }
            }
        });

        let previous = self.inner.listeners.lock().insert(
            name,
            Listener {
                subscription: subscription_id,
                task,
            },
        );
        if let Some(previous) = previous {
            previous.task.abort();
        }
    }

    fn unlisten(&self, source: &dyn Source) {
        if let Some(listener) = self.inner.listeners.lock().remove(source.name()) {
            listener.task.abort();
            source.unsubscribe(listener.subscription);
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .inner
            .sources
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        f.debug_struct("Coordinator")
            .field("sources", &names)
            .field("active", &self.is_active())
            .field("reviews", &self.review_count())
            .finish()
    }
}

impl CoordinatorInner {
    async fn review_pass(&self) -> SyncResult<()> {
        let sources = self.sources.read().clone();

        for source in &sources {
            source.transform_log().reified().await?;
        }

        if sources.len() >= 2 {
            if let Some(common) = Self::latest_common_entry(&sources).await? {
                for source in &sources {
                    let removed = source.transform_log().truncate(&common, 1).await?;
                    trace!(source = source.name(), removed = removed.len(), "log pruned");
                }
                debug!(through = %common, sources = sources.len(), "shared history pruned");
            }
        }

        self.review_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// The last entry of the longest prefix that every log shares at the
    /// same positions.
    async fn latest_common_entry(sources: &[Arc<dyn Source>]) -> SyncResult<Option<TransformId>> {
        let Some((first, rest)) = sources.split_first() else {
            return Ok(None);
        };

        let mut others = Vec::with_capacity(rest.len());
        for source in rest {
            others.push(source.transform_log().entries().await?);
        }

        let mut latest = None;
        for (index, entry) in first.transform_log().entries().await?.into_iter().enumerate() {
            if !others.iter().all(|log| log.get(index) == Some(&entry)) {
                break;
            }
            latest = Some(entry);
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use orrery_core::Schema;

    fn source(name: &str) -> Arc<dyn Source> {
        let schema = Arc::new(Schema::builder().build().unwrap());
        Arc::new(MemorySource::new(name, schema))
    }

    #[test]
    fn duplicate_source_is_rejected() {
        let coordinator = Coordinator::new();
        coordinator.add_source(source("a")).unwrap();
        assert!(matches!(
            coordinator.add_source(source("a")),
            Err(SyncError::SourceAlreadyRegistered(_))
        ));
        assert_eq!(coordinator.sources().len(), 1);
    }

    #[test]
    fn unknown_source_removal_is_rejected() {
        let coordinator = Coordinator::new();
        assert!(matches!(
            coordinator.remove_source("missing"),
            Err(SyncError::SourceNotRegistered(_))
        ));
    }

    #[tokio::test]
    async fn review_prunes_common_prefix() {
        let a = source("a");
        let b = source("b");
        for id in ["t1", "t2", "t3"] {
            a.transform_log().append(id.into()).await.unwrap();
        }
        for id in ["t1", "t2", "t4"] {
            b.transform_log().append(id.into()).await.unwrap();
        }

        let coordinator = Coordinator::with_sources([Arc::clone(&a), Arc::clone(&b)]).unwrap();
        coordinator.review().await.unwrap();

        assert_eq!(a.transform_log().entries().await.unwrap(), vec![TransformId::from("t3")]);
        assert_eq!(b.transform_log().entries().await.unwrap(), vec![TransformId::from("t4")]);
        assert_eq!(coordinator.review_count(), 1);
    }

    #[tokio::test]
    async fn review_stops_at_first_gap() {
        let a = source("a");
        let b = source("b");
        for id in ["t1", "t2"] {
            a.transform_log().append(id.into()).await.unwrap();
        }
        for id in ["t2", "t1"] {
            b.transform_log().append(id.into()).await.unwrap();
        }

        let coordinator = Coordinator::with_sources([Arc::clone(&a), Arc::clone(&b)]).unwrap();
        coordinator.review().await.unwrap();

        assert_eq!(a.transform_log().len().await.unwrap(), 2);
        assert_eq!(b.transform_log().len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn single_source_is_left_alone() {
        let a = source("a");
        a.transform_log().append("t1".into()).await.unwrap();

        let coordinator = Coordinator::with_sources([Arc::clone(&a)]).unwrap();
        coordinator.review().await.unwrap();

        assert_eq!(a.transform_log().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn activation_toggles_listening() {
        let coordinator = Coordinator::with_sources([source("a"), source("b")]).unwrap();
        coordinator.activate().await.unwrap();
        assert!(coordinator.is_active());
        assert_eq!(coordinator.review_count(), 1);

        coordinator.deactivate();
        assert!(!coordinator.is_active());
    }
}
