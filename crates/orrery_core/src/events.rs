//! Typed notification feeds.
//!
//! Each component that announces changes (the record graph, the transform
//! log, sources, the action queue) owns one [`EventFeed`] over its own event
//! enum. Subscribers receive every event emitted after they subscribe, in
//! emission order.
//!
//! # Usage
//!
//! ```rust
//! use orrery_core::EventFeed;
//!
//! let feed: EventFeed<u32> = EventFeed::new();
//! let mut sub = feed.subscribe();
//! feed.emit(7);
//! assert_eq!(sub.try_recv(), Some(7));
//! ```

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Identifies one subscription on a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The receiving half of a subscription.
#[derive(Debug)]
pub struct Subscription<E> {
    id: SubscriptionId,
    receiver: UnboundedReceiver<E>,
}

impl<E> Subscription<E> {
    /// Returns the subscription id, used to unsubscribe.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<E> {
        self.receiver.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<E> {
        self.receiver.try_recv().ok()
    }

    /// Drains every queued event.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// A feed that distributes events to subscribers.
///
/// The feed:
/// - Preserves emission order
/// - Supports multiple subscribers
/// - Drops subscribers whose receiver has gone away
/// - Is thread-safe
pub struct EventFeed<E> {
    subscribers: RwLock<Vec<(SubscriptionId, UnboundedSender<E>)>>,
    next_id: AtomicU64,
}

impl<E: Clone> EventFeed<E> {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> Subscription<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers.write().push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Removes a subscription. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Emits an event to every live subscriber.
    pub fn emit(&self, event: E) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl<E: Clone> Default for EventFeed<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventFeed<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFeed")
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}
