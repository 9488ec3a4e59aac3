//! # Event Bus
//!
//! Synchronous publish/subscribe embedded in every economy manager.
//!
//! ```text
//! manager op ──> validate ──> mutate ──> persist ──> publish()
//!                                                      │
//!                               ┌──────────────────────┼──────────────┐
//!                               ▼                      ▼              ▼
//!                           handler #1             handler #2     handler #3
//!                          (registration order, before publish returns)
//! ```
//!
//! The registry lock is released before handlers run, so a handler may
//! subscribe, dispose or query its manager without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use cascade_shared::{EconomyEvent, EventKind};
use parking_lot::Mutex;

/// A subscriber callback.
pub type Handler = Arc<dyn Fn(&EconomyEvent) + Send + Sync>;

/// Identifier of one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Entry>,
}

/// Typed, ordered, synchronous event dispatch.
#[derive(Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind`.
    ///
    /// Keep the returned [`Subscription`] to unsubscribe later; dropping it
    /// leaves the handler registered.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EconomyEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry.lock().entries.push(Entry {
            id,
            kind,
            handler: Arc::new(handler),
        });
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes a subscription by id. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove(&self.registry, id)
    }

    /// Delivers `event` to every handler of its kind, in registration order.
    pub fn publish(&self, event: &EconomyEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .registry
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| Arc::clone(&entry.handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.registry.lock().entries.len())
            .finish()
    }
}

fn remove(registry: &Mutex<Registry>, id: SubscriptionId) -> bool {
    let mut registry = registry.lock();
    let before = registry.entries.len();
    registry.entries.retain(|entry| entry.id != id);
    registry.entries.len() != before
}

/// Disposer returned by [`EventBus::subscribe`].
#[derive(Debug)]
#[must_use = "dropping a Subscription keeps the handler registered; call dispose() to remove it"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// The subscription id.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unregisters the handler. Returns `false` if the bus is gone or the
    /// handler was already removed.
    pub fn dispose(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| remove(&registry, self.id))
    }
}
