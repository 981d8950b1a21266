//! Message channel abstraction and the in-process channel used by drivers.
//!
//! DESIGN
//! ======
//! `subscribe` returns a [`Subscription`] handle; dropping the handle is the
//! only way to unsubscribe. There is no separate `off(event, handler)` call
//! to keep symmetric with `on`, so a handler cannot outlive its owner.
//!
//! `LocalChannel` is single-threaded (`Rc`/`RefCell`), matching the
//! cooperative event loop the coordinator runs on. Outbound messages are
//! queued in an outbox that the transport driver drains; inbound messages
//! are pushed in through [`LocalChannel::deliver`].
//!
//! REENTRANCY
//! ==========
//! Handlers commonly drop their own subscription while running (an intent
//! resolves and releases its listener). `deliver` therefore snapshots the
//! matching handlers, releases the registry borrow, and re-checks that each
//! handler is still registered right before invoking it.

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::protocol::{Inbound, InboundKind, Outbound};

/// Inbound event callback.
pub type Handler = Box<dyn FnMut(&Inbound)>;

/// Error returned by [`MessageChannel::send`].
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("message channel is closed")]
    Closed,
}

/// Duplex named-event transport.
pub trait MessageChannel {
    /// Queue an outbound message. Fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] once the transport has shut down.
    fn send(&self, message: Outbound) -> Result<(), ChannelError>;

    /// Register `handler` for inbound events of `kind`.
    fn subscribe(&self, kind: InboundKind, handler: Handler) -> Subscription;
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Scoped registration of one handler. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    kind: InboundKind,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a release action. `release` runs at most once.
    pub fn new(kind: InboundKind, release: impl FnOnce() + 'static) -> Self {
        Self { kind, release: Some(Box::new(release)) }
    }

    /// A subscription that holds nothing, e.g. from a channel already torn down.
    pub fn detached(kind: InboundKind) -> Self {
        Self { kind, release: None }
    }

    #[must_use]
    pub fn kind(&self) -> InboundKind {
        self.kind
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Unsubscribe now. Equivalent to dropping the handle.
    pub fn cancel(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// LOCAL CHANNEL
// =============================================================================

struct Entry {
    kind: InboundKind,
    handler: Rc<RefCell<Handler>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    /// Keyed by registration order.
    entries: BTreeMap<u64, Entry>,
    outbox: VecDeque<Outbound>,
    closed: bool,
}

/// In-process channel shared by every coordinator on one event loop.
///
/// Clones share the same registry and outbox.
#[derive(Clone, Default)]
pub struct LocalChannel {
    registry: Rc<RefCell<Registry>>,
}

impl LocalChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch an inbound message to every handler registered for its kind.
    /// Returns how many handlers ran.
    pub fn deliver(&self, message: &Inbound) -> usize {
        let kind = message.kind();
        let snapshot: Vec<(u64, Rc<RefCell<Handler>>)> = {
            let registry = self.registry.borrow();
            registry
                .entries
                .iter()
                .filter(|(_, entry)| entry.kind == kind)
                .map(|(id, entry)| (*id, Rc::clone(&entry.handler)))
                .collect()
        };

        if snapshot.is_empty() {
            debug!(event = %kind, "channel: no subscribers, dropping inbound event");
            return 0;
        }

        let mut invoked = 0;
        for (id, handler) in snapshot {
            if !self.registry.borrow().entries.contains_key(&id) {
                trace!(event = %kind, subscription = id, "channel: handler removed mid-dispatch");
                continue;
            }
            let Ok(mut guard) = handler.try_borrow_mut() else {
                warn!(event = %kind, subscription = id, "channel: skipping reentrant delivery");
                continue;
            };
            let callback: &mut Handler = &mut guard;
            callback(message);
            invoked += 1;
        }
        invoked
    }

    /// Take every queued outbound message, oldest first.
    pub fn drain_outbox(&self) -> Vec<Outbound> {
        self.registry.borrow_mut().outbox.drain(..).collect()
    }

    #[must_use]
    pub fn has_outbound(&self) -> bool {
        !self.registry.borrow().outbox.is_empty()
    }

    /// Number of live handlers registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: InboundKind) -> usize {
        self.registry
            .borrow()
            .entries
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    /// Mark the transport as shut down. Later sends fail with [`ChannelError::Closed`].
    pub fn close(&self) {
        self.registry.borrow_mut().closed = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.registry.borrow().closed
    }
}

impl MessageChannel for LocalChannel {
    fn send(&self, message: Outbound) -> Result<(), ChannelError> {
        let mut registry = self.registry.borrow_mut();
        if registry.closed {
            return Err(ChannelError::Closed);
        }
        debug!(event = message.event_name(), "channel: queue outbound");
        registry.outbox.push_back(message);
        Ok(())
    }

    fn subscribe(&self, kind: InboundKind, handler: Handler) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.insert(id, Entry { kind, handler: Rc::new(RefCell::new(handler)) });
            id
        };
        trace!(event = %kind, subscription = id, "channel: subscribe");

        let registry: Weak<RefCell<Registry>> = Rc::downgrade(&self.registry);
        Subscription::new(kind, move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            // Bind the removed entry so its handler drops after the borrow ends;
            // the handler may own another Subscription on this channel.
            let removed = registry.borrow_mut().entries.remove(&id);
            if removed.is_some() {
                trace!(event = %kind, subscription = id, "channel: unsubscribe");
            }
            drop(removed);
        })
    }
}
