//! Push delivery of ledger notifications to subscribers.

use crate::subscription::{CallbackSlot, Subscription};
use multisig_types::Notification;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors delivered to a subscriber in place of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The ledger stopped; no further notifications will arrive.
    #[error("notification source closed")]
    Closed,
}

/// What a subscriber callback receives.
pub type Delivery = Result<Notification, DeliveryError>;

type Slot = Arc<CallbackSlot<Delivery>>;

#[derive(Default)]
struct BusInner {
    subscribers: Mutex<BTreeMap<u64, Slot>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl BusInner {
    fn remove(&self, id: u64) {
        if self.subscribers.lock().remove(&id).is_some() {
            debug!(subscriber = id, "Subscriber removed");
        }
    }
}

/// Fan-out of ledger notifications.
///
/// Subscribers are called synchronously, in subscription order, on the task
/// that publishes. The ledger runner is the only publisher, so every
/// subscriber sees notifications in commit order.
#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl NotificationBus {
    /// Create an open bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for every subsequent notification.
    ///
    /// Subscribing to a closed bus delivers `Err(Closed)` immediately and
    /// returns an inactive subscription.
    pub fn subscribe(&self, callback: impl FnMut(Delivery) + Send + 'static) -> Subscription {
        let slot = CallbackSlot::new(callback);
        let id = {
            let mut subscribers = self.inner.subscribers.lock();
            if self.is_closed() {
                drop(subscribers);
                slot.deliver(Err(DeliveryError::Closed));
                return Subscription::inert();
            }
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            subscribers.insert(id, slot.clone());
            id
        };
        debug!(subscriber = id, "Subscriber added");

        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);
        let probe = slot.clone();
        Subscription::new(
            move || probe.is_active(),
            move || {
                slot.deactivate();
                if let Some(inner) = weak.upgrade() {
                    inner.remove(id);
                }
            },
        )
    }

    /// Deliver a notification to every active subscriber.
    ///
    /// Returns how many callbacks ran.
    pub fn publish(&self, notification: &Notification) -> usize {
        if self.is_closed() {
            return 0;
        }
        let delivered = self
            .slots()
            .iter()
            .filter(|slot| slot.deliver(Ok(notification.clone())))
            .count();
        trace!(
            sequence = notification.sequence,
            delivered,
            "Published notification"
        );
        delivered
    }

    /// Tell every subscriber the source is gone and drop them.
    pub fn close(&self) {
        let slots: Vec<Slot> = {
            let mut subscribers = self.inner.subscribers.lock();
            if self.inner.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *subscribers).into_values().collect()
        };
        debug!(subscribers = slots.len(), "Notification bus closed");
        for slot in slots {
            slot.deliver(Err(DeliveryError::Closed));
            slot.deactivate();
        }
    }

    /// Check if `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of subscriptions not yet cancelled.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    // Callbacks run without the map lock held so they may subscribe or
    // cancel other subscriptions.
    fn slots(&self) -> Vec<Slot> {
        self.inner.subscribers.lock().values().cloned().collect()
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
