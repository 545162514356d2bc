//! Callback slots with deterministic cancellation.
//!
//! A slot pairs a callback with an `active` flag. Delivery holds the
//! callback lock for the duration of the call and checks the flag under it;
//! cancellation clears the flag and then takes the same lock. Once
//! [`Subscription::cancel`] returns, any in-flight delivery has finished
//! and no later delivery can observe the flag set.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Callback<T> = Box<dyn FnMut(T) + Send>;

pub(crate) struct CallbackSlot<T> {
    active: AtomicBool,
    callback: Mutex<Callback<T>>,
}

impl<T> CallbackSlot<T> {
    pub(crate) fn new(callback: impl FnMut(T) + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(true),
            callback: Mutex::new(Box::new(callback)),
        })
    }

    /// Invoke the callback unless the slot was cancelled.
    ///
    /// Returns `false` if the slot is inactive and nothing was delivered.
    pub(crate) fn deliver(&self, item: T) -> bool {
        let mut callback = self.callback.lock();
        if !self.active.load(Ordering::Acquire) {
            return false;
        }
        (*callback)(item);
        true
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Deactivate and wait out any delivery already running.
    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        drop(self.callback.lock());
    }
}

/// Handle to a registered callback.
///
/// Cancelling (explicitly or by dropping the handle) is synchronous: when it
/// returns, the callback is not running and will never run again.
///
/// Must not be cancelled from inside its own callback; the slot lock is not
/// reentrant.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    active: Arc<dyn Fn() -> bool + Send + Sync>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(
        active: impl Fn() -> bool + Send + Sync + 'static,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            active: Arc::new(active),
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that was never live.
    pub(crate) fn inert() -> Self {
        Self {
            active: Arc::new(|| false),
            cancel: None,
        }
    }

    /// Check if the callback can still fire.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some() && (self.active)()
    }

    /// Stop delivery.
    pub fn cancel(mut self) {
        self.cancel_inner();
    }

    fn cancel_inner(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
