//! Viewer identity tracking.
//!
//! The identity a projection is computed for comes from outside the node
//! (a wallet, a key store, a test). [`IdentityWatcher`] polls an
//! [`IdentityProvider`] and reports changes of identity or network.

use crate::subscription::{CallbackSlot, Subscription};
use multisig_types::{Address, NetworkId};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Who is looking, and on which network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityScope {
    /// `None` when no identity is available (e.g. a locked wallet).
    pub identity: Option<Address>,
    pub network: NetworkId,
}

impl IdentityScope {
    pub fn new(identity: Option<Address>, network: NetworkId) -> Self {
        Self { identity, network }
    }
}

/// Errors raised by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of the current identity and network.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Result<Option<Address>, ProviderError>;

    fn current_network(&self) -> Result<NetworkId, ProviderError>;

    /// Read both at once.
    fn scope(&self) -> Result<IdentityScope, ProviderError> {
        Ok(IdentityScope {
            identity: self.current_identity()?,
            network: self.current_network()?,
        })
    }
}

/// Provider whose answers are set by hand.
///
/// Clones share state, so one clone can be handed to a watcher while the
/// other switches identities or injects failures.
#[derive(Debug, Clone)]
pub struct ManualIdentity {
    inner: Arc<RwLock<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    /// Last scope that was set. Survives an injected failure.
    scope: IdentityScope,
    failure: Option<ProviderError>,
}

impl ManualIdentity {
    pub fn new(scope: IdentityScope) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ManualState {
                scope,
                failure: None,
            })),
        }
    }

    /// Switch identity, keeping the last network set. Clears any injected
    /// failure.
    pub fn set_identity(&self, identity: Option<Address>) {
        let mut state = self.inner.write();
        state.scope.identity = identity;
        state.failure = None;
    }

    /// Switch network, keeping the last identity set. Clears any injected
    /// failure.
    pub fn set_network(&self, network: NetworkId) {
        let mut state = self.inner.write();
        state.scope.network = network;
        state.failure = None;
    }

    /// Replace both halves. Clears any injected failure.
    pub fn set_scope(&self, scope: IdentityScope) {
        let mut state = self.inner.write();
        state.scope = scope;
        state.failure = None;
    }

    /// Make every read fail until the next `set_*`.
    pub fn fail(&self, reason: impl Into<String>) {
        self.inner.write().failure = Some(ProviderError::Unavailable(reason.into()));
    }
}

impl IdentityProvider for ManualIdentity {
    fn current_identity(&self) -> Result<Option<Address>, ProviderError> {
        self.scope().map(|scope| scope.identity)
    }

    fn current_network(&self) -> Result<NetworkId, ProviderError> {
        self.scope().map(|scope| scope.network)
    }

    fn scope(&self) -> Result<IdentityScope, ProviderError> {
        let state = self.inner.read();
        match &state.failure {
            Some(e) => Err(e.clone()),
            None => Ok(state.scope),
        }
    }
}

/// Callback payload for identity changes.
pub type IdentityUpdate = Result<IdentityScope, ProviderError>;

/// Polls a provider and reports changes.
pub struct IdentityWatcher;

impl IdentityWatcher {
    /// Start polling on the current tokio runtime.
    ///
    /// The first reading is always delivered. After that the callback fires
    /// only when the reading differs from the previous one, including a
    /// change from success to error or back. Errors are passed through and
    /// polling simply continues on the next tick.
    ///
    /// Cancelling the returned subscription stops the poll task; once
    /// `cancel` returns the callback never fires again.
    pub fn spawn(
        provider: Arc<dyn IdentityProvider>,
        interval: Duration,
        callback: impl FnMut(IdentityUpdate) + Send + 'static,
    ) -> Subscription {
        let slot = CallbackSlot::new(callback);
        let token = CancellationToken::new();

        tokio::spawn(poll(provider, interval, slot.clone(), token.clone()));

        let probe = slot.clone();
        Subscription::new(
            move || probe.is_active(),
            move || {
                token.cancel();
                slot.deactivate();
            },
        )
    }
}

async fn poll(
    provider: Arc<dyn IdentityProvider>,
    interval: Duration,
    slot: Arc<CallbackSlot<IdentityUpdate>>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<IdentityUpdate> = None;

    debug!(interval_ms = interval.as_millis() as u64, "Identity watcher started");
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let reading = provider.scope();
        if last.as_ref() == Some(&reading) {
            continue;
        }

        match &reading {
            Ok(scope) => info!(identity = ?scope.identity, network = %scope.network, "Identity scope changed"),
            Err(e) => warn!(error = %e, "Identity provider failed"),
        }
        last = Some(reading.clone());
        if !slot.deliver(reading) {
            break;
        }
    }
    debug!("Identity watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisig_test_helpers::{addr, OWNER_A, OWNER_B};
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    fn scope(owner: u64) -> IdentityScope {
        IdentityScope::new(Some(addr(owner)), NetworkId(1))
    }

    #[tokio::test]
    async fn test_reports_first_reading_and_changes() {
        let provider = ManualIdentity::new(scope(OWNER_A));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = IdentityWatcher::spawn(
            Arc::new(provider.clone()),
            Duration::from_millis(5),
            move |update| {
                let _ = tx.send(update);
            },
        );

        assert_eq!(rx.recv().await, Some(Ok(scope(OWNER_A))));

        provider.set_identity(Some(addr(OWNER_B)));
        assert_eq!(rx.recv().await, Some(Ok(scope(OWNER_B))));

        provider.set_network(NetworkId(5));
        assert_eq!(
            rx.recv().await,
            Some(Ok(IdentityScope::new(Some(addr(OWNER_B)), NetworkId(5))))
        );
    }

    #[tokio::test]
    async fn test_errors_are_passed_through() {
        let provider = ManualIdentity::new(scope(OWNER_A));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = IdentityWatcher::spawn(
            Arc::new(provider.clone()),
            Duration::from_millis(5),
            move |update| {
                let _ = tx.send(update);
            },
        );
        assert!(matches!(rx.recv().await, Some(Ok(_))));

        provider.fail("locked");
        assert_eq!(
            rx.recv().await,
            Some(Err(ProviderError::Unavailable("locked".into())))
        );

        provider.set_scope(scope(OWNER_A));
        assert_eq!(rx.recv().await, Some(Ok(scope(OWNER_A))));
    }

    #[tokio::test]
    async fn test_cancel_stops_callbacks() {
        let provider = ManualIdentity::new(scope(OWNER_A));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = IdentityWatcher::spawn(
            Arc::new(provider.clone()),
            Duration::from_millis(2),
            move |update| sink.lock().push(update),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        sub.cancel();
        let delivered = seen.lock().len();

        provider.set_identity(Some(addr(OWNER_B)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.lock().len(), delivered);
    }

    #[test]
    fn test_manual_identity_keeps_other_half() {
        let provider = ManualIdentity::new(scope(OWNER_A));
        provider.set_network(NetworkId(9));
        assert_eq!(provider.current_identity(), Ok(Some(addr(OWNER_A))));

        provider.fail("gone");
        assert!(provider.current_network().is_err());

        // Recovery keeps the network set before the failure.
        provider.set_identity(None);
        assert_eq!(provider.scope(), Ok(IdentityScope::new(None, NetworkId(9))));

        provider.fail("gone again");
        provider.set_network(NetworkId(3));
        assert_eq!(provider.current_identity(), Ok(None));
        assert_eq!(provider.current_network(), Ok(NetworkId(3)));
    }
}
