//! Live projection for one viewer.
//!
//! A single tokio task owns the [`ProjectionStore`]. It receives ledger
//! notifications and identity updates on one queue and handles them one at
//! a time, so the fold never runs concurrently with itself or with a
//! reload. The current view is published on a `watch` channel; readers get
//! immutable `Arc` snapshots.
//!
//! Policy:
//! - identity or network change: full reload from the ledger snapshot
//! - fold error: full re-bootstrap from the ledger snapshot
//! - provider error: view becomes `Failed` until the provider recovers
//! - ledger stopped: view becomes `Failed` and the task exits

use crate::bus::Delivery;
use crate::identity::{IdentityProvider, IdentityScope, IdentityUpdate, IdentityWatcher};
use crate::runner::LedgerHandle;
use crate::subscription::Subscription;
use multisig_projection::{Applied, ProjectionState, ProjectionStore};
use multisig_types::Notification;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What readers see.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionView {
    /// No projection built yet.
    Loading,
    /// Consistent with the ledger up to `state.sequence`.
    Ready(Arc<ProjectionState>),
    /// No usable projection; the reason is shown to the user.
    Failed(String),
}

impl ProjectionView {
    /// The projection, if one is ready.
    pub fn state(&self) -> Option<&Arc<ProjectionState>> {
        match self {
            ProjectionView::Ready(state) => Some(state),
            _ => None,
        }
    }

    /// Check if readers can use the projection.
    pub fn is_ready(&self) -> bool {
        matches!(self, ProjectionView::Ready(_))
    }
}

/// Counters reported when the service stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Notifications folded into the projection.
    pub folded: u64,
    /// Notifications already covered by a bootstrap.
    pub skipped: u64,
    /// Full loads for a new scope, including the first.
    pub reloads: u64,
    /// Full loads after a fold error.
    pub rebootstraps: u64,
}

enum Input {
    Notification(Delivery),
    Identity(IdentityUpdate),
}

/// Handle to a running projection task.
pub struct ProjectionService {
    view: watch::Receiver<ProjectionView>,
    shutdown: CancellationToken,
    task: JoinHandle<ServiceStats>,
}

impl ProjectionService {
    /// Start projecting `ledger` for whoever `provider` reports.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        ledger: LedgerHandle,
        provider: Arc<dyn IdentityProvider>,
        poll_interval: Duration,
    ) -> Self {
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ProjectionView::Loading);
        let shutdown = CancellationToken::new();

        // Subscribe before the first snapshot read so nothing committed
        // after the bootstrap point can be missed.
        let notifications_tx = inputs_tx.clone();
        let notifications = ledger.subscribe(move |delivery| {
            let _ = notifications_tx.send(Input::Notification(delivery));
        });

        let worker = Worker {
            store: ProjectionStore::new(None),
            scope: None,
            ledger,
            view: view_tx,
            stats: ServiceStats::default(),
        };
        let task = tokio::spawn(worker.run(
            provider,
            poll_interval,
            inputs_tx,
            inputs_rx,
            notifications,
            shutdown.clone(),
        ));

        Self {
            view: view_rx,
            shutdown,
            task,
        }
    }

    /// Receiver for view changes.
    pub fn view(&self) -> watch::Receiver<ProjectionView> {
        self.view.clone()
    }

    /// The view right now.
    pub fn current(&self) -> ProjectionView {
        self.view.borrow().clone()
    }

    /// Wait until the view satisfies `predicate`.
    ///
    /// Returns `None` if the service stops first.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&ProjectionView) -> bool,
    ) -> Option<ProjectionView> {
        let mut view = self.view.clone();
        view.wait_for(predicate).await.ok().map(|v| v.clone())
    }

    /// Wait until the projection reflects at least `sequence`.
    pub async fn wait_for_sequence(&self, sequence: u64) -> Option<Arc<ProjectionState>> {
        self.wait_until(|view| view.state().is_some_and(|s| s.sequence >= sequence))
            .await
            .and_then(|view| view.state().cloned())
    }

    /// Stop the task and drop its subscriptions.
    ///
    /// When this returns no further folds can happen.
    pub async fn shutdown(self) -> ServiceStats {
        self.shutdown.cancel();
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Projection task ended abnormally");
                ServiceStats::default()
            }
        }
    }
}

impl std::fmt::Debug for ProjectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionService")
            .field("ready", &self.view.borrow().is_ready())
            .finish()
    }
}

struct Worker {
    store: ProjectionStore,
    /// `None` until a scope is known, and while the provider is failing.
    scope: Option<IdentityScope>,
    ledger: LedgerHandle,
    view: watch::Sender<ProjectionView>,
    stats: ServiceStats,
}

impl Worker {
    async fn run(
        mut self,
        provider: Arc<dyn IdentityProvider>,
        poll_interval: Duration,
        inputs_tx: mpsc::UnboundedSender<Input>,
        mut inputs: mpsc::UnboundedReceiver<Input>,
        notifications: Subscription,
        shutdown: CancellationToken,
    ) -> ServiceStats {
        match provider.scope() {
            Ok(scope) => self.reload(scope),
            Err(e) => self.fail(e.to_string()),
        }

        let identity = IdentityWatcher::spawn(provider, poll_interval, move |update| {
            let _ = inputs_tx.send(Input::Identity(update));
        });

        loop {
            let input = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                input = inputs.recv() => match input {
                    Some(input) => input,
                    None => break,
                },
            };

            match input {
                Input::Notification(Ok(notification)) => self.on_notification(&notification),
                Input::Notification(Err(e)) => {
                    warn!(error = %e, "Ledger notifications ended");
                    self.fail(e.to_string());
                    break;
                }
                Input::Identity(Ok(scope)) => {
                    if self.scope != Some(scope) {
                        self.reload(scope);
                    }
                }
                Input::Identity(Err(e)) => {
                    self.scope = None;
                    self.store.invalidate();
                    self.fail(e.to_string());
                }
            }
        }

        identity.cancel();
        notifications.cancel();
        info!(
            folded = self.stats.folded,
            reloads = self.stats.reloads,
            rebootstraps = self.stats.rebootstraps,
            "Projection service stopped"
        );
        self.stats
    }

    fn on_notification(&mut self, notification: &Notification) {
        // Without a scope there is nothing to fold into; the next scope
        // triggers a full reload anyway.
        if self.scope.is_none() {
            return;
        }

        match self.store.apply(notification) {
            Ok(Applied::Folded) => {
                self.stats.folded += 1;
                self.publish_ready();
            }
            Ok(Applied::Skipped) => self.stats.skipped += 1,
            Err(e) => {
                warn!(
                    sequence = notification.sequence,
                    error = %e,
                    "Fold failed, re-bootstrapping projection"
                );
                self.stats.rebootstraps += 1;
                let snapshot = self.ledger.snapshot();
                self.store.bootstrap(&*snapshot);
                self.publish_ready();
            }
        }
    }

    fn reload(&mut self, scope: IdentityScope) {
        debug!(identity = ?scope.identity, network = %scope.network, "Reloading projection");
        self.scope = Some(scope);
        self.stats.reloads += 1;
        let snapshot = self.ledger.snapshot();
        self.store.set_viewer(scope.identity, &*snapshot);
        self.publish_ready();
    }

    fn publish_ready(&self) {
        if let Some(state) = self.store.state() {
            self.view.send_replace(ProjectionView::Ready(state));
        }
    }

    fn fail(&self, reason: String) {
        self.view.send_replace(ProjectionView::Failed(reason));
    }
}
