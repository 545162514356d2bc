//! Owner of a projection: bootstrap, fold, and the stale/re-bootstrap policy.

use crate::error::ProjectionError;
use crate::fold::fold;
use crate::state::ProjectionState;
use multisig_ledger::LedgerReader;
use multisig_types::{decode_notification, Address, Notification};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What `apply` did with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Folded into the projection.
    Folded,
    /// Already reflected in the bootstrap snapshot; ignored.
    Skipped,
}

/// Lifecycle of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Never bootstrapped.
    Empty,
    /// Mirrors the ledger up to `state().sequence`.
    Ready,
    /// A consistency error or scope change invalidated the projection.
    Stale,
}

/// Holds the projection for one viewer and is its only writer.
///
/// Readers get `Arc` snapshots of the state; nothing outside the store can
/// mutate it. Any fold error marks the store stale, and a stale store
/// refuses further folds until [`bootstrap`](Self::bootstrap) is called.
#[derive(Debug)]
pub struct ProjectionStore {
    viewer: Option<Address>,
    state: Option<Arc<ProjectionState>>,
    status: StoreStatus,
}

impl ProjectionStore {
    /// Create an empty store for `viewer`.
    pub fn new(viewer: Option<Address>) -> Self {
        Self {
            viewer,
            state: None,
            status: StoreStatus::Empty,
        }
    }

    /// Identity flags are computed for.
    pub fn viewer(&self) -> Option<Address> {
        self.viewer
    }

    /// Current lifecycle status.
    pub fn status(&self) -> StoreStatus {
        self.status
    }

    /// Check if folds are currently refused.
    pub fn is_stale(&self) -> bool {
        self.status != StoreStatus::Ready
    }

    /// Latest projection, if one has been built.
    ///
    /// A stale store still returns the last good state for display.
    pub fn state(&self) -> Option<Arc<ProjectionState>> {
        self.state.clone()
    }

    /// Replace the projection with a full read of ledger state.
    pub fn bootstrap(&mut self, reader: &dyn LedgerReader) -> Arc<ProjectionState> {
        let state = Arc::new(ProjectionState::bootstrap(reader, self.viewer));
        self.state = Some(state.clone());
        self.status = StoreStatus::Ready;
        state
    }

    /// Switch to a new viewer. Always a full reload: confirmation flags do
    /// not carry over between identities.
    pub fn set_viewer(
        &mut self,
        viewer: Option<Address>,
        reader: &dyn LedgerReader,
    ) -> Arc<ProjectionState> {
        info!(old = ?self.viewer, new = ?viewer, "Viewer changed, reloading projection");
        self.viewer = viewer;
        self.bootstrap(reader)
    }

    /// Mark the projection unusable until the next bootstrap.
    pub fn invalidate(&mut self) {
        if self.status == StoreStatus::Ready {
            debug!("Projection invalidated");
            self.status = StoreStatus::Stale;
        }
    }

    /// Fold a notification.
    ///
    /// Notifications at or before the bootstrap point are skipped. Anything
    /// that cannot be folded is surfaced and leaves the store stale.
    pub fn apply(&mut self, notification: &Notification) -> Result<Applied, ProjectionError> {
        let current = match (&self.state, self.status) {
            (Some(state), StoreStatus::Ready) => state,
            _ => return Err(ProjectionError::Stale),
        };

        if notification.sequence <= current.sequence {
            debug!(
                sequence = notification.sequence,
                bootstrap = current.sequence,
                "Skipping notification covered by bootstrap"
            );
            return Ok(Applied::Skipped);
        }

        match fold(ProjectionState::clone(current), notification) {
            Ok(next) => {
                debug!(
                    sequence = next.sequence,
                    kind = %notification.kind(),
                    "Folded notification"
                );
                self.state = Some(Arc::new(next));
                Ok(Applied::Folded)
            }
            Err(e) => {
                warn!(sequence = notification.sequence, error = %e, "Projection inconsistent with ledger");
                self.status = StoreStatus::Stale;
                Err(e)
            }
        }
    }

    /// Decode a wire-format notification and fold it.
    pub fn apply_encoded(&mut self, data: &[u8]) -> Result<Applied, ProjectionError> {
        if self.is_stale() {
            return Err(ProjectionError::Stale);
        }
        match decode_notification(data) {
            Ok(notification) => self.apply(&notification),
            Err(e) => {
                warn!(error = %e, "Malformed notification");
                self.status = StoreStatus::Stale;
                Err(ProjectionError::Malformed(e))
            }
        }
    }
}
