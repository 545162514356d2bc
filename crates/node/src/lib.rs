//! Async node: runs the ledger, delivers its notifications, and keeps a
//! live projection for the current viewer.
//!
//! # Architecture
//!
//! ```text
//!  callers ──LedgerHandle──▶ LedgerRunner (owns LedgerState)
//!                                 │ 1. store snapshot (ArcSwap)
//!                                 │ 2. publish notification
//!                                 ▼
//!                          NotificationBus ──▶ ProjectionService ──watch──▶ readers
//!                                                     ▲
//!                     IdentityProvider ──poll── IdentityWatcher
//! ```
//!
//! Every callback registration returns a [`Subscription`]; cancelling it
//! (or dropping it) guarantees the callback never runs again.

mod bus;
mod config;
mod identity;
mod runner;
mod scenario;
mod service;
mod subscription;

pub use bus::{Delivery, DeliveryError, NotificationBus};
pub use config::{NodeConfig, NodeConfigError, RuntimeConfig, ViewerConfig};
pub use identity::{
    IdentityProvider, IdentityScope, IdentityUpdate, IdentityWatcher, ManualIdentity,
    ProviderError, DEFAULT_POLL_INTERVAL,
};
pub use runner::{LedgerHandle, LedgerRunner};
pub use scenario::{run_scenario, Scenario, ScenarioError, ScenarioReport, Step, StepOutcome};
pub use service::{ProjectionService, ProjectionView, ServiceStats};
pub use subscription::Subscription;
