//! Scripted runs: build a ledger, drive it through a list of steps, and
//! report what the projection ends up showing.
//!
//! A scenario file is a node config plus `[[steps]]`:
//!
//! ```toml
//! [[steps]]
//! op = "deposit"
//! from = "0x…99"
//! amount = "100"
//!
//! [[steps]]
//! op = "submit"
//! caller = "0x…01"
//! to = "0x…07"
//! value = "40"
//! payload = "0x0123"
//!
//! [[steps]]
//! op = "view"
//! identity = "0x…02"
//! ```

use crate::config::{NodeConfig, NodeConfigError};
use crate::identity::ManualIdentity;
use crate::runner::{LedgerHandle, LedgerRunner};
use crate::service::{ProjectionService, ServiceStats};
use multisig_core::LedgerError;
use multisig_ledger::{LedgerReader, LedgerState};
use multisig_projection::ProjectionState;
use multisig_types::{Address, Amount, Notification, Payload, TxIndex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Upper bound on waiting for the projection to catch up.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that abort a scenario. Rejected steps do not; they are reported.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] NodeConfigError),

    #[error("failed to construct ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("projection did not settle within {0:?}")]
    Timeout(Duration),

    #[error("projection service stopped before settling")]
    ProjectionUnavailable,
}

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Deposit {
        from: Address,
        amount: Amount,
    },
    Submit {
        caller: Address,
        to: Address,
        #[serde(default)]
        value: Amount,
        #[serde(default)]
        payload: Payload,
    },
    Confirm {
        caller: Address,
        index: TxIndex,
    },
    Revoke {
        caller: Address,
        index: TxIndex,
    },
    Execute {
        caller: Address,
        index: TxIndex,
    },
    /// Switch the projection's viewer.
    View {
        #[serde(default)]
        identity: Option<Address>,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Submit { .. } => "submit",
            Step::Confirm { .. } => "confirm",
            Step::Revoke { .. } => "revoke",
            Step::Execute { .. } => "execute",
            Step::View { .. } => "view",
        }
    }

    async fn apply(&self, ledger: &LedgerHandle) -> Option<Result<Notification, LedgerError>> {
        let result = match self {
            Step::Deposit { from, amount } => ledger.deposit(*from, *amount).await,
            Step::Submit {
                caller,
                to,
                value,
                payload,
            } => ledger.submit(*caller, *to, *value, payload.clone()).await,
            Step::Confirm { caller, index } => ledger.confirm(*caller, *index).await,
            Step::Revoke { caller, index } => ledger.revoke(*caller, *index).await,
            Step::Execute { caller, index } => ledger.execute(*caller, *index).await,
            Step::View { .. } => return None,
        };
        Some(result)
    }
}

/// A node config plus the steps to run against it.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(flatten)]
    pub node: NodeConfig,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(NodeConfigError::from)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(content).map_err(NodeConfigError::from)?;
        scenario.node.validate()?;
        Ok(scenario)
    }
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub op: &'static str,
    /// Sequence of the committed notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// Why the ledger rejected the step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a scenario run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub outcomes: Vec<StepOutcome>,
    pub projection: ProjectionState,
    pub stats: ServiceStats,
}

impl ScenarioReport {
    pub fn rejected(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }
}

/// Run a scenario to completion.
///
/// Steps run strictly in order, each waiting for the ledger's answer. The
/// report's projection is taken once it has caught up with the ledger.
pub async fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
    let config = &scenario.node;
    let state = LedgerState::new(&config.ledger)?;
    let (ledger, task) = LedgerRunner::spawn(state, config.runtime.queue_capacity);

    let identity = ManualIdentity::new(config.viewer.scope());
    let service = ProjectionService::spawn(
        ledger.clone(),
        Arc::new(identity.clone()),
        config.runtime.poll_interval(),
    );

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for (step_no, step) in scenario.steps.iter().enumerate() {
        let mut outcome = StepOutcome {
            step: step_no,
            op: step.name(),
            sequence: None,
            error: None,
        };

        match step.apply(&ledger).await {
            Some(Ok(notification)) => outcome.sequence = Some(notification.sequence),
            Some(Err(e)) => {
                warn!(step = step_no, op = step.name(), error = %e, "Step rejected");
                outcome.error = Some(e.to_string());
            }
            None => {
                if let Step::View { identity: viewer } = step {
                    identity.set_identity(*viewer);
                    settle(service.wait_until(|view| {
                        view.state().is_some_and(|s| s.viewer == *viewer)
                    }))
                    .await?;
                }
            }
        }
        outcomes.push(outcome);
    }

    let last = ledger.snapshot().last_sequence();
    let projection = settle(service.wait_for_sequence(last)).await?;
    let stats = service.shutdown().await;

    ledger.shutdown();
    if let Err(e) = task.await {
        warn!(error = %e, "Ledger task ended abnormally");
    }

    info!(
        steps = outcomes.len(),
        sequence = projection.sequence,
        "Scenario finished"
    );
    Ok(ScenarioReport {
        outcomes,
        projection: ProjectionState::clone(&projection),
        stats,
    })
}

async fn settle<T>(wait: impl std::future::Future<Output = Option<T>>) -> Result<T, ScenarioError> {
    tokio::time::timeout(SETTLE_TIMEOUT, wait)
        .await
        .map_err(|_| ScenarioError::Timeout(SETTLE_TIMEOUT))?
        .ok_or(ScenarioError::ProjectionUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityScope;
    use multisig_test_helpers::{addr, OUTSIDER, OWNER_A, OWNER_B, OWNER_C};
    use multisig_types::NetworkId;

    fn scenario_toml(viewer: u64, steps: &str) -> String {
        format!(
            r#"
[ledger]
owners = ["{a}", "{b}", "{c}"]
threshold = 2

[viewer]
identity = "{viewer}"
network = 1

[runtime]
poll_interval_ms = 5

{steps}
"#,
            a = addr(OWNER_A),
            b = addr(OWNER_B),
            c = addr(OWNER_C),
            viewer = addr(viewer),
        )
    }

    fn step(op: &str, fields: &[(&str, String)]) -> String {
        let mut out = format!("[[steps]]\nop = \"{op}\"\n");
        for (key, value) in fields {
            out.push_str(&format!("{key} = {value}\n"));
        }
        out
    }

    fn quoted(a: Address) -> String {
        format!("\"{a}\"")
    }

    #[test]
    fn test_parse_steps() {
        let text = scenario_toml(
            OWNER_A,
            &[
                step(
                    "deposit",
                    &[("from", quoted(addr(OUTSIDER))), ("amount", "\"10\"".into())],
                ),
                step(
                    "submit",
                    &[("caller", quoted(addr(OWNER_A))), ("to", quoted(addr(7)))],
                ),
                step("view", &[]),
            ]
            .concat(),
        );
        let scenario = Scenario::from_toml(&text).unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(
            scenario.steps[1],
            Step::Submit {
                caller: addr(OWNER_A),
                to: addr(7),
                value: Amount::ZERO,
                payload: Payload::empty(),
            }
        );
        assert_eq!(scenario.steps[2], Step::View { identity: None });
        assert_eq!(scenario.node.runtime.poll_interval(), Duration::from_millis(5));
        assert_eq!(scenario.node.runtime.queue_capacity, 256);
        assert_eq!(scenario.node.ledger.threshold, 2);
        assert_eq!(
            scenario.node.viewer.scope(),
            IdentityScope::new(Some(addr(OWNER_A)), NetworkId(1))
        );
    }

    #[test]
    fn test_invalid_ledger_is_config_error() {
        let text = "[ledger]\nowners = []\nthreshold = 1\n";
        assert!(matches!(
            Scenario::from_toml(text),
            Err(ScenarioError::Config(NodeConfigError::Ledger(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_three_owner_flow() {
        let (a, b, c) = (addr(OWNER_A), addr(OWNER_B), addr(OWNER_C));
        let steps = [
            step(
                "deposit",
                &[("from", quoted(addr(OUTSIDER))), ("amount", "\"100\"".into())],
            ),
            step(
                "submit",
                &[
                    ("caller", quoted(a)),
                    ("to", quoted(addr(7))),
                    ("value", "\"40\"".into()),
                ],
            ),
            step("confirm", &[("caller", quoted(a)), ("index", "0".into())]),
            step("confirm", &[("caller", quoted(a)), ("index", "0".into())]),
            step("confirm", &[("caller", quoted(b)), ("index", "0".into())]),
            step("execute", &[("caller", quoted(c)), ("index", "0".into())]),
        ]
        .concat();
        let scenario = Scenario::from_toml(&scenario_toml(OWNER_A, &steps)).unwrap();

        let report = run_scenario(&scenario).await.unwrap();

        let rejected: Vec<usize> = report.rejected().map(|o| o.step).collect();
        assert_eq!(rejected, vec![3]);
        assert_eq!(report.outcomes[5].sequence, Some(5));

        let projection = &report.projection;
        assert_eq!(projection.sequence, 5);
        assert_eq!(projection.balance, Amount(60));
        let tx = projection.transaction(TxIndex(0)).unwrap();
        assert!(tx.executed);
        assert_eq!(tx.confirmation_count, 2);
        assert!(tx.is_confirmed_by_current_account);
    }

    #[tokio::test]
    async fn test_view_step_recomputes_flags() {
        let a = addr(OWNER_A);
        let steps = [
            step(
                "submit",
                &[("caller", quoted(a)), ("to", quoted(addr(7)))],
            ),
            step("confirm", &[("caller", quoted(a)), ("index", "0".into())]),
            step("view", &[("identity", quoted(addr(OWNER_C)))]),
        ]
        .concat();
        let scenario = Scenario::from_toml(&scenario_toml(OWNER_A, &steps)).unwrap();

        let report = run_scenario(&scenario).await.unwrap();
        assert_eq!(report.projection.viewer, Some(addr(OWNER_C)));
        assert!(
            !report
                .projection
                .transaction(TxIndex(0))
                .unwrap()
                .is_confirmed_by_current_account
        );
        assert!(report.stats.reloads >= 2);
    }
}
