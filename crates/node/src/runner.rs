//! Async runner that owns the ledger.
//!
//! One tokio task holds the [`LedgerState`] and is its only writer. Callers
//! talk to it through a cloneable [`LedgerHandle`]: intents go over a
//! bounded channel, results come back on a oneshot keyed by [`RequestId`].
//!
//! After every commit the runner first publishes the new snapshot, then the
//! notification. A subscriber that reacts to a notification by reading the
//! snapshot therefore never sees state older than that notification.

use crate::bus::{Delivery, NotificationBus};
use crate::subscription::Subscription;
use arc_swap::ArcSwap;
use multisig_core::{Action, Event, LedgerError, OwnerIntent, RequestId, StateMachine};
use multisig_ledger::{LedgerReader, LedgerSnapshot, LedgerState};
use multisig_types::{Address, Amount, Notification, Payload, TxIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type Reply = oneshot::Sender<Result<Notification, LedgerError>>;

enum Request {
    Deposit {
        sender: Address,
        amount: Amount,
        reply: Reply,
    },
    Intent {
        caller: Address,
        intent: OwnerIntent,
        reply: Reply,
    },
}

/// Owns the ledger and processes requests one at a time.
pub struct LedgerRunner {
    state: LedgerState,
    requests: mpsc::Receiver<Request>,
    snapshot: Arc<ArcSwap<LedgerSnapshot>>,
    bus: NotificationBus,
    pending_requests: HashMap<RequestId, Reply>,
    next_request_id: u64,
    shutdown: CancellationToken,
}

impl LedgerRunner {
    /// Start the runner on the current tokio runtime.
    ///
    /// `queue_capacity` bounds the number of requests waiting for the
    /// ledger; callers beyond it wait for space.
    pub fn spawn(state: LedgerState, queue_capacity: usize) -> (LedgerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let snapshot = Arc::new(ArcSwap::from_pointee(state.snapshot()));
        let bus = NotificationBus::new();
        let shutdown = CancellationToken::new();

        let runner = Self {
            state,
            requests: rx,
            snapshot: snapshot.clone(),
            bus: bus.clone(),
            pending_requests: HashMap::new(),
            next_request_id: 0,
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(runner.run());

        let handle = LedgerHandle {
            requests: tx,
            snapshot,
            bus,
            shutdown,
        };
        (handle, task)
    }

    async fn run(mut self) {
        info!(
            sequence = self.snapshot.load().last_sequence(),
            "Ledger runner started"
        );

        loop {
            let request = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                request = self.requests.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };
            self.process(request);
        }

        // Callers still waiting get RunnerStopped when their reply drops.
        self.requests.close();
        self.bus.close();
        info!(handled = self.next_request_id, "Ledger runner stopped");
    }

    fn process(&mut self, request: Request) {
        let request_id = RequestId(self.next_request_id);
        self.next_request_id += 1;

        let event = match request {
            Request::Deposit {
                sender,
                amount,
                reply,
            } => {
                self.pending_requests.insert(request_id, reply);
                Event::ValueReceived {
                    request_id,
                    sender,
                    amount,
                }
            }
            Request::Intent {
                caller,
                intent,
                reply,
            } => {
                self.pending_requests.insert(request_id, reply);
                Event::IntentSubmitted {
                    request_id,
                    caller,
                    intent,
                }
            }
        };

        debug!(request = %request_id, event = event.type_name(), "Handling request");
        for action in self.state.handle(event) {
            self.process_action(action);
        }
    }

    fn process_action(&mut self, action: Action) {
        match action {
            Action::EmitNotification { notification } => {
                self.snapshot.store(Arc::new(self.state.snapshot()));
                self.bus.publish(&notification);
            }
            Action::EmitResult { request_id, result } => {
                match self.pending_requests.remove(&request_id) {
                    Some(reply) => {
                        // Caller may have given up waiting.
                        let _ = reply.send(result);
                    }
                    None => warn!(request = %request_id, "Result for unknown request"),
                }
            }
        }
    }
}

/// Cloneable client of a running ledger.
#[derive(Clone)]
pub struct LedgerHandle {
    requests: mpsc::Sender<Request>,
    snapshot: Arc<ArcSwap<LedgerSnapshot>>,
    bus: NotificationBus,
    shutdown: CancellationToken,
}

impl LedgerHandle {
    // ═══════════════════════════════════════════════════════════════════════════
    // Operations
    // ═══════════════════════════════════════════════════════════════════════════

    /// Send value to the ledger.
    pub async fn deposit(&self, sender: Address, amount: Amount) -> Result<Notification, LedgerError> {
        self.call(|reply| Request::Deposit {
            sender,
            amount,
            reply,
        })
        .await
    }

    /// Propose a transaction. The assigned index is in the returned
    /// notification.
    pub async fn submit(
        &self,
        caller: Address,
        to: Address,
        value: Amount,
        payload: Payload,
    ) -> Result<Notification, LedgerError> {
        self.intent(caller, OwnerIntent::Submit { to, value, payload })
            .await
    }

    /// Add the caller's confirmation to a pending transaction.
    pub async fn confirm(&self, caller: Address, index: TxIndex) -> Result<Notification, LedgerError> {
        self.intent(caller, OwnerIntent::Confirm { index }).await
    }

    /// Withdraw the caller's confirmation from a pending transaction.
    pub async fn revoke(&self, caller: Address, index: TxIndex) -> Result<Notification, LedgerError> {
        self.intent(caller, OwnerIntent::Revoke { index }).await
    }

    /// Execute a transaction that has reached the threshold.
    pub async fn execute(&self, caller: Address, index: TxIndex) -> Result<Notification, LedgerError> {
        self.intent(caller, OwnerIntent::Execute { index }).await
    }

    /// Send any owner intent.
    pub async fn intent(
        &self,
        caller: Address,
        intent: OwnerIntent,
    ) -> Result<Notification, LedgerError> {
        self.call(|reply| Request::Intent {
            caller,
            intent,
            reply,
        })
        .await
    }

    async fn call(&self, build: impl FnOnce(Reply) -> Request) -> Result<Notification, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(build(tx))
            .await
            .map_err(|_| LedgerError::RunnerStopped)?;
        rx.await.map_err(|_| LedgerError::RunnerStopped)?
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Reads and subscriptions
    // ═══════════════════════════════════════════════════════════════════════════

    /// Latest committed state. Never blocks the writer.
    pub fn snapshot(&self) -> Arc<LedgerSnapshot> {
        self.snapshot.load_full()
    }

    /// Receive every notification committed after this call.
    pub fn subscribe(&self, callback: impl FnMut(Delivery) + Send + 'static) -> Subscription {
        self.bus.subscribe(callback)
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Stop the runner. Queued requests fail with `RunnerStopped`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }
}

impl std::fmt::Debug for LedgerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerHandle")
            .field("sequence", &self.snapshot.load().last_sequence())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisig_test_helpers::{addr, three_owner_ledger, OUTSIDER, OWNER_A, OWNER_B};
    use multisig_types::LedgerEvent;
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    #[traced_test]
    #[tokio::test]
    async fn test_requests_resolve_in_order() {
        let (ledger, task) = LedgerRunner::spawn(three_owner_ledger(), 8);
        let (a, b) = (addr(OWNER_A), addr(OWNER_B));

        let deposit = ledger.deposit(addr(OUTSIDER), Amount(50)).await.unwrap();
        assert_eq!(deposit.sequence, 1);

        let submit = ledger
            .submit(a, addr(7), Amount(20), Payload::empty())
            .await
            .unwrap();
        assert_eq!(submit.event.tx_index(), Some(TxIndex(0)));

        ledger.confirm(a, TxIndex(0)).await.unwrap();
        ledger.confirm(b, TxIndex(0)).await.unwrap();
        let executed = ledger.execute(b, TxIndex(0)).await.unwrap();
        assert_eq!(executed.sequence, 5);

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.balance(), Amount(30));
        assert_eq!(snapshot.last_sequence(), 5);

        ledger.shutdown();
        task.await.unwrap();
        assert!(logs_contain("Ledger runner stopped"));
    }

    #[tokio::test]
    async fn test_rejection_returns_error_without_notification() {
        let (ledger, _task) = LedgerRunner::spawn(three_owner_ledger(), 8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = ledger.subscribe(move |d| sink.lock().push(d));

        let err = ledger
            .submit(addr(OUTSIDER), addr(7), Amount(1), Payload::empty())
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::Unauthorized(addr(OUTSIDER)));
        assert!(seen.lock().is_empty());
        assert_eq!(ledger.snapshot().last_sequence(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_published_before_notification() {
        let (ledger, _task) = LedgerRunner::spawn(three_owner_ledger(), 8);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = observed.clone();
        let reader = ledger.clone();
        let _sub = ledger.subscribe(move |d| {
            let n = d.unwrap();
            sink.lock()
                .push((n.sequence, reader.snapshot().last_sequence()));
        });

        ledger.deposit(addr(OUTSIDER), Amount(1)).await.unwrap();
        ledger.deposit(addr(OUTSIDER), Amount(2)).await.unwrap();

        let observed = observed.lock().clone();
        assert_eq!(observed.len(), 2);
        for (notified, snapshot) in observed {
            assert!(snapshot >= notified);
        }
    }

    #[tokio::test]
    async fn test_stopped_runner_rejects_requests() {
        let (ledger, task) = LedgerRunner::spawn(three_owner_ledger(), 1);
        let closed = Arc::new(Mutex::new(Vec::new()));
        let sink = closed.clone();
        let _sub = ledger.subscribe(move |d| sink.lock().push(d));

        ledger.shutdown();
        task.await.unwrap();

        assert!(!ledger.is_running());
        assert_eq!(
            ledger.deposit(addr(OUTSIDER), Amount(1)).await,
            Err(LedgerError::RunnerStopped)
        );
        assert!(matches!(
            closed.lock().as_slice(),
            [Err(crate::bus::DeliveryError::Closed)]
        ));
    }

    #[tokio::test]
    async fn test_notifications_carry_events() {
        let (ledger, _task) = LedgerRunner::spawn(three_owner_ledger(), 8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = ledger.subscribe(move |d| sink.lock().push(d.unwrap().event));

        ledger.deposit(addr(OUTSIDER), Amount(9)).await.unwrap();
        assert_eq!(
            seen.lock().clone(),
            vec![LedgerEvent::Deposit {
                sender: addr(OUTSIDER),
                amount: Amount(9),
                balance: Amount(9),
            }]
        );
    }
}
