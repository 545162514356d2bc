//! Core traits for state machines.

use crate::{Action, Event};

/// A state machine that processes events.
///
/// The ledger is implemented as a state machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O of its own
///
/// # Example
///
/// ```ignore
/// impl StateMachine for LedgerState {
///     fn handle(&mut self, event: Event) -> Vec<Action> {
///         match event {
///             Event::ValueReceived { request_id, sender, amount } => {
///                 let notification = self.deposit(sender, amount);
///                 // ... emit notification + result
///             }
///             // ... etc
///         }
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and event, always returns the same actions
    /// - **Ordered**: A committed operation yields its `EmitNotification` before its
    ///   `EmitResult`, and nothing from a later event is interleaved
    ///
    /// # Arguments
    ///
    /// * `event` - The event to process
    ///
    /// # Returns
    ///
    /// A list of actions for the runner to execute:
    /// - Publishing notifications to subscribers
    /// - Resolving the caller's pending request
    fn handle(&mut self, event: Event) -> Vec<Action>;
}
