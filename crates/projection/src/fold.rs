//! The pure transition `(state, notification) -> state`.

use crate::error::ProjectionError;
use crate::state::{ProjectedTransaction, ProjectionState};
use multisig_types::{LedgerEvent, Notification, TxIndex};

/// Fold one notification into a projection.
///
/// Deterministic: the result depends only on `state` and `notification`.
/// Not idempotent: the notification must carry exactly the next sequence
/// number, otherwise `OutOfOrder` is returned. On error the input state is
/// consumed and must be rebuilt by bootstrap.
pub fn fold(
    mut state: ProjectionState,
    notification: &Notification,
) -> Result<ProjectionState, ProjectionError> {
    let expected = state.sequence + 1;
    if notification.sequence != expected {
        return Err(ProjectionError::OutOfOrder {
            expected,
            actual: notification.sequence,
        });
    }

    match &notification.event {
        LedgerEvent::Deposit { balance, .. } => {
            state.balance = *balance;
        }

        LedgerEvent::Submit {
            index,
            to,
            value,
            payload,
            ..
        } => {
            let next = TxIndex(state.transaction_count);
            if *index < next {
                return Err(ProjectionError::DuplicateTransaction(*index));
            }
            if *index > next {
                return Err(ProjectionError::MissingTransaction(next));
            }
            state.transactions.insert(
                0,
                ProjectedTransaction {
                    index: *index,
                    to: *to,
                    value: *value,
                    payload: payload.clone(),
                    executed: false,
                    confirmation_count: 0,
                    is_confirmed_by_current_account: false,
                },
            );
            state.transaction_count += 1;
        }

        LedgerEvent::Confirm { owner, index } => {
            let viewer = state.viewer;
            let tx = state
                .transaction_mut(*index)
                .ok_or(ProjectionError::MissingTransaction(*index))?;
            tx.confirmation_count += 1;
            if viewer == Some(*owner) {
                tx.is_confirmed_by_current_account = true;
            }
        }

        LedgerEvent::Revoke { owner, index } => {
            let viewer = state.viewer;
            let tx = state
                .transaction_mut(*index)
                .ok_or(ProjectionError::MissingTransaction(*index))?;
            tx.confirmation_count = tx
                .confirmation_count
                .checked_sub(1)
                .ok_or(ProjectionError::CountUnderflow(*index))?;
            if viewer == Some(*owner) {
                tx.is_confirmed_by_current_account = false;
            }
        }

        LedgerEvent::Execute { index, .. } => {
            state
                .transaction_mut(*index)
                .ok_or(ProjectionError::MissingTransaction(*index))?
                .executed = true;
        }
    }

    state.sequence = notification.sequence;
    Ok(state)
}

/// Fold a sequence of notifications in order, stopping at the first error.
pub fn replay<'a>(
    state: ProjectionState,
    notifications: impl IntoIterator<Item = &'a Notification>,
) -> Result<ProjectionState, ProjectionError> {
    notifications.into_iter().try_fold(state, fold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisig_ledger::{LedgerReader, LedgerState};
    use multisig_test_helpers::{addr, three_owner_ledger, OWNER_A, OWNER_B, OWNER_C, OUTSIDER};
    use multisig_types::{Amount, Payload};

    /// Run a short history on a fresh ledger, returning it with its notifications.
    fn history() -> (ProjectionState, LedgerState, Vec<Notification>) {
        let mut ledger = three_owner_ledger();
        let genesis = ProjectionState::bootstrap(&ledger, Some(addr(OWNER_B)));
        let (a, b) = (addr(OWNER_A), addr(OWNER_B));

        let log = vec![
            ledger.deposit(addr(OUTSIDER), Amount(100)),
            ledger
                .submit(a, addr(7), Amount(40), Payload::from_hex("0x0123").unwrap())
                .unwrap(),
            ledger
                .submit(b, addr(8), Amount(1), Payload::empty())
                .unwrap(),
            ledger.confirm(a, TxIndex(0)).unwrap(),
            ledger.confirm(b, TxIndex(0)).unwrap(),
            ledger.confirm(b, TxIndex(1)).unwrap(),
            ledger.revoke(b, TxIndex(1)).unwrap(),
            ledger.execute(a, TxIndex(0)).unwrap(),
        ];
        (genesis, ledger, log)
    }

    #[test]
    fn test_fold_matches_fresh_bootstrap() {
        let (genesis, ledger, log) = history();
        let folded = replay(genesis, &log).unwrap();
        let fresh = ProjectionState::bootstrap(&ledger, Some(addr(OWNER_B)));
        assert_eq!(folded, fresh);

        assert_eq!(folded.balance, Amount(60));
        assert_eq!(folded.transactions[0].index, TxIndex(1));
        assert_eq!(folded.transactions[1].index, TxIndex(0));

        let tx0 = folded.transaction(TxIndex(0)).unwrap();
        assert!(tx0.executed);
        assert_eq!(tx0.confirmation_count, 2);
        assert!(tx0.is_confirmed_by_current_account);

        let tx1 = folded.transaction(TxIndex(1)).unwrap();
        assert_eq!(tx1.confirmation_count, 0);
        assert!(!tx1.is_confirmed_by_current_account);
    }

    #[test]
    fn test_fold_is_deterministic() {
        let (genesis, _, log) = history();
        let first = replay(genesis.clone(), &log).unwrap();
        let second = replay(genesis, &log).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_deposit_replaces_balance() {
        let (genesis, _, _) = history();
        let notification = Notification::new(
            1,
            LedgerEvent::Deposit {
                sender: addr(OUTSIDER),
                amount: Amount(5),
                balance: Amount(500),
            },
        );
        let state = fold(genesis, &notification).unwrap();
        assert_eq!(state.balance, Amount(500));
    }

    #[test]
    fn test_confirm_by_other_owner_leaves_flag() {
        let (genesis, _, log) = history();
        // Up to and including A's confirmation of tx 0.
        let state = replay(genesis, &log[..4]).unwrap();
        let tx0 = state.transaction(TxIndex(0)).unwrap();
        assert_eq!(tx0.confirmation_count, 1);
        assert!(!tx0.is_confirmed_by_current_account);
    }

    #[test]
    fn test_missing_index_is_fatal() {
        let (genesis, _, _) = history();
        let notification = Notification::new(
            1,
            LedgerEvent::Confirm {
                owner: addr(OWNER_C),
                index: TxIndex(3),
            },
        );
        assert!(matches!(
            fold(genesis, &notification),
            Err(ProjectionError::MissingTransaction(TxIndex(3)))
        ));
    }

    #[test]
    fn test_sequence_gap_is_fatal() {
        let (genesis, _, log) = history();
        let state = fold(genesis, &log[0]).unwrap();
        assert!(matches!(
            fold(state, &log[2]),
            Err(ProjectionError::OutOfOrder {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_duplicate_delivery_is_rejected() {
        let (genesis, _, log) = history();
        let state = replay(genesis, &log[..2]).unwrap();
        assert!(matches!(
            fold(state, &log[1]),
            Err(ProjectionError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_submit_index_checks() {
        let (genesis, _, _) = history();
        let submit = |sequence, index| {
            Notification::new(
                sequence,
                LedgerEvent::Submit {
                    owner: addr(OWNER_A),
                    index: TxIndex(index),
                    to: addr(7),
                    value: Amount(0),
                    payload: Payload::empty(),
                },
            )
        };

        let state = fold(genesis.clone(), &submit(1, 0)).unwrap();
        assert!(matches!(
            fold(state, &submit(2, 0)),
            Err(ProjectionError::DuplicateTransaction(TxIndex(0)))
        ));
        assert!(matches!(
            fold(genesis, &submit(1, 2)),
            Err(ProjectionError::MissingTransaction(TxIndex(0)))
        ));
    }

    #[test]
    fn test_revoke_underflow_is_fatal() {
        let (genesis, _, log) = history();
        let state = replay(genesis, &log[..2]).unwrap();
        let revoke = Notification::new(
            3,
            LedgerEvent::Revoke {
                owner: addr(OWNER_A),
                index: TxIndex(0),
            },
        );
        assert!(matches!(
            fold(state, &revoke),
            Err(ProjectionError::CountUnderflow(TxIndex(0)))
        ));
    }

    #[test]
    fn test_ready_and_awaiting_views() {
        let (genesis, _, log) = history();
        // Before execution: tx 0 has two confirmations, tx 1 none.
        let state = replay(genesis, &log[..7]).unwrap();

        let ready: Vec<_> = state.ready_to_execute().map(|tx| tx.index).collect();
        assert_eq!(ready, vec![TxIndex(0)]);

        let awaiting: Vec<_> = state.awaiting_viewer().map(|tx| tx.index).collect();
        assert_eq!(awaiting, vec![TxIndex(1)]);
    }

    #[test]
    fn test_outsider_viewer_sees_no_flags() {
        let (_, ledger, _) = history();
        let state = ProjectionState::bootstrap(&ledger, Some(addr(OUTSIDER)));
        assert!(!state.viewer_is_owner);
        assert!(state
            .transactions
            .iter()
            .all(|tx| !tx.is_confirmed_by_current_account));
        assert_eq!(state.awaiting_viewer().count(), 0);
        assert_eq!(state.sequence, ledger.last_sequence());
    }
}
