//! Property-based tests for ledger replay and reconciliation.
//!
//! - Property 1: Replaying the rows a sequence of movements produced yields
//!   the balance those movements left behind
//! - Property 2: Rows produced by planning are correctly chained
//! - Property 3: Reconciliation is idempotent and writes a row for every
//!   correction

use cashpoint_shared::types::{ActorId, CurrencyId, MovementId, PointId, ReferenceId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::replay::{LedgerRow, replay, verify_chain};
use super::service::ReconciliationService;
use crate::ledger::{
    BalanceScope, BalanceSnapshot, DeliveryMethod, Direction, LedgerService, PlannedMovement,
    RecordMovementInput, ReferenceType, WithdrawalPolicy,
};

fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn request() -> impl Strategy<Value = (Direction, Decimal, DeliveryMethod)> {
    (
        prop_oneof![Just(Direction::Income), Just(Direction::Expense)],
        positive_amount(),
        prop_oneof![
            Just(DeliveryMethod::Cash),
            Just(DeliveryMethod::Bank),
            Just(DeliveryMethod::Mixed),
        ],
    )
}

fn to_row(seq: i64, planned: &PlannedMovement) -> LedgerRow {
    LedgerRow {
        id: MovementId::new(),
        seq,
        direction: planned.direction,
        bucket: planned.bucket,
        amount: planned.amount,
        bills_delta: planned.bills_delta,
        coins_delta: planned.coins_delta,
        balance_before: planned.balance_before,
        balance_after: planned.balance_after,
    }
}

/// Runs the requests through the planner, keeping the successful ones.
fn run(requests: &[(Direction, Decimal, DeliveryMethod)]) -> (BalanceSnapshot, Vec<LedgerRow>) {
    let policy = WithdrawalPolicy::default();
    let mut current = BalanceSnapshot::zero();
    let mut rows = Vec::new();

    for (direction, amount, method) in requests {
        let input = RecordMovementInput {
            point_id: PointId::new(),
            currency_id: CurrencyId::new(),
            direction: *direction,
            amount: *amount,
            delivery_method: *method,
            breakdown: None,
            service: None,
            reference_type: ReferenceType::Exchange,
            reference_id: ReferenceId::new(),
            actor_id: ActorId::new(),
            description: None,
        };
        if let Ok(plan) = LedgerService::plan_movement(&input, &current, None, &policy) {
            for planned in plan.movements() {
                let seq = i64::try_from(rows.len()).unwrap_or(i64::MAX - 1) + 1;
                rows.push(to_row(seq, planned));
            }
            current = plan.general.after;
        }
    }

    (current, rows)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1.1: Replay equals the balance left by the movements.
    #[test]
    fn prop_replay_matches_stored(requests in prop::collection::vec(request(), 0..40)) {
        let (stored, rows) = run(&requests);
        let theoretical = replay(&rows).unwrap();
        prop_assert_eq!(theoretical.balance, stored);
        prop_assert!(!ReconciliationService::has_drift(&stored, &theoretical.balance));
    }

    /// Property 2.1: Planned rows chain per bucket.
    #[test]
    fn prop_planned_rows_are_chained(requests in prop::collection::vec(request(), 0..40)) {
        let (_, rows) = run(&requests);
        prop_assert!(verify_chain(&rows).is_empty());
    }

    /// Property 3.1: After a correction, replaying the ledger (adjustments
    /// included) yields the same theoretical balance and a second decision
    /// is a no-op.
    #[test]
    fn prop_reconciliation_idempotent(
        requests in prop::collection::vec(request(), 1..40),
        corruption in -10_000i64..10_000i64,
    ) {
        let (stored, mut rows) = run(&requests);
        let mut corrupted = stored;
        corrupted.cash_bills += Decimal::new(corruption, 2);
        corrupted.quantity += Decimal::new(corruption, 2);

        let theoretical = replay(&rows).unwrap().balance;
        let first = ReconciliationService::decide(BalanceScope::General, &corrupted, &theoretical);
        for adjustment in &first.adjustments {
            let seq = i64::try_from(rows.len()).unwrap_or(i64::MAX - 1) + 1;
            rows.push(to_row(seq, adjustment));
        }

        let replayed = replay(&rows).unwrap().balance;
        prop_assert_eq!(replayed, theoretical);
        let second = ReconciliationService::decide(BalanceScope::General, &first.after, &replayed);
        prop_assert!(!second.corrected);
    }

    /// Property 3.2: A bills/coins reshuffle with an unchanged total is
    /// written as rows that pass replay and keep the chain.
    #[test]
    fn prop_reshuffle_is_recorded(
        requests in prop::collection::vec(request(), 1..40),
        shift in 2i64..10_000i64,
        into_coins in any::<bool>(),
    ) {
        let (stored, mut rows) = run(&requests);
        let shift = Decimal::new(if into_coins { shift } else { -shift }, 2);
        let mut corrupted = stored;
        corrupted.cash_bills -= shift;
        corrupted.cash_coins += shift;

        let theoretical = replay(&rows).unwrap().balance;
        let decision = ReconciliationService::decide(BalanceScope::General, &corrupted, &theoretical);
        prop_assert!(decision.corrected);
        prop_assert_eq!(decision.adjustments.len(), 2);
        for adjustment in &decision.adjustments {
            let seq = i64::try_from(rows.len()).unwrap_or(i64::MAX - 1) + 1;
            rows.push(to_row(seq, adjustment));
        }

        prop_assert_eq!(replay(&rows).unwrap().balance, theoretical);
        prop_assert!(verify_chain(&rows).is_empty());
    }
}
