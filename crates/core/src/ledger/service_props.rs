//! Property-based tests for LedgerService.
//!
//! - Property 1: Planned balances move by exactly the signed amount
//! - Property 2: Every planned row satisfies `after = before + signed(amount)`
//! - Property 3: Sequences of valid movements keep every bucket above the floor
//! - Property 4: Service legs mirror the general leg

use cashpoint_shared::types::{ActorId, CurrencyId, PointId, ReferenceId, TOLERANCE};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::allocation::WithdrawalPolicy;
use super::balance::BalanceSnapshot;
use super::error::LedgerError;
use super::service::LedgerService;
use super::types::{
    Bucket, CashBreakdown, DeliveryMethod, Direction, RecordMovementInput, ReferenceType,
    SubBucketAmounts,
};
use crate::catalog::ExternalService;

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Income), Just(Direction::Expense)]
}

fn delivery_method() -> impl Strategy<Value = DeliveryMethod> {
    prop_oneof![
        Just(DeliveryMethod::Cash),
        Just(DeliveryMethod::Bank),
        Just(DeliveryMethod::Mixed),
    ]
}

/// Helper to create a movement request.
fn make_input(
    direction: Direction,
    amount: Decimal,
    delivery_method: DeliveryMethod,
    breakdown: Option<CashBreakdown>,
) -> RecordMovementInput {
    RecordMovementInput {
        point_id: PointId::new(),
        currency_id: CurrencyId::new(),
        direction,
        amount,
        delivery_method,
        breakdown,
        service: None,
        reference_type: ReferenceType::Exchange,
        reference_id: ReferenceId::new(),
        actor_id: ActorId::new(),
        description: None,
    }
}

fn balance() -> impl Strategy<Value = BalanceSnapshot> {
    (0i64..1_000_000i64, 0i64..100_000i64, 0i64..1_000_000i64).prop_map(|(b, c, k)| {
        BalanceSnapshot::from_parts(SubBucketAmounts::new(
            Decimal::new(b, 2),
            Decimal::new(c, 2),
            Decimal::new(k, 2),
        ))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1.1: A successful plan moves `quantity` by the signed amount.
    #[test]
    fn prop_quantity_moves_by_signed_amount(
        start in balance(),
        direction in direction(),
        amount in positive_amount(),
        method in delivery_method(),
    ) {
        let input = make_input(direction, amount, method, None);
        let policy = WithdrawalPolicy::default();

        if let Ok(plan) = LedgerService::plan_movement(&input, &start, None, &policy) {
            let sign = direction.sign().unwrap();
            prop_assert_eq!(plan.general.after.quantity, start.quantity + sign * amount);
            prop_assert!(plan.general.after.is_consistent());
            let moved: Decimal = plan.general.movements.iter().map(|m| m.amount).sum();
            prop_assert_eq!(moved, amount);
        }
    }

    /// Property 2.1: Each row's after equals before plus the signed amount,
    /// and before equals the stored bucket total.
    #[test]
    fn prop_rows_are_self_consistent(
        start in balance(),
        direction in direction(),
        amount in positive_amount(),
        method in delivery_method(),
    ) {
        let input = make_input(direction, amount, method, None);
        let policy = WithdrawalPolicy::default();

        if let Ok(plan) = LedgerService::plan_movement(&input, &start, None, &policy) {
            for row in plan.movements() {
                let sign = row.direction.sign().unwrap();
                prop_assert_eq!(row.balance_after, row.balance_before + sign * row.amount);
                prop_assert_eq!(row.balance_before, start.bucket(row.bucket));
                if row.bucket == Bucket::Cash {
                    prop_assert_eq!(row.bills_delta + row.coins_delta, sign * row.amount);
                }
            }
        }
    }

    /// Property 3.1: Applying any sequence of requests, rejected ones leave
    /// the balance unchanged and no sub-bucket ever ends below the floor.
    #[test]
    fn prop_floor_holds_over_sequences(
        requests in prop::collection::vec(
            (direction(), positive_amount(), delivery_method()),
            1..30,
        ),
    ) {
        let policy = WithdrawalPolicy::default();
        let mut current = BalanceSnapshot::zero();

        for (direction, amount, method) in requests {
            let input = make_input(direction, amount, method, None);
            match LedgerService::plan_movement(&input, &current, None, &policy) {
                Ok(plan) => current = plan.general.after,
                Err(LedgerError::InsufficientBucketFunds { .. }
                    | LedgerError::InsufficientBalance { .. }) => {
                    prop_assert_eq!(direction, Direction::Expense);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
            prop_assert!(current.cash_bills >= -TOLERANCE);
            prop_assert!(current.cash_coins >= -TOLERANCE);
            prop_assert!(current.bank >= -TOLERANCE);
        }
    }

    /// Property 4.1: A top-up moves exactly the drawn split into the
    /// service credit.
    #[test]
    fn prop_service_top_up_mirrors_general(
        start in balance(),
        amount in positive_amount(),
        method in delivery_method(),
    ) {
        let mut input = make_input(Direction::Expense, amount, method, None);
        input.service = Some(ExternalService::Servientrega);
        let policy = WithdrawalPolicy::default();

        if let Ok(plan) = LedgerService::plan_movement(
            &input,
            &start,
            Some(&BalanceSnapshot::zero()),
            &policy,
        ) {
            let service = plan.service.unwrap();
            let taken = start.parts().total() - plan.general.after.parts().total();
            prop_assert_eq!(taken, amount);
            prop_assert_eq!(service.after.cash_bills, start.cash_bills - plan.general.after.cash_bills);
            prop_assert_eq!(service.after.cash_coins, start.cash_coins - plan.general.after.cash_coins);
            prop_assert_eq!(service.after.bank, start.bank - plan.general.after.bank);
        }
    }
}
