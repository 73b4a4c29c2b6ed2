//! Property-based tests for bucket and consumption allocation.
//!
//! - Property 1: Allocation preserves the total
//! - Property 2: Consumption never overdraws a sub-bucket
//! - Property 3: Consumption fails only when the eligible funds fall short

use cashpoint_shared::types::{SubBucket, TOLERANCE};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::allocation::{allocate, consume};
use super::error::LedgerError;
use super::types::{CashBreakdown, DeliveryMethod, SubBucketAmounts};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate non-negative decimal amounts (0.00 to 10,000.00).
fn non_negative_amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn delivery_method() -> impl Strategy<Value = DeliveryMethod> {
    prop_oneof![
        Just(DeliveryMethod::Cash),
        Just(DeliveryMethod::Bank),
        Just(DeliveryMethod::Mixed),
    ]
}

/// Strategy to generate a preference order over all three sub-buckets.
fn full_order() -> impl Strategy<Value = Vec<SubBucket>> {
    Just(vec![SubBucket::Bills, SubBucket::Coins, SubBucket::Bank]).prop_shuffle()
}

fn available() -> impl Strategy<Value = SubBucketAmounts> {
    (non_negative_amount(), non_negative_amount(), non_negative_amount())
        .prop_map(|(bills, coins, bank)| SubBucketAmounts::new(bills, coins, bank))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1.1: Without a declaration, cash + bank equals the total.
    #[test]
    fn prop_undeclared_split_sums_to_total(
        total in positive_amount(),
        method in delivery_method(),
    ) {
        let split = allocate(total, method, None).unwrap();
        prop_assert_eq!(split.cash + split.bank, total);
        prop_assert!(split.cash >= Decimal::ZERO && split.bank >= Decimal::ZERO);
    }

    /// Property 1.2: A MIXED declaration within the total is honoured exactly.
    #[test]
    fn prop_mixed_split_honours_declaration(
        total in positive_amount(),
        bills_share in 0u32..=100,
        coins_share in 0u32..=100,
    ) {
        let bills = total * Decimal::from(bills_share) / Decimal::from(200u32);
        let coins = total * Decimal::from(coins_share) / Decimal::from(200u32);
        let declared = CashBreakdown::new(bills, coins);

        let split = allocate(total, DeliveryMethod::Mixed, Some(&declared)).unwrap();
        prop_assert_eq!(split.cash, bills + coins);
        prop_assert_eq!(split.cash + split.bank, total);
    }

    /// Property 1.3: A CASH declaration off by more than a cent is rejected.
    #[test]
    fn prop_cash_declaration_must_match(
        total in positive_amount(),
        gap in 2i64..10_000i64,
    ) {
        let declared = CashBreakdown::new(total + Decimal::new(gap, 2), Decimal::ZERO);
        let result = allocate(total, DeliveryMethod::Cash, Some(&declared));
        let is_inconsistent = matches!(result, Err(LedgerError::InconsistentBreakdown { .. }));
        prop_assert!(is_inconsistent);
    }

    /// Property 2.1: Drawn amounts never exceed what a sub-bucket holds
    /// (beyond the one-cent tolerance) and always add up to the request.
    #[test]
    fn prop_consume_never_overdraws(
        funds in available(),
        amount in positive_amount(),
        order in full_order(),
    ) {
        if let Ok(drawn) = consume(&funds, amount, &order) {
            prop_assert_eq!(drawn.total(), amount);
            for sub in [SubBucket::Bills, SubBucket::Coins, SubBucket::Bank] {
                prop_assert!(drawn.get(sub) >= Decimal::ZERO);
                prop_assert!(funds.get(sub) - drawn.get(sub) >= -TOLERANCE);
            }
        }
    }

    /// Property 3.1: Consumption succeeds exactly when the eligible
    /// sub-buckets cover the request.
    #[test]
    fn prop_consume_fails_only_on_shortfall(
        funds in available(),
        amount in positive_amount(),
        order in full_order(),
    ) {
        let result = consume(&funds, amount, &order);
        if funds.total() + TOLERANCE >= amount {
            prop_assert!(result.is_ok());
        } else {
            match result {
                Err(LedgerError::InsufficientBucketFunds { shortfall, requested, .. }) => {
                    prop_assert_eq!(requested, amount);
                    prop_assert_eq!(shortfall, amount - funds.total());
                }
                other => prop_assert!(false, "expected shortfall, got {:?}", other),
            }
        }
    }

    /// Property 3.2: Sub-buckets outside the order are never touched.
    #[test]
    fn prop_consume_respects_order_membership(
        funds in available(),
        amount in positive_amount(),
    ) {
        let order = [SubBucket::Bills, SubBucket::Coins];
        if let Ok(drawn) = consume(&funds, amount, &order) {
            prop_assert_eq!(drawn.bank, Decimal::ZERO);
        }
    }
}
