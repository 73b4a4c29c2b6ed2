//! Balance arithmetic.
//!
//! A balance is a total plus its split into bills, coins and bank. The split
//! always sums to the total; `quantity` is recomputed on every change rather
//! than accumulated separately.

use cashpoint_shared::types::TOLERANCE;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::{Bucket, SubBucketAmounts};

/// Stored state of a balance row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Total held.
    pub quantity: Decimal,
    /// Bills at the till.
    pub cash_bills: Decimal,
    /// Coins at the till.
    pub cash_coins: Decimal,
    /// Bank sub-balance.
    pub bank: Decimal,
}

impl BalanceSnapshot {
    /// Zero balance, the state of a tuple with no movements.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            quantity: Decimal::ZERO,
            cash_bills: Decimal::ZERO,
            cash_coins: Decimal::ZERO,
            bank: Decimal::ZERO,
        }
    }

    /// Builds a snapshot from sub-bucket amounts.
    #[must_use]
    pub fn from_parts(parts: SubBucketAmounts) -> Self {
        Self {
            quantity: parts.total(),
            cash_bills: parts.bills,
            cash_coins: parts.coins,
            bank: parts.bank,
        }
    }

    /// Sub-bucket amounts of this snapshot.
    #[must_use]
    pub const fn parts(&self) -> SubBucketAmounts {
        SubBucketAmounts::new(self.cash_bills, self.cash_coins, self.bank)
    }

    /// CASH bucket total.
    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.cash_bills + self.cash_coins
    }

    /// Total of one bucket.
    #[must_use]
    pub fn bucket(&self, bucket: Bucket) -> Decimal {
        match bucket {
            Bucket::Cash => self.cash(),
            Bucket::Bank => self.bank,
        }
    }

    /// Returns true if the sub-buckets sum to `quantity` within tolerance.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        (self.cash_bills + self.cash_coins + self.bank - self.quantity).abs() <= TOLERANCE
    }

    /// Applies a signed delta without any floor check.
    #[must_use]
    pub fn with_delta(&self, delta: &SubBucketAmounts) -> Self {
        let mut parts = self.parts();
        parts.bills += delta.bills;
        parts.coins += delta.coins;
        parts.bank += delta.bank;
        Self::from_parts(parts)
    }

    /// Applies a signed delta and enforces the zero floor on every bucket
    /// the delta draws from.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InsufficientBalance` naming the first bucket
    /// (CASH, then BANK) that would end below `-TOLERANCE`.
    pub fn apply_delta(&self, delta: &SubBucketAmounts) -> Result<Self, LedgerError> {
        let next = self.with_delta(delta);

        for bucket in [Bucket::Cash, Bucket::Bank] {
            let change = delta.bucket(bucket);
            let after = next.bucket(bucket);
            if change < Decimal::ZERO && after < -TOLERANCE {
                return Err(LedgerError::InsufficientBalance {
                    bucket,
                    available: self.bucket(bucket),
                    shortfall: -after,
                });
            }
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn snapshot(bills: Decimal, coins: Decimal, bank: Decimal) -> BalanceSnapshot {
        BalanceSnapshot::from_parts(SubBucketAmounts::new(bills, coins, bank))
    }

    #[test]
    fn test_zero_is_consistent() {
        let zero = BalanceSnapshot::zero();
        assert!(zero.is_consistent());
        assert_eq!(zero, BalanceSnapshot::default());
    }

    #[test]
    fn test_apply_income_delta() {
        let balance = BalanceSnapshot::zero()
            .apply_delta(&SubBucketAmounts::new(dec!(100), dec!(0), dec!(0)))
            .unwrap();
        assert_eq!(balance.quantity, dec!(100));
        assert_eq!(balance.cash_bills, dec!(100));
        assert_eq!(balance.cash(), dec!(100));
    }

    #[test]
    fn test_expense_below_floor_names_bucket() {
        let balance = snapshot(dec!(100), dec!(0), dec!(0));
        let err = balance
            .apply_delta(&SubBucketAmounts::new(dec!(0), dec!(0), dec!(-40)))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                bucket: Bucket::Bank,
                available: dec!(0),
                shortfall: dec!(40),
            }
        );
    }

    #[test]
    fn test_floor_allows_one_cent() {
        let balance = snapshot(dec!(10), dec!(0), dec!(0));
        let next = balance
            .apply_delta(&SubBucketAmounts::new(dec!(-10.01), dec!(0), dec!(0)))
            .unwrap();
        assert_eq!(next.quantity, dec!(-0.01));
    }

    #[test]
    fn test_income_never_trips_floor() {
        // An overdrawn bucket may still receive money.
        let balance = snapshot(dec!(-5), dec!(0), dec!(0));
        assert!(
            balance
                .apply_delta(&SubBucketAmounts::new(dec!(1), dec!(0), dec!(0)))
                .is_ok()
        );
    }

    #[test]
    fn test_inconsistent_snapshot_detected() {
        let mut balance = snapshot(dec!(60), dec!(0), dec!(0));
        balance.quantity = dec!(60.50);
        assert!(!balance.is_consistent());
    }

    fn change_strategy() -> impl Strategy<Value = Decimal> {
        (-100_000i64..100_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any delta keeps the sub-buckets summing to `quantity`.
        #[test]
        fn prop_with_delta_keeps_sum(
            bills in change_strategy(),
            coins in change_strategy(),
            bank in change_strategy(),
            d_bills in change_strategy(),
            d_coins in change_strategy(),
            d_bank in change_strategy(),
        ) {
            let next = snapshot(bills, coins, bank)
                .with_delta(&SubBucketAmounts::new(d_bills, d_coins, d_bank));
            prop_assert!(next.is_consistent());
            prop_assert_eq!(next.quantity, bills + coins + bank + d_bills + d_coins + d_bank);
        }
    }
}
