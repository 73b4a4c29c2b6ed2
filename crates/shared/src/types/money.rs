//! Money helpers with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every invariant check in the ledger compares against [`TOLERANCE`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum absolute deviation accepted by every balance invariant (one cent).
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Number of decimal places balances and movements are stored with.
pub const STORAGE_SCALE: u32 = 4;

/// Returns true if `a` and `b` differ by at most [`TOLERANCE`].
#[must_use]
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= TOLERANCE
}

/// Returns true if `amount` is further than [`TOLERANCE`] from zero.
#[must_use]
pub fn exceeds_tolerance(amount: Decimal) -> bool {
    amount.abs() > TOLERANCE
}

/// Returns true if the amount can be stored without losing digits.
#[must_use]
pub fn fits_storage_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= STORAGE_SCALE
}

/// Physical sub-bucket of a balance.
///
/// The CASH bucket is made of bills and coins; the BANK bucket has a single
/// sub-bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubBucket {
    /// Paper money in the till.
    Bills,
    /// Coins in the till.
    Coins,
    /// Money held in the bank account.
    Bank,
}

impl SubBucket {
    /// Returns the string representation of the sub-bucket.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bills => "bills",
            Self::Coins => "coins",
            Self::Bank => "bank",
        }
    }

    /// Returns true for the sub-buckets that make up the CASH bucket.
    #[must_use]
    pub const fn is_cash(self) -> bool {
        matches!(self, Self::Bills | Self::Coins)
    }
}

impl std::fmt::Display for SubBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tolerance_is_one_cent() {
        assert_eq!(TOLERANCE, dec!(0.01));
    }

    #[test]
    fn test_approx_eq_boundaries() {
        assert!(approx_eq(dec!(100.00), dec!(100.01)));
        assert!(approx_eq(dec!(100.01), dec!(100.00)));
        assert!(!approx_eq(dec!(100.00), dec!(100.011)));
        assert!(approx_eq(dec!(-0.01), Decimal::ZERO));
    }

    #[test]
    fn test_exceeds_tolerance() {
        assert!(!exceeds_tolerance(dec!(0.01)));
        assert!(!exceeds_tolerance(dec!(-0.01)));
        assert!(exceeds_tolerance(dec!(0.02)));
        assert!(exceeds_tolerance(dec!(-0.5)));
    }

    #[test]
    fn test_fits_storage_scale() {
        assert!(fits_storage_scale(dec!(10.1234)));
        assert!(fits_storage_scale(dec!(10.12340000)));
        assert!(!fits_storage_scale(dec!(10.12345)));
    }

    #[test]
    fn test_sub_bucket_cash_membership() {
        assert!(SubBucket::Bills.is_cash());
        assert!(SubBucket::Coins.is_cash());
        assert!(!SubBucket::Bank.is_cash());
        assert_eq!(SubBucket::Bank.to_string(), "bank");
    }
}
