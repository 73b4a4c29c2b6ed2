//! Bucket and consumption allocation.
//!
//! `allocate` splits an amount between the CASH and BANK buckets according to
//! the delivery method. `consume` decides which sub-buckets a withdrawal draws
//! from when the caller did not declare the split itself.

use cashpoint_shared::config::WithdrawalPolicyConfig;
use cashpoint_shared::types::{SubBucket, TOLERANCE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::{Bucket, CashBreakdown, DeliveryMethod, SubBucketAmounts};

/// Split of an amount between the two buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSplit {
    /// Part handed over as bills and coins.
    pub cash: Decimal,
    /// Part handed over by bank transfer.
    pub bank: Decimal,
}

/// Splits `total` into cash and bank parts.
///
/// - CASH: everything is cash; a declared breakdown must match the total.
/// - BANK: everything is bank; a declared breakdown must be empty.
/// - MIXED: cash is `min(total, bills + coins)`, the rest is bank.
///
/// # Errors
///
/// Returns `LedgerError::InconsistentBreakdown` when the declaration does not
/// fit the delivery method.
pub fn allocate(
    total: Decimal,
    method: DeliveryMethod,
    declared: Option<&CashBreakdown>,
) -> Result<BucketSplit, LedgerError> {
    let declared_cash = declared.map_or(Decimal::ZERO, CashBreakdown::total);
    let inconsistent = |reason| LedgerError::InconsistentBreakdown {
        total,
        declared: declared_cash,
        reason,
    };

    if let Some(breakdown) = declared
        && (breakdown.bills < Decimal::ZERO || breakdown.coins < Decimal::ZERO)
    {
        return Err(inconsistent("bills and coins cannot be negative"));
    }

    match method {
        DeliveryMethod::Cash => {
            if declared.is_some() && (declared_cash - total).abs() > TOLERANCE {
                return Err(inconsistent("cash breakdown must equal the total"));
            }
            Ok(BucketSplit {
                cash: total,
                bank: Decimal::ZERO,
            })
        }
        DeliveryMethod::Bank => {
            if declared_cash > Decimal::ZERO {
                return Err(inconsistent("bank transfers carry no cash"));
            }
            Ok(BucketSplit {
                cash: Decimal::ZERO,
                bank: total,
            })
        }
        DeliveryMethod::Mixed => {
            if declared_cash > total + TOLERANCE {
                return Err(inconsistent("cash breakdown exceeds the total"));
            }
            let cash = total.min(declared_cash);
            Ok(BucketSplit {
                cash,
                bank: total - cash,
            })
        }
    }
}

/// Fits a declared breakdown onto the cash part chosen by `allocate`.
///
/// Bills are kept as declared (capped at `cash`); coins absorb the at most
/// one-cent gap the allocator tolerates. Without a declaration the cash part
/// is booked as bills.
#[must_use]
pub fn fit_breakdown(cash: Decimal, declared: Option<&CashBreakdown>) -> CashBreakdown {
    match declared {
        Some(breakdown) => {
            let bills = breakdown.bills.min(cash);
            CashBreakdown::new(bills, cash - bills)
        }
        None => CashBreakdown::new(cash, Decimal::ZERO),
    }
}

/// Sub-bucket preference orders for withdrawals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalPolicy {
    cash: Vec<SubBucket>,
    bank: Vec<SubBucket>,
    mixed: Vec<SubBucket>,
    service: Vec<SubBucket>,
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        let config = WithdrawalPolicyConfig::default();
        Self {
            cash: config.cash,
            bank: config.bank,
            mixed: config.mixed,
            service: config.service,
        }
    }
}

impl WithdrawalPolicy {
    /// Validates configured orders.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidWithdrawalPolicy` if an order is empty,
    /// repeats a sub-bucket, or draws outside the buckets its delivery
    /// method can pay from.
    pub fn from_config(config: &WithdrawalPolicyConfig) -> Result<Self, LedgerError> {
        Self::check_order("cash", &config.cash, |sub| sub.is_cash())?;
        Self::check_order("bank", &config.bank, |sub| !sub.is_cash())?;
        Self::check_order("mixed", &config.mixed, |_| true)?;
        Self::check_order("service", &config.service, |_| true)?;

        Ok(Self {
            cash: config.cash.clone(),
            bank: config.bank.clone(),
            mixed: config.mixed.clone(),
            service: config.service.clone(),
        })
    }

    fn check_order(
        name: &str,
        order: &[SubBucket],
        allowed: impl Fn(SubBucket) -> bool,
    ) -> Result<(), LedgerError> {
        if order.is_empty() {
            return Err(LedgerError::InvalidWithdrawalPolicy(format!(
                "{name} order is empty"
            )));
        }
        for (i, sub) in order.iter().enumerate() {
            if !allowed(*sub) {
                return Err(LedgerError::InvalidWithdrawalPolicy(format!(
                    "{name} order cannot draw from {sub}"
                )));
            }
            if order[..i].contains(sub) {
                return Err(LedgerError::InvalidWithdrawalPolicy(format!(
                    "{name} order repeats {sub}"
                )));
            }
        }
        Ok(())
    }

    /// Order for withdrawals paid with the given delivery method.
    #[must_use]
    pub fn order_for(&self, method: DeliveryMethod) -> &[SubBucket] {
        match method {
            DeliveryMethod::Cash => &self.cash,
            DeliveryMethod::Bank => &self.bank,
            DeliveryMethod::Mixed => &self.mixed,
        }
    }

    /// Order for spending a service's pre-funded credit.
    #[must_use]
    pub fn service_order(&self) -> &[SubBucket] {
        &self.service
    }
}

/// Bucket reported when an order cannot be satisfied: the single bucket the
/// order draws from, or the bucket of its last sub-bucket.
fn reporting_bucket(order: &[SubBucket]) -> Bucket {
    order.last().map_or(Bucket::Cash, |sub| Bucket::of(*sub))
}

/// Draws `amount` from the sub-buckets of `available` in `order`.
///
/// Sub-buckets are drawn down to zero in order. A remainder of at most one
/// cent is then taken from the last sub-bucket in the order, which may leave
/// it at `-0.01`, the same floor `BalanceSnapshot::apply_delta` enforces. Even
/// an order whose sub-buckets are all empty covers a one-cent request this
/// way.
///
/// # Errors
///
/// Returns `LedgerError::InsufficientBucketFunds` with the shortfall when the
/// eligible sub-buckets cannot cover `amount`, even if the total balance could.
pub fn consume(
    available: &SubBucketAmounts,
    amount: Decimal,
    order: &[SubBucket],
) -> Result<SubBucketAmounts, LedgerError> {
    let mut drawn = SubBucketAmounts::default();
    let mut remaining = amount;

    for sub in order {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(available.get(*sub).max(Decimal::ZERO));
        drawn.add(*sub, take);
        remaining -= take;
    }

    if remaining > TOLERANCE {
        let eligible: Decimal = order
            .iter()
            .map(|sub| available.get(*sub).max(Decimal::ZERO))
            .sum();
        return Err(LedgerError::InsufficientBucketFunds {
            bucket: reporting_bucket(order),
            requested: amount,
            available: eligible,
            shortfall: remaining,
        });
    }

    if remaining > Decimal::ZERO
        && let Some(last) = order.last()
    {
        drawn.add(*last, remaining);
    }

    Ok(drawn)
}

/// Checks that each sub-bucket can cover an exactly declared draw.
///
/// # Errors
///
/// Returns `LedgerError::InsufficientBucketFunds` for the first bucket
/// (CASH, then BANK) where a requested sub-bucket exceeds what it holds by
/// more than the tolerance.
pub fn draw_exact(
    available: &SubBucketAmounts,
    requested: &SubBucketAmounts,
) -> Result<(), LedgerError> {
    for (bucket, subs) in [
        (Bucket::Cash, &[SubBucket::Bills, SubBucket::Coins][..]),
        (Bucket::Bank, &[SubBucket::Bank][..]),
    ] {
        let shortfall: Decimal = subs
            .iter()
            .map(|sub| (requested.get(*sub) - available.get(*sub)).max(Decimal::ZERO))
            .sum();
        if shortfall > TOLERANCE {
            return Err(LedgerError::InsufficientBucketFunds {
                bucket,
                requested: requested.bucket(bucket),
                available: available.bucket(bucket).max(Decimal::ZERO),
                shortfall,
            });
        }
    }
    Ok(())
}
