//! Ledger replay.
//!
//! Rebuilds the theoretical balance of a tuple from its movement rows,
//! starting at zero. The ledger is the source of truth; the stored balance is
//! never consulted here.

use cashpoint_shared::types::{MovementId, approx_eq};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{BalanceSnapshot, Bucket, Direction, LedgerError, SubBucketAmounts};

/// A persisted movement row, as replay sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Row ID.
    pub id: MovementId,
    /// Commit order within the ledger.
    pub seq: i64,
    /// Effect on the bucket.
    pub direction: Direction,
    /// Targeted bucket.
    pub bucket: Bucket,
    /// Absolute amount.
    pub amount: Decimal,
    /// Signed change of bills (CASH rows).
    pub bills_delta: Decimal,
    /// Signed change of coins (CASH rows).
    pub coins_delta: Decimal,
    /// Bucket total before the row.
    pub balance_before: Decimal,
    /// Bucket total after the row.
    pub balance_after: Decimal,
}

impl LedgerRow {
    /// Signed change this row claims for its bucket.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.direction.sign() {
            Some(sign) => sign * self.amount,
            None => self.balance_after - self.balance_before,
        }
    }

    fn check(&self) -> Result<(), LedgerError> {
        let fail = |reason: String| LedgerError::ReconciliationComputeFailure {
            movement_id: Some(self.id.into_inner()),
            reason,
        };

        if self.amount <= Decimal::ZERO {
            return Err(fail(format!("non-positive amount {}", self.amount)));
        }

        let signed = self.signed_amount();
        if self.direction == Direction::Adjustment && !approx_eq(signed.abs(), self.amount) {
            return Err(fail(format!(
                "adjustment of {} moves the balance by {signed}",
                self.amount
            )));
        }
        if !approx_eq(self.balance_after, self.balance_before + signed) {
            return Err(fail(format!(
                "balance_after {} != balance_before {} + ({signed})",
                self.balance_after, self.balance_before
            )));
        }

        match self.bucket {
            Bucket::Cash if !approx_eq(self.bills_delta + self.coins_delta, signed) => Err(fail(
                format!(
                    "bills {} + coins {} does not match {signed}",
                    self.bills_delta, self.coins_delta
                ),
            )),
            Bucket::Bank if self.bills_delta != Decimal::ZERO || self.coins_delta != Decimal::ZERO => {
                Err(fail("BANK row carries a cash breakdown".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Result of replaying a tuple's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheoreticalBalance {
    /// Balance implied by the ledger.
    pub balance: BalanceSnapshot,
    /// Rows that contributed to the balance.
    pub replayed: u64,
    /// ADJUSTMENT rows skipped.
    pub skipped_adjustments: u64,
    /// Highest sequence seen.
    pub last_seq: Option<i64>,
}

/// Replays rows in ascending `seq` order.
///
/// ADJUSTMENT rows repair the stored balance and carry no economic effect, so
/// they are validated but not summed.
///
/// # Errors
///
/// Returns `LedgerError::ReconciliationComputeFailure` if rows are out of
/// order or a row is internally inconsistent. Callers must then treat the
/// theoretical balance as unknown.
pub fn replay<'a, I>(rows: I) -> Result<TheoreticalBalance, LedgerError>
where
    I: IntoIterator<Item = &'a LedgerRow>,
{
    let mut sums = SubBucketAmounts::default();
    let mut replayed = 0u64;
    let mut skipped_adjustments = 0u64;
    let mut last_seq: Option<i64> = None;

    for row in rows {
        if let Some(previous) = last_seq
            && row.seq <= previous
        {
            return Err(LedgerError::ReconciliationComputeFailure {
                movement_id: Some(row.id.into_inner()),
                reason: format!("sequence {} follows {previous}", row.seq),
            });
        }
        last_seq = Some(row.seq);
        row.check()?;

        if row.direction == Direction::Adjustment {
            skipped_adjustments += 1;
            continue;
        }

        match row.bucket {
            Bucket::Cash => {
                sums.bills += row.bills_delta;
                sums.coins += row.coins_delta;
            }
            Bucket::Bank => sums.bank += row.signed_amount(),
        }
        replayed += 1;
    }

    Ok(TheoreticalBalance {
        balance: BalanceSnapshot::from_parts(sums),
        replayed,
        skipped_adjustments,
        last_seq,
    })
}

/// A row whose `balance_before` does not continue its bucket's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// Bucket of the row.
    pub bucket: Bucket,
    /// Offending row.
    pub movement_id: MovementId,
    /// Sequence of the offending row.
    pub seq: i64,
    /// `balance_after` of the previous row in the bucket (zero for the first).
    pub expected_before: Decimal,
    /// `balance_before` recorded on the row.
    pub actual_before: Decimal,
}

/// Checks `row[n].balance_before == row[n-1].balance_after` per bucket.
///
/// Every bucket starts at zero. Rows must be in ascending `seq` order.
#[must_use]
pub fn verify_chain<'a, I>(rows: I) -> Vec<ChainBreak>
where
    I: IntoIterator<Item = &'a LedgerRow>,
{
    let mut cash_tail = Decimal::ZERO;
    let mut bank_tail = Decimal::ZERO;
    let mut breaks = Vec::new();

    for row in rows {
        let tail = match row.bucket {
            Bucket::Cash => &mut cash_tail,
            Bucket::Bank => &mut bank_tail,
        };
        if !approx_eq(row.balance_before, *tail) {
            breaks.push(ChainBreak {
                bucket: row.bucket,
                movement_id: row.id,
                seq: row.seq,
                expected_before: *tail,
                actual_before: row.balance_before,
            });
        }
        *tail = row.balance_after;
    }

    breaks
}
