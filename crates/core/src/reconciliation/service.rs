//! Reconciliation decisions.
//!
//! Compares a stored balance with the theoretical one rebuilt from the ledger
//! and, when they drift apart, plans the ADJUSTMENT rows that bring the stored
//! balance back in line.

use cashpoint_shared::types::exceeds_tolerance;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{BalanceScope, BalanceSnapshot, Bucket, Direction, PlannedMovement};

/// What reconciliation will do for one balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationDecision {
    /// Stored balance before reconciliation.
    pub before: BalanceSnapshot,
    /// Stored balance after reconciliation.
    pub after: BalanceSnapshot,
    /// Balance implied by the ledger.
    pub theoretical: BalanceSnapshot,
    /// `theoretical.quantity - before.quantity`.
    pub difference: Decimal,
    /// True when the stored balance is rewritten.
    pub corrected: bool,
    /// ADJUSTMENT rows to append. CASH gets one row when its total changes
    /// and a bills/coins pair when only the split moved; BANK gets one row
    /// when it changes.
    pub adjustments: Vec<PlannedMovement>,
}

/// Stateless service for reconciliation decisions.
pub struct ReconciliationService;

impl ReconciliationService {
    /// Returns true if the stored balance drifted from the ledger by more
    /// than the tolerance, in total or in any sub-bucket.
    #[must_use]
    pub fn has_drift(stored: &BalanceSnapshot, theoretical: &BalanceSnapshot) -> bool {
        exceeds_tolerance(theoretical.quantity - stored.quantity)
            || exceeds_tolerance(theoretical.cash_bills - stored.cash_bills)
            || exceeds_tolerance(theoretical.cash_coins - stored.cash_coins)
            || exceeds_tolerance(theoretical.bank - stored.bank)
    }

    /// Decides whether and how to correct a stored balance.
    ///
    /// Within tolerance nothing changes and `corrected` is false. Otherwise the
    /// stored balance becomes exactly the theoretical one, so running the
    /// decision again on the result reports no drift.
    #[must_use]
    pub fn decide(
        scope: BalanceScope,
        stored: &BalanceSnapshot,
        theoretical: &BalanceSnapshot,
    ) -> ReconciliationDecision {
        let difference = theoretical.quantity - stored.quantity;

        if !Self::has_drift(stored, theoretical) {
            return ReconciliationDecision {
                before: *stored,
                after: *stored,
                theoretical: *theoretical,
                difference,
                corrected: false,
                adjustments: Vec::new(),
            };
        }

        let mut adjustments = Self::cash_adjustments(scope, stored, theoretical);
        let bank_change = theoretical.bank - stored.bank;
        if bank_change != Decimal::ZERO {
            adjustments.push(PlannedMovement {
                scope,
                bucket: Bucket::Bank,
                direction: Direction::Adjustment,
                amount: bank_change.abs(),
                bills_delta: Decimal::ZERO,
                coins_delta: Decimal::ZERO,
                balance_before: stored.bank,
                balance_after: theoretical.bank,
            });
        }

        ReconciliationDecision {
            before: *stored,
            after: *theoretical,
            theoretical: *theoretical,
            difference,
            corrected: true,
            adjustments,
        }
    }

    /// Plans the CASH rows that move `stored` to `theoretical`.
    ///
    /// A split that moved with an unchanged total is written as two legs,
    /// the shrinking sub-bucket first, so every row carries a positive amount
    /// and chains from the previous one.
    fn cash_adjustments(
        scope: BalanceScope,
        stored: &BalanceSnapshot,
        theoretical: &BalanceSnapshot,
    ) -> Vec<PlannedMovement> {
        let bills_delta = theoretical.cash_bills - stored.cash_bills;
        let coins_delta = theoretical.cash_coins - stored.cash_coins;
        let change = bills_delta + coins_delta;
        let leg = |bills_delta: Decimal, coins_delta: Decimal, balance_before: Decimal| {
            let signed = bills_delta + coins_delta;
            PlannedMovement {
                scope,
                bucket: Bucket::Cash,
                direction: Direction::Adjustment,
                amount: signed.abs(),
                bills_delta,
                coins_delta,
                balance_before,
                balance_after: balance_before + signed,
            }
        };

        if change != Decimal::ZERO {
            return vec![leg(bills_delta, coins_delta, stored.cash())];
        }
        if bills_delta == Decimal::ZERO {
            return Vec::new();
        }

        let outgoing = leg(
            bills_delta.min(Decimal::ZERO),
            coins_delta.min(Decimal::ZERO),
            stored.cash(),
        );
        let incoming = leg(
            bills_delta.max(Decimal::ZERO),
            coins_delta.max(Decimal::ZERO),
            outgoing.balance_after,
        );
        vec![outgoing, incoming]
    }
}
