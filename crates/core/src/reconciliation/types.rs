//! Reconciliation result types.

use cashpoint_shared::types::{CurrencyId, MovementId, PointId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::replay::ChainBreak;
use crate::ledger::{BalanceScope, BalanceSnapshot};

/// Outcome of reconciling one balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Point of the balance.
    pub point_id: PointId,
    /// Currency of the balance.
    pub currency_id: CurrencyId,
    /// General or service balance.
    pub scope: BalanceScope,
    /// Stored balance before reconciliation.
    pub before: BalanceSnapshot,
    /// Stored balance after reconciliation.
    pub after: BalanceSnapshot,
    /// Balance implied by the ledger.
    pub theoretical: BalanceSnapshot,
    /// `theoretical - before`, in total.
    pub difference: Decimal,
    /// True when an adjustment was written.
    pub corrected: bool,
    /// ADJUSTMENT rows appended.
    pub adjustment_ids: Vec<MovementId>,
}

/// One balance flagged by the inconsistency report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftEntry {
    /// Point of the balance.
    pub point_id: PointId,
    /// Currency of the balance.
    pub currency_id: CurrencyId,
    /// General or service balance.
    pub scope: BalanceScope,
    /// Stored balance.
    pub stored: BalanceSnapshot,
    /// Balance implied by the ledger, `None` when replay failed.
    pub theoretical: Option<BalanceSnapshot>,
    /// `theoretical - stored`, `None` when replay failed.
    pub difference: Option<Decimal>,
    /// Replay failure, if any.
    pub error: Option<String>,
}

/// Chain verification result for one balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
    /// Point of the balance.
    pub point_id: PointId,
    /// Currency of the balance.
    pub currency_id: CurrencyId,
    /// General or service balance.
    pub scope: BalanceScope,
    /// Rows inspected.
    pub movements_checked: u64,
    /// Rows that do not continue their bucket's chain.
    pub breaks: Vec<ChainBreak>,
}

impl ChainReport {
    /// Returns true if no break was found.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.breaks.is_empty()
    }
}
