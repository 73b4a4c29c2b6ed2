//! Cash-close (cuadre) domain types.

use cashpoint_shared::types::CurrencyId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::Direction;

/// Lifecycle of a daily session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashCloseStatus {
    /// Session open, movements accumulate.
    Open,
    /// At least one intermediate snapshot was taken.
    Partial,
    /// Closed for the day (terminal).
    Closed,
}

impl CashCloseStatus {
    /// Returns true for OPEN and PARTIAL.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::Partial)
    }

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Partial => "PARTIAL",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for CashCloseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status and date of an existing session, as the state machine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Business day of the session.
    pub business_date: NaiveDate,
    /// Current status.
    pub status: CashCloseStatus,
}

/// Physical count reported by the operator for one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalCount {
    /// Counted currency.
    pub currency_id: CurrencyId,
    /// Total counted.
    pub physical_count: Decimal,
    /// Part of the count in bills.
    #[serde(default)]
    pub cash_bills: Decimal,
    /// Part of the count in coins.
    #[serde(default)]
    pub cash_coins: Decimal,
}

/// Income, expense and row count over a session's period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodActivity {
    /// Sum of INCOME rows.
    pub income: Decimal,
    /// Sum of EXPENSE rows.
    pub expense: Decimal,
    /// Number of INCOME and EXPENSE rows.
    pub movement_count: i64,
}

impl PeriodActivity {
    /// Adds one ledger row. ADJUSTMENT rows are repairs, not activity.
    pub fn record(&mut self, direction: Direction, amount: Decimal) {
        match direction {
            Direction::Income => self.income += amount,
            Direction::Expense => self.expense += amount,
            Direction::Adjustment => return,
        }
        self.movement_count += 1;
    }

    /// Combines two periods.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            income: self.income + other.income,
            expense: self.expense + other.expense,
            movement_count: self.movement_count + other.movement_count,
        }
    }
}

/// Figures the repository gathers for one active currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyPosition {
    /// The currency.
    pub currency_id: CurrencyId,
    /// Physical count of the previous closed session, or zero.
    pub opening_balance: Decimal,
    /// Balance the ledger says the point holds now.
    pub theoretical_closing_balance: Decimal,
    /// Activity since the session opened.
    pub period: PeriodActivity,
}

/// Computed detail row for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashCloseDetailDraft {
    /// The currency.
    pub currency_id: CurrencyId,
    /// Physical count of the previous closed session, or zero.
    pub opening_balance: Decimal,
    /// Balance the ledger says the point holds.
    pub theoretical_closing_balance: Decimal,
    /// Counted total, absent on snapshots without a count.
    pub physical_count: Option<Decimal>,
    /// Counted bills.
    pub cash_bills: Decimal,
    /// Counted coins.
    pub cash_coins: Decimal,
    /// `physical_count - theoretical_closing_balance`.
    pub difference: Option<Decimal>,
    /// Activity since the session opened.
    pub period: PeriodActivity,
}
