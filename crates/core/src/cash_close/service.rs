//! Cash-close service for session state transitions.
//!
//! This module implements the state machine of the daily cuadre
//! (OPEN -> PARTIAL -> CLOSED) and the per-currency detail computation.

use std::collections::HashMap;

use cashpoint_shared::types::{CurrencyId, PointId, TOLERANCE, fits_storage_scale};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::types::{
    CashCloseDetailDraft, CashCloseStatus, CurrencyPosition, PeriodActivity, PhysicalCount,
    SessionState,
};
use crate::ledger::LedgerError;

/// Stateless service for managing cash-close transitions.
///
/// All methods are associated functions that validate a transition and
/// return the resulting status.
pub struct CashCloseService;

impl CashCloseService {
    /// Checks that a new session may be opened for `business_date`.
    ///
    /// # Arguments
    /// * `active` - The point's OPEN or PARTIAL session, of any date
    /// * `same_day` - The point's session for `business_date`, if any
    ///
    /// # Returns
    /// * `Ok(CashCloseStatus::Open)` if no session blocks the open
    /// * `Err(LedgerError::DuplicateOpenClose)` if a session is still active
    /// * `Err(LedgerError::CashCloseAlreadyClosed)` if the day is closed
    pub fn open(
        point_id: PointId,
        business_date: NaiveDate,
        active: Option<SessionState>,
        same_day: Option<SessionState>,
    ) -> Result<CashCloseStatus, LedgerError> {
        if let Some(session) = active {
            return Err(LedgerError::DuplicateOpenClose {
                point_id: point_id.into_inner(),
                business_date: session.business_date,
            });
        }
        if same_day.is_some_and(|s| s.status == CashCloseStatus::Closed) {
            return Err(LedgerError::CashCloseAlreadyClosed {
                point_id: point_id.into_inner(),
                business_date,
            });
        }
        Ok(CashCloseStatus::Open)
    }

    /// Returns true if a movement should open the day's session itself.
    #[must_use]
    pub fn should_auto_open(active: Option<SessionState>, same_day: Option<SessionState>) -> bool {
        active.is_none() && same_day.is_none()
    }

    /// Records an intermediate snapshot.
    ///
    /// # Returns
    /// * `Ok(CashCloseStatus::Partial)` from OPEN or PARTIAL
    /// * `Err(LedgerError::NoOpenSession)` if there is no session
    /// * `Err(LedgerError::CashCloseAlreadyClosed)` if it is closed
    pub fn partial(
        point_id: PointId,
        business_date: NaiveDate,
        session: Option<SessionState>,
    ) -> Result<CashCloseStatus, LedgerError> {
        Self::ensure_active(point_id, business_date, session)?;
        Ok(CashCloseStatus::Partial)
    }

    /// Closes the session for the day.
    ///
    /// # Returns
    /// * `Ok(CashCloseStatus::Closed)` from OPEN or PARTIAL
    /// * `Err(LedgerError::NoOpenSession)` if there is no session
    /// * `Err(LedgerError::CashCloseAlreadyClosed)` if it is closed
    pub fn close(
        point_id: PointId,
        business_date: NaiveDate,
        session: Option<SessionState>,
    ) -> Result<CashCloseStatus, LedgerError> {
        Self::ensure_active(point_id, business_date, session)?;
        Ok(CashCloseStatus::Closed)
    }

    fn ensure_active(
        point_id: PointId,
        business_date: NaiveDate,
        session: Option<SessionState>,
    ) -> Result<(), LedgerError> {
        match session {
            Some(s) if s.status.is_active() => Ok(()),
            Some(s) => Err(LedgerError::CashCloseAlreadyClosed {
                point_id: point_id.into_inner(),
                business_date: s.business_date,
            }),
            None => Err(LedgerError::NoOpenSession {
                point_id: point_id.into_inner(),
                business_date,
            }),
        }
    }

    /// Computes one detail row per active currency.
    ///
    /// `require_counts` is set when closing: every active currency then needs a
    /// count. Snapshots accept missing counts and leave `difference` empty.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if a count is negative, repeated, for a currency
    /// that is not active, has counted cash above its total, or is missing
    /// while `require_counts` is set.
    pub fn compute_details(
        positions: &[CurrencyPosition],
        counts: &[PhysicalCount],
        require_counts: bool,
    ) -> Result<Vec<CashCloseDetailDraft>, LedgerError> {
        let mut by_currency: HashMap<CurrencyId, &PhysicalCount> = HashMap::new();
        for count in counts {
            if !positions.iter().any(|p| p.currency_id == count.currency_id)
                || by_currency.insert(count.currency_id, count).is_some()
            {
                return Err(LedgerError::UnexpectedPhysicalCount(
                    count.currency_id.into_inner(),
                ));
            }
            Self::validate_count(count)?;
        }

        positions
            .iter()
            .map(|position| {
                let count = by_currency.get(&position.currency_id);
                if require_counts && count.is_none() {
                    return Err(LedgerError::MissingPhysicalCount(
                        position.currency_id.into_inner(),
                    ));
                }
                let physical_count = count.map(|c| c.physical_count);
                Ok(CashCloseDetailDraft {
                    currency_id: position.currency_id,
                    opening_balance: position.opening_balance,
                    theoretical_closing_balance: position.theoretical_closing_balance,
                    physical_count,
                    cash_bills: count.map_or(Decimal::ZERO, |c| c.cash_bills),
                    cash_coins: count.map_or(Decimal::ZERO, |c| c.cash_coins),
                    difference: physical_count.map(|p| p - position.theoretical_closing_balance),
                    period: position.period,
                })
            })
            .collect()
    }

    fn validate_count(count: &PhysicalCount) -> Result<(), LedgerError> {
        for amount in [count.physical_count, count.cash_bills, count.cash_coins] {
            if amount < Decimal::ZERO {
                return Err(LedgerError::NegativeAmount);
            }
            if !fits_storage_scale(amount) {
                return Err(LedgerError::ExcessivePrecision(amount));
            }
        }
        let counted = count.cash_bills + count.cash_coins;
        if counted > count.physical_count + TOLERANCE {
            return Err(LedgerError::InconsistentPhysicalCount {
                currency_id: count.currency_id.into_inner(),
                physical_count: count.physical_count,
                counted,
            });
        }
        Ok(())
    }

    /// Session totals across currencies.
    #[must_use]
    pub fn totals(details: &[CashCloseDetailDraft]) -> PeriodActivity {
        details
            .iter()
            .fold(PeriodActivity::default(), |acc, d| acc.merged(&d.period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Direction;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn session(status: CashCloseStatus) -> SessionState {
        SessionState {
            business_date: date(),
            status,
        }
    }

    fn position(currency_id: CurrencyId, theoretical: Decimal) -> CurrencyPosition {
        CurrencyPosition {
            currency_id,
            opening_balance: Decimal::ZERO,
            theoretical_closing_balance: theoretical,
            period: PeriodActivity::default(),
        }
    }

    fn count(currency_id: CurrencyId, physical: Decimal) -> PhysicalCount {
        PhysicalCount {
            currency_id,
            physical_count: physical,
            cash_bills: physical,
            cash_coins: Decimal::ZERO,
        }
    }

    #[test]
    fn test_open_without_sessions() {
        assert_eq!(
            CashCloseService::open(PointId::new(), date(), None, None),
            Ok(CashCloseStatus::Open)
        );
    }

    #[test]
    fn test_open_rejected_while_active() {
        let active = session(CashCloseStatus::Open);
        let err = CashCloseService::open(PointId::new(), date(), Some(active), Some(active))
            .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_OPEN_CLOSE");
    }

    #[test]
    fn test_stale_session_blocks_open() {
        let stale = SessionState {
            business_date: date().pred_opt().unwrap(),
            status: CashCloseStatus::Partial,
        };
        let err = CashCloseService::open(PointId::new(), date(), Some(stale), None).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::DuplicateOpenClose { business_date, .. } if business_date == stale.business_date
        ));
    }

    #[test]
    fn test_open_rejected_after_close() {
        let closed = session(CashCloseStatus::Closed);
        let err = CashCloseService::open(PointId::new(), date(), None, Some(closed)).unwrap_err();
        assert_eq!(err.error_code(), "CASH_CLOSE_ALREADY_CLOSED");
    }

    #[test]
    fn test_auto_open_only_when_nothing_exists() {
        assert!(CashCloseService::should_auto_open(None, None));
        assert!(!CashCloseService::should_auto_open(
            Some(session(CashCloseStatus::Open)),
            None
        ));
        assert!(!CashCloseService::should_auto_open(
            None,
            Some(session(CashCloseStatus::Closed))
        ));
    }

    #[test]
    fn test_partial_allowed_repeatedly() {
        let point = PointId::new();
        let status = CashCloseService::partial(point, date(), Some(session(CashCloseStatus::Open)));
        assert_eq!(status, Ok(CashCloseStatus::Partial));
        let status =
            CashCloseService::partial(point, date(), Some(session(CashCloseStatus::Partial)));
        assert_eq!(status, Ok(CashCloseStatus::Partial));
    }

    #[test]
    fn test_close_requires_session() {
        let err = CashCloseService::close(PointId::new(), date(), None).unwrap_err();
        assert_eq!(err.error_code(), "NO_OPEN_SESSION");

        let err = CashCloseService::close(
            PointId::new(),
            date(),
            Some(session(CashCloseStatus::Closed)),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "CASH_CLOSE_ALREADY_CLOSED");
    }

    #[test]
    fn test_close_with_zero_counts_has_zero_difference() {
        let usd = CurrencyId::new();
        let eur = CurrencyId::new();
        let positions = [position(usd, dec!(0)), position(eur, dec!(0))];
        let counts = [count(usd, dec!(0)), count(eur, dec!(0))];

        let details = CashCloseService::compute_details(&positions, &counts, true).unwrap();
        assert_eq!(details.len(), 2);
        assert!(details.iter().all(|d| d.difference == Some(Decimal::ZERO)));
    }

    #[test]
    fn test_difference_is_physical_minus_theoretical() {
        let usd = CurrencyId::new();
        let details = CashCloseService::compute_details(
            &[position(usd, dec!(120))],
            &[count(usd, dec!(115.50))],
            true,
        )
        .unwrap();
        assert_eq!(details[0].difference, Some(dec!(-4.50)));
    }

    #[test]
    fn test_close_requires_every_currency() {
        let usd = CurrencyId::new();
        let eur = CurrencyId::new();
        let err = CashCloseService::compute_details(
            &[position(usd, dec!(0)), position(eur, dec!(0))],
            &[count(usd, dec!(0))],
            true,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::MissingPhysicalCount(eur.into_inner()));
    }

    #[test]
    fn test_snapshot_accepts_missing_counts() {
        let usd = CurrencyId::new();
        let details =
            CashCloseService::compute_details(&[position(usd, dec!(80))], &[], false).unwrap();
        assert_eq!(details[0].physical_count, None);
        assert_eq!(details[0].difference, None);
    }

    #[test]
    fn test_count_for_unknown_currency_rejected() {
        let usd = CurrencyId::new();
        let other = CurrencyId::new();
        let err = CashCloseService::compute_details(
            &[position(usd, dec!(0))],
            &[count(other, dec!(0))],
            false,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::UnexpectedPhysicalCount(other.into_inner()));
    }

    #[test]
    fn test_duplicate_count_rejected() {
        let usd = CurrencyId::new();
        let err = CashCloseService::compute_details(
            &[position(usd, dec!(0))],
            &[count(usd, dec!(0)), count(usd, dec!(1))],
            false,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_PHYSICAL_COUNT");
    }

    #[test]
    fn test_counted_cash_cannot_exceed_total() {
        let usd = CurrencyId::new();
        let bad = PhysicalCount {
            currency_id: usd,
            physical_count: dec!(10),
            cash_bills: dec!(10),
            cash_coins: dec!(5),
        };
        let err = CashCloseService::compute_details(&[position(usd, dec!(0))], &[bad], true)
            .unwrap_err();
        assert_eq!(err.error_code(), "INCONSISTENT_PHYSICAL_COUNT");
    }

    #[test]
    fn test_period_activity_ignores_adjustments() {
        let mut period = PeriodActivity::default();
        period.record(Direction::Income, dec!(20));
        period.record(Direction::Expense, dec!(5));
        period.record(Direction::Adjustment, dec!(0.50));
        assert_eq!(period.income, dec!(20));
        assert_eq!(period.expense, dec!(5));
        assert_eq!(period.movement_count, 2);
    }
}
