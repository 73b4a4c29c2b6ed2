//! Ledger service for movement validation and planning.
//!
//! This module is the pure half of the movement orchestrator: given the
//! balances read under lock, it decides the new balances and the ledger rows
//! to append. Persisting the plan atomically is the caller's job.

use cashpoint_shared::types::{TOLERANCE, fits_storage_scale};
use rust_decimal::Decimal;

use super::allocation::{WithdrawalPolicy, allocate, consume, draw_exact, fit_breakdown};
use super::balance::BalanceSnapshot;
use super::error::LedgerError;
use super::types::{
    BalanceScope, Bucket, DeliveryMethod, Direction, LegPlan, MovementPlan, PlannedMovement,
    RecordMovementInput, SubBucketAmounts,
};

/// Ledger service for movement validation and planning.
///
/// This service contains pure business logic with no database dependencies.
pub struct LedgerService;

impl LedgerService {
    /// Validates a movement request before any balance is read.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the direction is ADJUSTMENT, the amount is not
    /// positive, or an amount has more decimals than the ledger stores.
    pub fn validate_input(input: &RecordMovementInput) -> Result<(), LedgerError> {
        if input.direction == Direction::Adjustment {
            return Err(LedgerError::AdjustmentNotAllowed);
        }
        if input.amount == Decimal::ZERO {
            return Err(LedgerError::ZeroAmount);
        }
        if input.amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount);
        }

        let declared = input
            .breakdown
            .iter()
            .flat_map(|breakdown| [breakdown.bills, breakdown.coins]);
        for amount in std::iter::once(input.amount).chain(declared) {
            if !fits_storage_scale(amount) {
                return Err(LedgerError::ExcessivePrecision(amount));
            }
        }

        Ok(())
    }

    /// Plans the full effect of a movement.
    ///
    /// 1. Validates the request
    /// 2. Splits the amount into sub-bucket deltas (allocator for income and
    ///    declared withdrawals, consumption policy for undeclared ones)
    /// 3. Applies the deltas to the general balance with the zero floor
    /// 4. For services with their own credit, plans the opposite leg on the
    ///    service balance
    ///
    /// # Arguments
    ///
    /// * `input` - The movement request
    /// * `general` - The point's general balance, read under lock
    /// * `service_balance` - The service balance, read under lock, when the
    ///   service carries one (zero if absent)
    /// * `policy` - Withdrawal preference orders
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if validation, allocation or a floor check fails.
    /// Nothing has been written when this returns.
    pub fn plan_movement(
        input: &RecordMovementInput,
        general: &BalanceSnapshot,
        service_balance: Option<&BalanceSnapshot>,
        policy: &WithdrawalPolicy,
    ) -> Result<MovementPlan, LedgerError> {
        Self::validate_input(input)?;

        let general_delta = match input.direction {
            Direction::Income => Self::income_parts(input)?,
            _ => Self::withdrawal_parts(input, general, policy)?.negated(),
        };
        let general_leg = Self::plan_leg(BalanceScope::General, general, &general_delta)?;

        let service_leg = match input.service.filter(|s| s.has_assignable_balance()) {
            Some(service) => {
                let current = service_balance.copied().unwrap_or_default();
                let delta = match input.direction {
                    // The customer consumes the service: its credit is spent.
                    Direction::Income => {
                        consume(&current.parts(), input.amount, policy.service_order())?.negated()
                    }
                    // Top-up: the money leaving the point funds the credit.
                    _ => general_delta.negated(),
                };
                Some(Self::plan_leg(
                    BalanceScope::Service(service),
                    &current,
                    &delta,
                )?)
            }
            None => None,
        };

        Ok(MovementPlan {
            general: general_leg,
            service: service_leg,
        })
    }

    /// Sub-bucket amounts received by an income.
    fn income_parts(input: &RecordMovementInput) -> Result<SubBucketAmounts, LedgerError> {
        let declared = input.breakdown.as_ref();
        let split = allocate(input.amount, input.delivery_method, declared)?;
        let cash = fit_breakdown(split.cash, declared);
        Ok(SubBucketAmounts::new(cash.bills, cash.coins, split.bank))
    }

    /// Sub-bucket amounts drawn by a withdrawal, as positive numbers.
    fn withdrawal_parts(
        input: &RecordMovementInput,
        general: &BalanceSnapshot,
        policy: &WithdrawalPolicy,
    ) -> Result<SubBucketAmounts, LedgerError> {
        let available = general.parts();
        match input.breakdown.as_ref() {
            None => consume(
                &available,
                input.amount,
                policy.order_for(input.delivery_method),
            ),
            Some(declared) => {
                let split = allocate(input.amount, input.delivery_method, Some(declared))?;
                let cash = fit_breakdown(split.cash, Some(declared));
                let requested = SubBucketAmounts::new(cash.bills, cash.coins, split.bank);
                draw_exact(&available, &requested)?;
                Ok(requested)
            }
        }
    }

    /// Applies `delta` to one balance and derives one ledger row per bucket
    /// the delta touches.
    fn plan_leg(
        scope: BalanceScope,
        before: &BalanceSnapshot,
        delta: &SubBucketAmounts,
    ) -> Result<LegPlan, LedgerError> {
        let after = before.apply_delta(delta)?;

        let movements = [Bucket::Cash, Bucket::Bank]
            .into_iter()
            .filter_map(|bucket| {
                let change = delta.bucket(bucket);
                if change == Decimal::ZERO {
                    return None;
                }
                let (bills_delta, coins_delta) = match bucket {
                    Bucket::Cash => (delta.bills, delta.coins),
                    Bucket::Bank => (Decimal::ZERO, Decimal::ZERO),
                };
                Some(PlannedMovement {
                    scope,
                    bucket,
                    direction: if change > Decimal::ZERO {
                        Direction::Income
                    } else {
                        Direction::Expense
                    },
                    amount: change.abs(),
                    bills_delta,
                    coins_delta,
                    balance_before: before.bucket(bucket),
                    balance_after: after.bucket(bucket),
                })
            })
            .collect();

        Ok(LegPlan {
            scope,
            before: *before,
            after,
            movements,
        })
    }

    /// Amount a withdrawal with the given method can draw from.
    ///
    /// CASH draws from bills and coins, BANK from the bank sub-balance, MIXED
    /// (or no method) from the whole balance. Overdrawn sub-buckets count as
    /// zero.
    #[must_use]
    pub fn available_for(balance: &BalanceSnapshot, method: Option<DeliveryMethod>) -> Decimal {
        let positive = |amount: Decimal| amount.max(Decimal::ZERO);
        match method {
            Some(DeliveryMethod::Cash) => positive(balance.cash_bills) + positive(balance.cash_coins),
            Some(DeliveryMethod::Bank) => positive(balance.bank),
            Some(DeliveryMethod::Mixed) | None => {
                positive(balance.cash_bills) + positive(balance.cash_coins) + positive(balance.bank)
            }
        }
    }

    /// Returns true if `required` can be withdrawn with the given method.
    #[must_use]
    pub fn has_available(
        balance: &BalanceSnapshot,
        required: Decimal,
        method: Option<DeliveryMethod>,
    ) -> bool {
        Self::available_for(balance, method) + TOLERANCE >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ExternalService;
    use crate::ledger::types::{CashBreakdown, ReferenceType};
    use cashpoint_shared::types::{ActorId, CurrencyId, PointId, ReferenceId};
    use rust_decimal_macros::dec;

    fn input(
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

    fn plan(
        request: &RecordMovementInput,
        general: &BalanceSnapshot,
    ) -> Result<MovementPlan, LedgerError> {
        LedgerService::plan_movement(request, general, None, &WithdrawalPolicy::default())
    }

    #[test]
    fn test_cash_income_books_bills() {
        let request = input(
            Direction::Income,
            dec!(100),
            DeliveryMethod::Cash,
            Some(CashBreakdown::new(dec!(100), dec!(0))),
        );
        let plan = plan(&request, &BalanceSnapshot::zero()).unwrap();

        assert_eq!(plan.general.after.quantity, dec!(100));
        assert_eq!(plan.general.after.cash_bills, dec!(100));
        assert_eq!(plan.general.movements.len(), 1);
        let row = &plan.general.movements[0];
        assert_eq!(row.bucket, Bucket::Cash);
        assert_eq!(row.direction, Direction::Income);
        assert_eq!(row.balance_before, dec!(0));
        assert_eq!(row.balance_after, dec!(100));
    }

    #[test]
    fn test_bank_withdrawal_needs_bank_funds() {
        let general = BalanceSnapshot::from_parts(SubBucketAmounts::new(dec!(100), dec!(0), dec!(0)));
        let request = input(Direction::Expense, dec!(40), DeliveryMethod::Bank, None);

        let err = plan(&request, &general).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBucketFunds {
                bucket: Bucket::Bank,
                requested: dec!(40),
                available: dec!(0),
                shortfall: dec!(40),
            }
        );
    }

    #[test]
    fn test_bank_withdrawal_after_bank_income() {
        let general = BalanceSnapshot::from_parts(SubBucketAmounts::new(dec!(0), dec!(0), dec!(100)));
        let request = input(Direction::Expense, dec!(40), DeliveryMethod::Bank, None);

        let plan = plan(&request, &general).unwrap();
        assert_eq!(plan.general.after.bank, dec!(60));
        assert_eq!(plan.general.after.quantity, dec!(60));
        assert_eq!(plan.general.movements[0].direction, Direction::Expense);
        assert_eq!(plan.general.movements[0].amount, dec!(40));
    }

    #[test]
    fn test_mixed_income_writes_two_rows() {
        let request = input(
            Direction::Income,
            dec!(50),
            DeliveryMethod::Mixed,
            Some(CashBreakdown::new(dec!(30), dec!(0))),
        );
        let plan = plan(&request, &BalanceSnapshot::zero()).unwrap();

        let rows: Vec<_> = plan.movements().map(|m| (m.bucket, m.amount)).collect();
        assert_eq!(rows, vec![(Bucket::Cash, dec!(30)), (Bucket::Bank, dec!(20))]);
        assert_eq!(plan.general.after.quantity, dec!(50));
    }

    #[test]
    fn test_declared_withdrawal_draws_exact_split() {
        let general = BalanceSnapshot::from_parts(SubBucketAmounts::new(dec!(80), dec!(20), dec!(0)));
        let request = input(
            Direction::Expense,
            dec!(30),
            DeliveryMethod::Cash,
            Some(CashBreakdown::new(dec!(20), dec!(10))),
        );
        let plan = plan(&request, &general).unwrap();

        assert_eq!(plan.general.after.cash_bills, dec!(60));
        assert_eq!(plan.general.after.cash_coins, dec!(10));
        let row = &plan.general.movements[0];
        assert_eq!((row.bills_delta, row.coins_delta), (dec!(-20), dec!(-10)));
    }

    #[test]
    fn test_adjustment_direction_rejected() {
        let request = input(Direction::Adjustment, dec!(1), DeliveryMethod::Cash, None);
        assert_eq!(
            LedgerService::validate_input(&request),
            Err(LedgerError::AdjustmentNotAllowed)
        );
    }

    #[test]
    fn test_amount_validation() {
        let zero = input(Direction::Income, dec!(0), DeliveryMethod::Cash, None);
        assert_eq!(LedgerService::validate_input(&zero), Err(LedgerError::ZeroAmount));

        let negative = input(Direction::Income, dec!(-5), DeliveryMethod::Cash, None);
        assert_eq!(
            LedgerService::validate_input(&negative),
            Err(LedgerError::NegativeAmount)
        );

        let precise = input(Direction::Income, dec!(1.00001), DeliveryMethod::Cash, None);
        assert_eq!(
            LedgerService::validate_input(&precise),
            Err(LedgerError::ExcessivePrecision(dec!(1.00001)))
        );
    }

    #[test]
    fn test_service_income_spends_credit_and_fills_till() {
        let mut request = input(Direction::Income, dec!(25), DeliveryMethod::Cash, None);
        request.service = Some(ExternalService::WesternUnion);
        let credit = BalanceSnapshot::from_parts(SubBucketAmounts::new(dec!(0), dec!(0), dec!(100)));

        let plan = LedgerService::plan_movement(
            &request,
            &BalanceSnapshot::zero(),
            Some(&credit),
            &WithdrawalPolicy::default(),
        )
        .unwrap();

        assert_eq!(plan.general.after.cash_bills, dec!(25));
        let service = plan.service.unwrap();
        assert_eq!(service.scope, BalanceScope::Service(ExternalService::WesternUnion));
        assert_eq!(service.after.bank, dec!(75));
        assert_eq!(service.movements[0].direction, Direction::Expense);
    }

    #[test]
    fn test_service_income_without_credit_fails() {
        let mut request = input(Direction::Income, dec!(25), DeliveryMethod::Cash, None);
        request.service = Some(ExternalService::Servientrega);

        let err = LedgerService::plan_movement(
            &request,
            &BalanceSnapshot::zero(),
            None,
            &WithdrawalPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBucketFunds { .. }));
    }

    #[test]
    fn test_service_top_up_mirrors_drawn_split() {
        let mut request = input(Direction::Expense, dec!(40), DeliveryMethod::Cash, None);
        request.service = Some(ExternalService::YaGanaste);
        let general = BalanceSnapshot::from_parts(SubBucketAmounts::new(dec!(30), dec!(20), dec!(0)));

        let plan = LedgerService::plan_movement(
            &request,
            &general,
            Some(&BalanceSnapshot::zero()),
            &WithdrawalPolicy::default(),
        )
        .unwrap();

        assert_eq!(plan.general.after.cash_bills, dec!(0));
        assert_eq!(plan.general.after.cash_coins, dec!(10));
        let service = plan.service.unwrap();
        assert_eq!(service.after.cash_bills, dec!(30));
        assert_eq!(service.after.cash_coins, dec!(10));
        assert_eq!(service.movements[0].direction, Direction::Income);
    }

    #[test]
    fn test_correspondent_service_uses_general_balance_only() {
        let mut request = input(Direction::Income, dec!(25), DeliveryMethod::Bank, None);
        request.service = Some(ExternalService::Produbanco);

        let plan = plan(&request, &BalanceSnapshot::zero()).unwrap();
        assert!(plan.service.is_none());
        assert_eq!(plan.general.after.bank, dec!(25));
    }

    #[test]
    fn test_available_for_method() {
        let balance = BalanceSnapshot::from_parts(SubBucketAmounts::new(dec!(70), dec!(5), dec!(25)));
        assert_eq!(
            LedgerService::available_for(&balance, Some(DeliveryMethod::Cash)),
            dec!(75)
        );
        assert_eq!(
            LedgerService::available_for(&balance, Some(DeliveryMethod::Bank)),
            dec!(25)
        );
        assert_eq!(LedgerService::available_for(&balance, None), dec!(100));
        assert!(LedgerService::has_available(&balance, dec!(100.01), None));
        assert!(!LedgerService::has_available(
            &balance,
            dec!(26),
            Some(DeliveryMethod::Bank)
        ));
    }
}
