//! Movement orchestrator.
//!
//! Records the balance effect of a business operation atomically: validate,
//! lock the balances, plan, write the balances, append the ledger rows and
//! commit. Any failure rolls the whole unit of work back.

use cashpoint_core::ledger::{
    BalanceScope, BalanceSnapshot, DeliveryMethod, LedgerService, MovementResult,
    RecordMovementInput, WithdrawalPolicy,
};
use cashpoint_shared::types::{CurrencyId, MovementId, PointId};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{debug, info};

use super::balance::BalanceStore;
use super::cash_close::CashCloseRepository;
use super::catalog::CatalogRepository;
use super::error::RepoResult;
use super::idempotency::{IdempotencyStore, KeyClaim};
use super::movement::{MovementContext, MovementLedger};
use super::reference::ReferenceRepository;
use crate::unit_of_work::{LockSettings, UnitOfWork};

/// Answer to "can this point pay `required` right now?".
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityCheck {
    /// Amount asked for.
    pub required: Decimal,
    /// Amount the method can draw from.
    pub available: Decimal,
    /// True if `available` covers `required` within tolerance.
    pub sufficient: bool,
    /// Stored balance the answer is based on.
    pub balance: BalanceSnapshot,
}

/// Movement orchestrator.
#[derive(Debug, Clone)]
pub struct MovementOrchestrator {
    db: DatabaseConnection,
    policy: WithdrawalPolicy,
    settings: LockSettings,
}

impl MovementOrchestrator {
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(db: DatabaseConnection, policy: WithdrawalPolicy, settings: LockSettings) -> Self {
        Self {
            db,
            policy,
            settings,
        }
    }

    /// Records a movement.
    ///
    /// With an idempotency key, a retry of a committed request returns the
    /// rows the first attempt produced and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` variants for validation, catalog, reference,
    /// allocation and balance failures, `LedgerError::LockTimeout` when a
    /// balance stays locked too long, or a database error. Nothing is
    /// written on error.
    pub async fn record_movement(
        &self,
        input: RecordMovementInput,
        idempotency_key: Option<&str>,
    ) -> RepoResult<MovementResult> {
        LedgerService::validate_input(&input)?;

        let uow = UnitOfWork::begin(&self.db, self.settings).await?;
        let txn = uow.transaction();
        let service_scope = input
            .service
            .filter(|s| s.has_assignable_balance())
            .map(BalanceScope::Service);

        if let Some(key) = idempotency_key
            && let KeyClaim::Replay(movement_ids) =
                IdempotencyStore::claim(txn, input.actor_id, key).await?
        {
            let balance =
                BalanceStore::get(txn, input.point_id, input.currency_id, BalanceScope::General)
                    .await?;
            let service_balance = match service_scope {
                Some(scope) => {
                    Some(BalanceStore::get(txn, input.point_id, input.currency_id, scope).await?)
                }
                None => None,
            };
            uow.rollback().await?;

            info!(
                actor_id = %input.actor_id,
                idempotency_key = key,
                movements = movement_ids.len(),
                "Replayed movement for idempotency key"
            );
            return Ok(MovementResult {
                balance,
                service_balance,
                movement_ids,
                replayed: true,
            });
        }

        CatalogRepository::ensure_point_active(txn, input.point_id).await?;
        CatalogRepository::ensure_currency_active(txn, input.currency_id).await?;
        ReferenceRepository::ensure_exists(txn, input.reference_type, input.reference_id).await?;

        // General before service, always, so two movements never wait on
        // each other's rows in opposite order.
        let general =
            BalanceStore::lock(txn, input.point_id, input.currency_id, BalanceScope::General)
                .await?;
        let service = match service_scope {
            Some(scope) => {
                Some(BalanceStore::lock(txn, input.point_id, input.currency_id, scope).await?)
            }
            None => None,
        };

        let plan = LedgerService::plan_movement(
            &input,
            &general.snapshot,
            service.as_ref().map(|locked| &locked.snapshot),
            &self.policy,
        )?;
        debug!(?plan, "Planned movement");

        let context = MovementContext {
            point_id: input.point_id,
            currency_id: input.currency_id,
            reference_type: input.reference_type,
            reference_id: input.reference_id,
            actor_id: input.actor_id,
            description: input.description.as_deref(),
        };
        let mut movement_ids = Vec::new();

        BalanceStore::store(txn, &general, &plan.general.after).await?;
        for planned in &plan.general.movements {
            let row = MovementLedger::append(txn, &context, planned).await?;
            movement_ids.push(MovementId::from_uuid(row.id));
        }
        if let (Some(leg), Some(locked)) = (&plan.service, &service) {
            BalanceStore::store(txn, locked, &leg.after).await?;
            for planned in &leg.movements {
                let row = MovementLedger::append(txn, &context, planned).await?;
                movement_ids.push(MovementId::from_uuid(row.id));
            }
        }

        CashCloseRepository::open_for_movement(
            txn,
            input.point_id,
            input.actor_id,
            CashCloseRepository::business_date(),
        )
        .await?;

        if let Some(key) = idempotency_key {
            IdempotencyStore::complete(txn, input.actor_id, key, &movement_ids).await?;
        }
        uow.commit().await?;

        info!(
            point_id = %input.point_id,
            currency_id = %input.currency_id,
            direction = input.direction.as_str(),
            amount = %input.amount,
            reference_type = input.reference_type.as_str(),
            reference_id = %input.reference_id,
            movements = movement_ids.len(),
            quantity = %plan.general.after.quantity,
            "Recorded movement"
        );

        Ok(MovementResult {
            balance: plan.general.after,
            service_balance: plan.service.map(|leg| leg.after),
            movement_ids,
            replayed: false,
        })
    }

    /// Checks whether the stored balance covers `required` for the given
    /// delivery method. Reads without locking, so the answer is advisory.
    ///
    /// # Errors
    ///
    /// Returns an error if the point or currency is unknown or inactive, or
    /// the query fails.
    pub async fn validate_available(
        &self,
        point_id: PointId,
        currency_id: CurrencyId,
        required: Decimal,
        method: Option<DeliveryMethod>,
    ) -> RepoResult<AvailabilityCheck> {
        CatalogRepository::ensure_point_active(&self.db, point_id).await?;
        CatalogRepository::ensure_currency_active(&self.db, currency_id).await?;

        let balance =
            BalanceStore::get(&self.db, point_id, currency_id, BalanceScope::General).await?;
        Ok(AvailabilityCheck {
            required,
            available: LedgerService::available_for(&balance, method),
            sufficient: LedgerService::has_available(&balance, required, method),
            balance,
        })
    }
}
