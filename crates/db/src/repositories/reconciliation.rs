//! Reconciliation repository.
//!
//! Rebuilds theoretical balances from the movement ledger, repairs stored
//! balances that drifted, and reports drift and broken chains.

use cashpoint_core::ledger::{BalanceScope, BalanceSnapshot, ReferenceType};
use cashpoint_core::reconciliation::{
    ChainReport, DriftEntry, ReconciliationResult, ReconciliationService, TheoreticalBalance,
    replay, verify_chain,
};
use cashpoint_shared::types::{ActorId, CurrencyId, MovementId, PointId, ReferenceId};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::{error, info, warn};

use super::balance::{BalanceKey, BalanceStore};
use super::catalog::CatalogRepository;
use super::error::{RepoResult, RepositoryError};
use super::movement::{MovementContext, MovementLedger};
use crate::unit_of_work::{LockSettings, UnitOfWork};

const ADJUSTMENT_DESCRIPTION: &str = "Reconciliation adjustment";

/// Reconciliation repository.
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    db: DatabaseConnection,
    settings: LockSettings,
}

impl ReconciliationRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LockSettings) -> Self {
        Self { db, settings }
    }

    /// Replays a balance's ledger from zero.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ReconciliationComputeFailure` if a row is
    /// inconsistent, or a database error.
    pub async fn compute_theoretical_balance(
        &self,
        point_id: PointId,
        currency_id: CurrencyId,
        scope: BalanceScope,
    ) -> RepoResult<TheoreticalBalance> {
        Self::theoretical_in(&self.db, point_id, currency_id, scope).await
    }

    /// Replays a balance's ledger on the given connection.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ReconciliationComputeFailure` if a row is
    /// inconsistent, or a database error.
    pub async fn theoretical_in<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
        currency_id: CurrencyId,
        scope: BalanceScope,
    ) -> RepoResult<TheoreticalBalance> {
        let rows = MovementLedger::rows(conn, point_id, currency_id, scope).await?;
        Ok(replay(&rows)?)
    }

    /// Reconciles a point's general balance in one currency.
    ///
    /// # Errors
    ///
    /// See [`Self::reconcile_scope`].
    pub async fn reconcile(
        &self,
        point_id: PointId,
        currency_id: CurrencyId,
        actor_id: ActorId,
    ) -> RepoResult<ReconciliationResult> {
        self.reconcile_scope(point_id, currency_id, BalanceScope::General, actor_id)
            .await
    }

    /// Reconciles one balance.
    ///
    /// The balance row is locked before the ledger is read, so no movement
    /// can commit between the replay and the write. On drift the stored
    /// balance becomes the theoretical one and ADJUSTMENT rows record the
    /// correction. A tuple without a stored row and without ledger rows is
    /// reported as zero and left without a row.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::PointNotFound`, `PointInactive`,
    /// `CurrencyNotFound` or `CurrencyInactive` for catalog failures,
    /// `LedgerError::ReconciliationComputeFailure` if the ledger cannot be
    /// replayed (nothing is written), `LedgerError::LockTimeout`, or a
    /// database error.
    pub async fn reconcile_scope(
        &self,
        point_id: PointId,
        currency_id: CurrencyId,
        scope: BalanceScope,
        actor_id: ActorId,
    ) -> RepoResult<ReconciliationResult> {
        let uow = UnitOfWork::begin(&self.db, self.settings).await?;
        let txn = uow.transaction();

        CatalogRepository::ensure_point_active(txn, point_id).await?;
        CatalogRepository::ensure_currency_active(txn, currency_id).await?;

        // A tuple that never moved reads as zero; its row is only created
        // when the ledger says otherwise.
        if BalanceStore::find(txn, point_id, currency_id, scope)
            .await?
            .is_none()
        {
            let theoretical = Self::theoretical_in(txn, point_id, currency_id, scope).await?;
            let zero = BalanceSnapshot::zero();
            if !ReconciliationService::has_drift(&zero, &theoretical.balance) {
                uow.rollback().await?;
                info!(point_id = %point_id, currency_id = %currency_id, ?scope, "No stored balance to reconcile");
                return Ok(ReconciliationResult {
                    point_id,
                    currency_id,
                    scope,
                    before: zero,
                    after: zero,
                    theoretical: theoretical.balance,
                    difference: theoretical.balance.quantity,
                    corrected: false,
                    adjustment_ids: Vec::new(),
                });
            }
        }

        let locked = BalanceStore::lock(txn, point_id, currency_id, scope).await?;
        let theoretical = Self::theoretical_in(txn, point_id, currency_id, scope).await?;
        let decision = ReconciliationService::decide(scope, &locked.snapshot, &theoretical.balance);

        let mut adjustment_ids = Vec::new();
        if decision.corrected {
            BalanceStore::store(txn, &locked, &decision.after).await?;

            let context = MovementContext {
                point_id,
                currency_id,
                reference_type: ReferenceType::Adjustment,
                reference_id: ReferenceId::new(),
                actor_id,
                description: Some(ADJUSTMENT_DESCRIPTION),
            };
            for planned in &decision.adjustments {
                let row = MovementLedger::append(txn, &context, planned).await?;
                adjustment_ids.push(MovementId::from_uuid(row.id));
            }
        }
        uow.commit().await?;

        if decision.corrected {
            warn!(
                point_id = %point_id,
                currency_id = %currency_id,
                ?scope,
                stored = %decision.before.quantity,
                theoretical = %decision.theoretical.quantity,
                difference = %decision.difference,
                adjustments = adjustment_ids.len(),
                "Corrected balance drift"
            );
        } else {
            info!(point_id = %point_id, currency_id = %currency_id, ?scope, "Balance matches ledger");
        }

        Ok(ReconciliationResult {
            point_id,
            currency_id,
            scope,
            before: decision.before,
            after: decision.after,
            theoretical: decision.theoretical,
            difference: decision.difference,
            corrected: decision.corrected,
            adjustment_ids,
        })
    }

    /// Reconciles every stored balance of a point, general and service, one
    /// unit of work each.
    ///
    /// # Errors
    ///
    /// Stops at the first balance that fails and returns its error; balances
    /// reconciled before it stay committed.
    pub async fn reconcile_all_for_point(
        &self,
        point_id: PointId,
        actor_id: ActorId,
    ) -> RepoResult<Vec<ReconciliationResult>> {
        let keys = BalanceStore::keys(&self.db, Some(point_id)).await?;
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(
                self.reconcile_scope(key.point_id, key.currency_id, key.scope, actor_id)
                    .await?,
            );
        }
        Ok(results)
    }

    /// Lists every balance whose stored figures drifted from the ledger, or
    /// whose ledger cannot be replayed. Writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn inconsistency_report(&self) -> RepoResult<Vec<DriftEntry>> {
        let keys = BalanceStore::keys(&self.db, None).await?;
        let mut entries = Vec::new();

        for BalanceKey {
            point_id,
            currency_id,
            scope,
        } in keys
        {
            let stored = BalanceStore::get(&self.db, point_id, currency_id, scope).await?;
            match Self::theoretical_in(&self.db, point_id, currency_id, scope).await {
                Ok(theoretical) => {
                    if ReconciliationService::has_drift(&stored, &theoretical.balance) {
                        entries.push(DriftEntry {
                            point_id,
                            currency_id,
                            scope,
                            stored,
                            theoretical: Some(theoretical.balance),
                            difference: Some(theoretical.balance.quantity - stored.quantity),
                            error: None,
                        });
                    }
                }
                Err(RepositoryError::Ledger(err)) => {
                    error!(point_id = %point_id, currency_id = %currency_id, error = %err, "Ledger replay failed");
                    entries.push(DriftEntry {
                        point_id,
                        currency_id,
                        scope,
                        stored,
                        theoretical: None,
                        difference: None,
                        error: Some(err.to_string()),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(entries)
    }

    /// Verifies `balance_before` chaining of a balance's ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn verify_chain(
        &self,
        point_id: PointId,
        currency_id: CurrencyId,
        scope: BalanceScope,
    ) -> RepoResult<ChainReport> {
        let rows = MovementLedger::rows(&self.db, point_id, currency_id, scope).await?;
        let breaks = verify_chain(&rows);
        if !breaks.is_empty() {
            warn!(point_id = %point_id, currency_id = %currency_id, ?scope, breaks = breaks.len(), "Ledger chain broken");
        }
        Ok(ChainReport {
            point_id,
            currency_id,
            scope,
            movements_checked: u64::try_from(rows.len()).unwrap_or(u64::MAX),
            breaks,
        })
    }
}
