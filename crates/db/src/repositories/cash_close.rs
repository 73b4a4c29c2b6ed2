//! Cash-close (cuadre) repository.
//!
//! Persists the daily session of a point and its per-currency detail rows.
//! Transitions are decided by `CashCloseService`; this module gathers the
//! figures it needs and writes the outcome in one unit of work.

use std::collections::HashMap;

use cashpoint_core::cash_close::{
    CashCloseDetailDraft, CashCloseService, CashCloseStatus, CurrencyPosition, PeriodActivity,
    PhysicalCount, SessionState,
};
use cashpoint_core::ledger::{BalanceScope, LedgerError};
use cashpoint_shared::types::{ActorId, CurrencyId, PointId};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::assignment::AssignmentRepository;
use super::catalog::CatalogRepository;
use super::error::{RepoResult, RepositoryError};
use super::movement::MovementLedger;
use super::reconciliation::ReconciliationRepository;
use crate::entities::{cash_close_details, cash_closes, sea_orm_active_enums};
use crate::unit_of_work::{LockSettings, UnitOfWork};

/// A session with its detail rows.
#[derive(Debug, Clone, Serialize)]
pub struct CashCloseView {
    /// Session header.
    pub session: cash_closes::Model,
    /// One row per active currency.
    pub details: Vec<CashCloseDetailDraft>,
}

impl From<&cash_close_details::Model> for CashCloseDetailDraft {
    fn from(model: &cash_close_details::Model) -> Self {
        Self {
            currency_id: CurrencyId::from_uuid(model.currency_id),
            opening_balance: model.opening_balance,
            theoretical_closing_balance: model.theoretical_closing_balance,
            physical_count: model.physical_count,
            cash_bills: model.cash_bills,
            cash_coins: model.cash_coins,
            difference: model.difference,
            period: PeriodActivity {
                income: model.period_income,
                expense: model.period_expense,
                movement_count: model.period_movement_count,
            },
        }
    }
}

/// Cash-close repository.
#[derive(Debug, Clone)]
pub struct CashCloseRepository {
    db: DatabaseConnection,
    settings: LockSettings,
}

impl CashCloseRepository {
    /// Creates a new cash-close repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LockSettings) -> Self {
        Self { db, settings }
    }

    /// Business day of "now", in the server's local time zone.
    #[must_use]
    pub fn business_date() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Opens the session for `business_date` explicitly.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::DuplicateOpenClose` if the point has an OPEN or
    /// PARTIAL session, `LedgerError::CashCloseAlreadyClosed` if the day is
    /// already closed, or a catalog/database error.
    pub async fn open(
        &self,
        point_id: PointId,
        actor_id: ActorId,
        business_date: NaiveDate,
    ) -> RepoResult<cash_closes::Model> {
        let uow = UnitOfWork::begin(&self.db, self.settings).await?;
        let txn = uow.transaction();

        CatalogRepository::ensure_point_active(txn, point_id).await?;
        let active = Self::find_active(txn, point_id).await?;
        let same_day = Self::find_by_date(txn, point_id, business_date).await?;
        CashCloseService::open(
            point_id,
            business_date,
            active.as_ref().map(state_of),
            same_day.as_ref().map(state_of),
        )?;

        let session = Self::new_session(point_id, actor_id, business_date)
            .insert(txn)
            .await
            .map_err(|err| {
                let err = RepositoryError::from(err);
                if err.is_unique_violation() {
                    LedgerError::DuplicateOpenClose {
                        point_id: point_id.into_inner(),
                        business_date,
                    }
                    .into()
                } else {
                    err
                }
            })?;
        uow.commit().await?;

        info!(point_id = %point_id, %business_date, cash_close_id = %session.id, "Opened cash-close session");
        Ok(session)
    }

    /// Opens the day's session from inside a movement's unit of work when the
    /// point has none, so the first movement of a day starts the cuadre.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn open_for_movement(
        txn: &DatabaseTransaction,
        point_id: PointId,
        actor_id: ActorId,
        business_date: NaiveDate,
    ) -> RepoResult<()> {
        let active = Self::find_active(txn, point_id).await?;
        let same_day = Self::find_by_date(txn, point_id, business_date).await?;
        if !CashCloseService::should_auto_open(
            active.as_ref().map(state_of),
            same_day.as_ref().map(state_of),
        ) {
            return Ok(());
        }

        // A concurrent first movement may open it first; either wins.
        let inserted = cash_closes::Entity::insert(Self::new_session(point_id, actor_id, business_date))
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(txn)
            .await?;
        if inserted > 0 {
            info!(point_id = %point_id, %business_date, "Opened cash-close session on first movement");
        }
        Ok(())
    }

    /// Returns a session with its details.
    ///
    /// Without a date, the point's OPEN/PARTIAL session (or today's) is used.
    /// Details of an active session are computed live against the ledger,
    /// carrying the counts of the last snapshot; a closed session returns
    /// its stored details.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NoOpenSession` if there is no such session,
    /// `LedgerError::ReconciliationComputeFailure` if a ledger cannot be
    /// replayed, or a database error.
    pub async fn current(
        &self,
        point_id: PointId,
        business_date: Option<NaiveDate>,
    ) -> RepoResult<CashCloseView> {
        let date = business_date.unwrap_or_else(Self::business_date);
        let session = match business_date {
            Some(date) => Self::find_by_date(&self.db, point_id, date).await?,
            None => match Self::find_active(&self.db, point_id).await? {
                Some(active) => Some(active),
                None => Self::find_by_date(&self.db, point_id, date).await?,
            },
        }
        .ok_or(LedgerError::NoOpenSession {
            point_id: point_id.into_inner(),
            business_date: date,
        })?;

        let stored = Self::stored_details(&self.db, session.id).await?;
        if session.status == sea_orm_active_enums::CashCloseStatus::Closed {
            return Ok(CashCloseView {
                session,
                details: stored.iter().map(CashCloseDetailDraft::from).collect(),
            });
        }

        let positions = Self::positions(&self.db, point_id, &session).await?;
        let counts = carried_counts(&stored, &positions);
        let details = CashCloseService::compute_details(&positions, &counts, false)?;

        Ok(CashCloseView { session, details })
    }

    /// Takes an intermediate snapshot of the active session. Counts are
    /// optional per currency.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NoOpenSession`, `LedgerError::CashCloseAlreadyClosed`,
    /// count validation errors, or a database error.
    pub async fn partial(
        &self,
        point_id: PointId,
        actor_id: ActorId,
        counts: &[PhysicalCount],
    ) -> RepoResult<CashCloseView> {
        self.snapshot(point_id, actor_id, counts, None, false).await
    }

    /// Closes the active session. Every active currency needs a count. The
    /// closing operator's assignment to the point ends.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NoOpenSession`, `LedgerError::CashCloseAlreadyClosed`,
    /// `LedgerError::MissingPhysicalCount`, count validation errors, or a
    /// database error.
    pub async fn close(
        &self,
        point_id: PointId,
        actor_id: ActorId,
        counts: &[PhysicalCount],
        notes: Option<String>,
    ) -> RepoResult<CashCloseView> {
        self.snapshot(point_id, actor_id, counts, notes, true).await
    }

    async fn snapshot(
        &self,
        point_id: PointId,
        actor_id: ActorId,
        counts: &[PhysicalCount],
        notes: Option<String>,
        closing: bool,
    ) -> RepoResult<CashCloseView> {
        let uow = UnitOfWork::begin(&self.db, self.settings).await?;
        let txn = uow.transaction();
        let today = Self::business_date();

        let session = match cash_closes::Entity::find()
            .filter(cash_closes::Column::PointId.eq(point_id.into_inner()))
            .filter(cash_closes::Column::Status.ne(sea_orm_active_enums::CashCloseStatus::Closed))
            .lock_exclusive()
            .one(txn)
            .await?
        {
            Some(active) => Some(active),
            None => Self::find_by_date(txn, point_id, today).await?,
        };
        let business_date = session.as_ref().map_or(today, |s| s.business_date);
        let state = session.as_ref().map(state_of);
        let status = if closing {
            CashCloseService::close(point_id, business_date, state)?
        } else {
            CashCloseService::partial(point_id, business_date, state)?
        };
        let session = session.ok_or(LedgerError::NoOpenSession {
            point_id: point_id.into_inner(),
            business_date,
        })?;

        let positions = Self::positions(txn, point_id, &session).await?;
        // A partial snapshot keeps earlier counts of currencies it leaves out;
        // a close takes only the counts it is given.
        let counts = if closing {
            counts.to_vec()
        } else {
            let stored = Self::stored_details(txn, session.id).await?;
            merge_counts(carried_counts(&stored, &positions), counts)
        };
        let details = CashCloseService::compute_details(&positions, &counts, closing)?;
        let totals = CashCloseService::totals(&details);
        Self::store_details(txn, session.id, &details).await?;

        let now: DateTime<FixedOffset> = Utc::now().into();
        let mut update = cash_closes::ActiveModel {
            id: Set(session.id),
            status: Set(status.into()),
            total_income: Set(totals.income),
            total_expense: Set(totals.expense),
            movement_count: Set(totals.movement_count),
            updated_at: Set(now),
            ..Default::default()
        };
        if notes.is_some() {
            update.notes = Set(notes);
        }
        if closing {
            update.closed_by = Set(Some(actor_id.into_inner()));
            update.closed_at = Set(Some(now));
        }
        let session = update.update(txn).await?;

        let released = if closing {
            AssignmentRepository::release(txn, actor_id, point_id).await?
        } else {
            0
        };
        uow.commit().await?;

        info!(
            point_id = %point_id,
            %business_date,
            cash_close_id = %session.id,
            status = %status,
            currencies = details.len(),
            income = %totals.income,
            expense = %totals.expense,
            released_assignments = released,
            "Recorded cash-close snapshot"
        );
        Ok(CashCloseView { session, details })
    }

    /// Gathers opening balance, theoretical balance and period activity for
    /// every active currency.
    async fn positions<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
        session: &cash_closes::Model,
    ) -> RepoResult<Vec<CurrencyPosition>> {
        let currencies = CatalogRepository::active_currencies_in(conn).await?;
        let (since, until) = period_bounds(session.business_date);
        let activity = MovementLedger::activity_between(conn, point_id, since, until).await?;
        let opening = Self::previous_counts(conn, point_id, session.business_date).await?;

        let mut positions = Vec::with_capacity(currencies.len());
        for currency in currencies {
            let currency_id = CurrencyId::from_uuid(currency.id);
            let theoretical = ReconciliationRepository::theoretical_in(
                conn,
                point_id,
                currency_id,
                BalanceScope::General,
            )
            .await?;
            positions.push(CurrencyPosition {
                currency_id,
                opening_balance: opening.get(&currency.id).copied().unwrap_or(Decimal::ZERO),
                theoretical_closing_balance: theoretical.balance.quantity,
                period: activity.get(&currency_id).copied().unwrap_or_default(),
            });
        }
        Ok(positions)
    }

    /// Physical counts of the most recent closed session before `date`.
    async fn previous_counts<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
        date: NaiveDate,
    ) -> RepoResult<HashMap<Uuid, Decimal>> {
        let previous = cash_closes::Entity::find()
            .filter(cash_closes::Column::PointId.eq(point_id.into_inner()))
            .filter(cash_closes::Column::Status.eq(sea_orm_active_enums::CashCloseStatus::Closed))
            .filter(cash_closes::Column::BusinessDate.lt(date))
            .order_by_desc(cash_closes::Column::BusinessDate)
            .one(conn)
            .await?;
        let Some(previous) = previous else {
            return Ok(HashMap::new());
        };

        Ok(Self::stored_details(conn, previous.id)
            .await?
            .into_iter()
            .map(|d| (d.currency_id, d.physical_count.unwrap_or(Decimal::ZERO)))
            .collect())
    }

    async fn store_details(
        txn: &DatabaseTransaction,
        cash_close_id: Uuid,
        details: &[CashCloseDetailDraft],
    ) -> RepoResult<()> {
        if details.is_empty() {
            return Ok(());
        }
        let now: DateTime<FixedOffset> = Utc::now().into();
        let rows = details.iter().map(|d| cash_close_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            cash_close_id: Set(cash_close_id),
            currency_id: Set(d.currency_id.into_inner()),
            opening_balance: Set(d.opening_balance),
            theoretical_closing_balance: Set(d.theoretical_closing_balance),
            physical_count: Set(d.physical_count),
            cash_bills: Set(d.cash_bills),
            cash_coins: Set(d.cash_coins),
            difference: Set(d.difference),
            period_income: Set(d.period.income),
            period_expense: Set(d.period.expense),
            period_movement_count: Set(d.period.movement_count),
            updated_at: Set(now),
        });

        cash_close_details::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    cash_close_details::Column::CashCloseId,
                    cash_close_details::Column::CurrencyId,
                ])
                .update_columns([
                    cash_close_details::Column::OpeningBalance,
                    cash_close_details::Column::TheoreticalClosingBalance,
                    cash_close_details::Column::PhysicalCount,
                    cash_close_details::Column::CashBills,
                    cash_close_details::Column::CashCoins,
                    cash_close_details::Column::Difference,
                    cash_close_details::Column::PeriodIncome,
                    cash_close_details::Column::PeriodExpense,
                    cash_close_details::Column::PeriodMovementCount,
                    cash_close_details::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;
        Ok(())
    }

    async fn stored_details<C: ConnectionTrait>(
        conn: &C,
        cash_close_id: Uuid,
    ) -> RepoResult<Vec<cash_close_details::Model>> {
        Ok(cash_close_details::Entity::find()
            .filter(cash_close_details::Column::CashCloseId.eq(cash_close_id))
            .all(conn)
            .await?)
    }

    async fn find_active<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
    ) -> RepoResult<Option<cash_closes::Model>> {
        Ok(cash_closes::Entity::find()
            .filter(cash_closes::Column::PointId.eq(point_id.into_inner()))
            .filter(cash_closes::Column::Status.ne(sea_orm_active_enums::CashCloseStatus::Closed))
            .one(conn)
            .await?)
    }

    async fn find_by_date<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
        business_date: NaiveDate,
    ) -> RepoResult<Option<cash_closes::Model>> {
        Ok(cash_closes::Entity::find()
            .filter(cash_closes::Column::PointId.eq(point_id.into_inner()))
            .filter(cash_closes::Column::BusinessDate.eq(business_date))
            .one(conn)
            .await?)
    }

    fn new_session(
        point_id: PointId,
        actor_id: ActorId,
        business_date: NaiveDate,
    ) -> cash_closes::ActiveModel {
        let now: DateTime<FixedOffset> = Utc::now().into();
        cash_closes::ActiveModel {
            id: Set(Uuid::now_v7()),
            point_id: Set(point_id.into_inner()),
            business_date: Set(business_date),
            status: Set(sea_orm_active_enums::CashCloseStatus::Open),
            opened_by: Set(actor_id.into_inner()),
            opened_at: Set(now),
            closed_by: Set(None),
            closed_at: Set(None),
            total_income: Set(Decimal::ZERO),
            total_expense: Set(Decimal::ZERO),
            movement_count: Set(0),
            notes: Set(None),
            updated_at: Set(now),
        }
    }
}

fn state_of(session: &cash_closes::Model) -> SessionState {
    SessionState {
        business_date: session.business_date,
        status: CashCloseStatus::from(session.status),
    }
}

/// Counts stored for currencies that are still active.
fn carried_counts(
    stored: &[cash_close_details::Model],
    positions: &[CurrencyPosition],
) -> Vec<PhysicalCount> {
    stored
        .iter()
        .filter(|d| positions.iter().any(|p| p.currency_id.into_inner() == d.currency_id))
        .filter_map(|d| {
            d.physical_count.map(|physical_count| PhysicalCount {
                currency_id: CurrencyId::from_uuid(d.currency_id),
                physical_count,
                cash_bills: d.cash_bills,
                cash_coins: d.cash_coins,
            })
        })
        .collect()
}

/// Replaces carried counts with the incoming count of the same currency.
fn merge_counts(carried: Vec<PhysicalCount>, incoming: &[PhysicalCount]) -> Vec<PhysicalCount> {
    carried
        .into_iter()
        .filter(|c| incoming.iter().all(|i| i.currency_id != c.currency_id))
        .chain(incoming.iter().copied())
        .collect()
}

/// Local midnights starting `date` and the day after it.
fn period_bounds(date: NaiveDate) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
    (period_start(date), period_start(next))
}

/// Local midnight starting `date`.
fn period_start(date: NaiveDate) -> DateTime<FixedOffset> {
    let midnight = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map_or_else(
            || Utc.from_utc_datetime(&midnight).fixed_offset(),
            |start| start.fixed_offset(),
        )
}
