//! Movement ledger.
//!
//! Append-only store of movement rows. Rows are only ever inserted; the
//! database rejects updates and deletes.

use std::collections::HashMap;

use cashpoint_core::cash_close::PeriodActivity;
use cashpoint_core::catalog::ExternalService;
use cashpoint_core::ledger::{BalanceScope, PlannedMovement, ReferenceType};
use cashpoint_core::reconciliation::LedgerRow;
use cashpoint_shared::types::{ActorId, CurrencyId, PageRequest, PageResponse, PointId, ReferenceId};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::error::RepoResult;
use crate::entities::{movements, sea_orm_active_enums};

/// Attribution shared by every row of one request.
#[derive(Debug, Clone, Copy)]
pub struct MovementContext<'a> {
    /// Point of the rows.
    pub point_id: PointId,
    /// Currency of the rows.
    pub currency_id: CurrencyId,
    /// Kind of the originating operation.
    pub reference_type: ReferenceType,
    /// ID of the originating operation.
    pub reference_id: ReferenceId,
    /// Who caused the rows.
    pub actor_id: ActorId,
    /// Free-text description.
    pub description: Option<&'a str>,
}

/// Filter options for listing movements.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    /// Filter by point.
    pub point_id: Option<PointId>,
    /// Filter by currency.
    pub currency_id: Option<CurrencyId>,
    /// Filter by service. `Some(None)` selects general-balance rows only.
    pub service: Option<Option<ExternalService>>,
    /// Filter by originating operation kind.
    pub reference_type: Option<ReferenceType>,
    /// Filter by originating operation.
    pub reference_id: Option<ReferenceId>,
    /// Rows created at or after.
    pub from: Option<DateTime<FixedOffset>>,
    /// Rows created before.
    pub to: Option<DateTime<FixedOffset>>,
}

/// Movement ledger operations.
pub struct MovementLedger;

impl MovementLedger {
    /// Appends one planned row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn append(
        txn: &DatabaseTransaction,
        context: &MovementContext<'_>,
        planned: &PlannedMovement,
    ) -> RepoResult<movements::Model> {
        let now: DateTime<FixedOffset> = Utc::now().into();

        let row = movements::ActiveModel {
            id: Set(Uuid::now_v7()),
            point_id: Set(context.point_id.into_inner()),
            currency_id: Set(context.currency_id.into_inner()),
            service: Set(planned.scope.service().map(Into::into)),
            direction: Set(planned.direction.into()),
            bucket: Set(planned.bucket.into()),
            amount: Set(planned.amount),
            bills_delta: Set(planned.bills_delta),
            coins_delta: Set(planned.coins_delta),
            balance_before: Set(planned.balance_before),
            balance_after: Set(planned.balance_after),
            reference_type: Set(context.reference_type.into()),
            reference_id: Set(context.reference_id.into_inner()),
            actor_id: Set(context.actor_id.into_inner()),
            description: Set(context.description.map(str::to_string)),
            created_at: Set(now),
            ..Default::default()
        };

        Ok(row.insert(txn).await?)
    }

    /// Reads a balance's rows in ascending `seq` order, as replay needs them.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn rows<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
        currency_id: CurrencyId,
        scope: BalanceScope,
    ) -> RepoResult<Vec<LedgerRow>> {
        let query = movements::Entity::find()
            .filter(movements::Column::PointId.eq(point_id.into_inner()))
            .filter(movements::Column::CurrencyId.eq(currency_id.into_inner()));
        let query = match scope.service() {
            None => query.filter(movements::Column::Service.is_null()),
            Some(service) => query.filter(
                movements::Column::Service.eq(sea_orm_active_enums::ExternalService::from(service)),
            ),
        };

        let models = query
            .order_by_asc(movements::Column::Seq)
            .all(conn)
            .await?;
        Ok(models.iter().map(LedgerRow::from).collect())
    }

    /// Lists rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list<C: ConnectionTrait>(
        conn: &C,
        filter: &MovementFilter,
        page: &PageRequest,
    ) -> RepoResult<PageResponse<movements::Model>> {
        let mut query = movements::Entity::find();

        if let Some(point_id) = filter.point_id {
            query = query.filter(movements::Column::PointId.eq(point_id.into_inner()));
        }
        if let Some(currency_id) = filter.currency_id {
            query = query.filter(movements::Column::CurrencyId.eq(currency_id.into_inner()));
        }
        match filter.service {
            Some(None) => query = query.filter(movements::Column::Service.is_null()),
            Some(Some(service)) => {
                query = query.filter(
                    movements::Column::Service
                        .eq(sea_orm_active_enums::ExternalService::from(service)),
                );
            }
            None => {}
        }
        if let Some(reference_type) = filter.reference_type {
            query = query.filter(
                movements::Column::ReferenceType
                    .eq(sea_orm_active_enums::ReferenceType::from(reference_type)),
            );
        }
        if let Some(reference_id) = filter.reference_id {
            query = query.filter(movements::Column::ReferenceId.eq(reference_id.into_inner()));
        }
        if let Some(from) = filter.from {
            query = query.filter(movements::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(movements::Column::CreatedAt.lt(to));
        }

        let total = query.clone().count(conn).await?;
        let data = query
            .order_by_desc(movements::Column::Seq)
            .offset(page.offset())
            .limit(page.limit())
            .all(conn)
            .await?;

        Ok(PageResponse::new(data, page, total))
    }

    /// Sums income, expense and row count of a point's general-balance rows
    /// created in `[since, until)`, per currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn activity_between<C: ConnectionTrait>(
        conn: &C,
        point_id: PointId,
        since: DateTime<FixedOffset>,
        until: DateTime<FixedOffset>,
    ) -> RepoResult<HashMap<CurrencyId, PeriodActivity>> {
        let models = movements::Entity::find()
            .filter(movements::Column::PointId.eq(point_id.into_inner()))
            .filter(movements::Column::Service.is_null())
            .filter(movements::Column::CreatedAt.gte(since))
            .filter(movements::Column::CreatedAt.lt(until))
            .order_by_asc(movements::Column::Seq)
            .all(conn)
            .await?;

        let mut activity: HashMap<CurrencyId, PeriodActivity> = HashMap::new();
        for model in models {
            activity
                .entry(CurrencyId::from_uuid(model.currency_id))
                .or_default()
                .record(model.direction.into(), model.amount);
        }
        Ok(activity)
    }
}
