//! Operator-to-point assignments.

use cashpoint_core::ledger::LedgerError;
use cashpoint_shared::types::{ActorId, PointId};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

use super::error::RepoResult;
use crate::entities::point_assignments;

/// Assignment repository.
#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    db: DatabaseConnection,
}

impl AssignmentRepository {
    /// Creates a new assignment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Assigns an operator to a point, ending any previous assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn assign(
        &self,
        actor_id: ActorId,
        point_id: PointId,
    ) -> RepoResult<point_assignments::Model> {
        let txn = self.db.begin().await?;
        let now: DateTime<FixedOffset> = Utc::now().into();

        Self::end_active(&txn, actor_id, None, now).await?;
        let assignment = point_assignments::ActiveModel {
            id: Set(Uuid::now_v7()),
            actor_id: Set(actor_id.into_inner()),
            point_id: Set(point_id.into_inner()),
            started_at: Set(now),
            ended_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(assignment)
    }

    /// Returns the point the operator currently works on.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NoAssignedPoint` if there is no active assignment.
    pub async fn current_point(&self, actor_id: ActorId) -> RepoResult<PointId> {
        point_assignments::Entity::find()
            .filter(point_assignments::Column::ActorId.eq(actor_id.into_inner()))
            .filter(point_assignments::Column::EndedAt.is_null())
            .one(&self.db)
            .await?
            .map(|a| PointId::from_uuid(a.point_id))
            .ok_or_else(|| LedgerError::NoAssignedPoint.into())
    }

    /// Ends the operator's active assignment to `point_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn release<C: ConnectionTrait>(
        conn: &C,
        actor_id: ActorId,
        point_id: PointId,
    ) -> RepoResult<u64> {
        Self::end_active(conn, actor_id, Some(point_id), Utc::now().into()).await
    }

    async fn end_active<C: ConnectionTrait>(
        conn: &C,
        actor_id: ActorId,
        point_id: Option<PointId>,
        at: DateTime<FixedOffset>,
    ) -> RepoResult<u64> {
        let mut update = point_assignments::Entity::update_many()
            .col_expr(point_assignments::Column::EndedAt, Expr::value(at))
            .filter(point_assignments::Column::ActorId.eq(actor_id.into_inner()))
            .filter(point_assignments::Column::EndedAt.is_null());
        if let Some(point_id) = point_id {
            update = update.filter(point_assignments::Column::PointId.eq(point_id.into_inner()));
        }
        Ok(update.exec(conn).await?.rows_affected)
    }
}
