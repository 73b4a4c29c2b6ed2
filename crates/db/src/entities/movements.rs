//! `SeaORM` Entity for movements table.
//!
//! Rows are append-only; a trigger rejects UPDATE and DELETE. `seq` is
//! assigned by the database on insert.

use cashpoint_core::ledger::Bucket;
use cashpoint_core::reconciliation::LedgerRow;
use cashpoint_shared::types::MovementId;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{BalanceBucket, ExternalService, MovementDirection, ReferenceType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub seq: i64,
    pub point_id: Uuid,
    pub currency_id: Uuid,
    pub service: Option<ExternalService>,
    pub direction: MovementDirection,
    pub bucket: BalanceBucket,
    pub amount: Decimal,
    pub bills_delta: Decimal,
    pub coins_delta: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub actor_id: Uuid,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

impl From<&Model> for LedgerRow {
    fn from(model: &Model) -> Self {
        Self {
            id: MovementId::from_uuid(model.id),
            seq: model.seq,
            direction: model.direction.into(),
            bucket: Bucket::from(model.bucket),
            amount: model.amount,
            bills_delta: model.bills_delta,
            coins_delta: model.coins_delta,
            balance_before: model.balance_before,
            balance_after: model.balance_after,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::points::Entity",
        from = "Column::PointId",
        to = "super::points::Column::Id"
    )]
    Points,
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::CurrencyId",
        to = "super::currencies::Column::Id"
    )]
    Currencies,
}

impl Related<super::points::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Points.def()
    }
}

impl Related<super::currencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currencies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
