//! `SeaORM` Entity for service_balances table.
//!
//! Credit a point holds with an external service, one row per
//! (point, service, currency).

use cashpoint_core::ledger::BalanceSnapshot;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ExternalService;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub point_id: Uuid,
    pub service: ExternalService,
    pub currency_id: Uuid,
    pub quantity: Decimal,
    pub cash_bills: Decimal,
    pub cash_coins: Decimal,
    pub bank: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Stored figures as a domain snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            quantity: self.quantity,
            cash_bills: self.cash_bills,
            cash_coins: self.cash_coins,
            bank: self.bank,
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
}

impl Related<super::points::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Points.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
