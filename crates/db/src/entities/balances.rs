//! `SeaORM` Entity for balances table.

use cashpoint_core::ledger::BalanceSnapshot;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub point_id: Uuid,
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
