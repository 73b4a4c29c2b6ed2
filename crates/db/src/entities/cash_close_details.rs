//! `SeaORM` Entity for cash_close_details table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_close_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cash_close_id: Uuid,
    pub currency_id: Uuid,
    pub opening_balance: Decimal,
    pub theoretical_closing_balance: Decimal,
    pub physical_count: Option<Decimal>,
    pub cash_bills: Decimal,
    pub cash_coins: Decimal,
    pub difference: Option<Decimal>,
    pub period_income: Decimal,
    pub period_expense: Decimal,
    pub period_movement_count: i64,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cash_closes::Entity",
        from = "Column::CashCloseId",
        to = "super::cash_closes::Column::Id",
        on_delete = "Cascade"
    )]
    CashCloses,
}

impl Related<super::cash_closes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashCloses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
