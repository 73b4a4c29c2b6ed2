//! `SeaORM` Entity for cash_closes table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::CashCloseStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_closes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub point_id: Uuid,
    pub business_date: Date,
    pub status: CashCloseStatus,
    pub opened_by: Uuid,
    pub opened_at: DateTimeWithTimeZone,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub movement_count: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::points::Entity",
        from = "Column::PointId",
        to = "super::points::Column::Id"
    )]
    Points,
    #[sea_orm(has_many = "super::cash_close_details::Entity")]
    CashCloseDetails,
}

impl Related<super::points::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Points.def()
    }
}

impl Related<super::cash_close_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashCloseDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
