//! `SeaORM` Entity for business_references table.
//!
//! Registry of the business operations (exchanges, transfers, service
//! payments) movements may reference.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ReferenceType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "business_references")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub reference_type: ReferenceType,
    #[sea_orm(primary_key, auto_increment = false)]
    pub reference_id: Uuid,
    pub point_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
