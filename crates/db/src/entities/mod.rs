//! `SeaORM` entity definitions.

pub mod balances;
pub mod business_references;
pub mod cash_close_details;
pub mod cash_closes;
pub mod currencies;
pub mod idempotency_keys;
pub mod movements;
pub mod point_assignments;
pub mod points;
pub mod sea_orm_active_enums;
pub mod service_balances;
