//! Daily cash-close (cuadre) workflow.
//!
//! A point runs one session per business day: opened explicitly or by the
//! day's first movement, snapshotted any number of times, and closed once
//! with a physical count per active currency.

pub mod service;
pub mod types;

pub use service::CashCloseService;
pub use types::{
    CashCloseDetailDraft, CashCloseStatus, CurrencyPosition, PeriodActivity, PhysicalCount,
    SessionState,
};
