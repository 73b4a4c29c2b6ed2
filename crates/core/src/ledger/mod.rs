//! Balance ledger logic.
//!
//! This module implements the pure half of movement recording:
//! - Domain types for movements, buckets and delivery methods
//! - Bucket allocation and withdrawal consumption
//! - Balance arithmetic with the zero floor
//! - Movement planning for general and service balances
//! - Error types for ledger operations

pub mod allocation;
pub mod balance;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod allocation_props;
#[cfg(test)]
mod service_props;

pub use allocation::{BucketSplit, WithdrawalPolicy, allocate, consume, draw_exact, fit_breakdown};
pub use balance::BalanceSnapshot;
pub use error::LedgerError;
pub use service::LedgerService;
pub use types::{
    BalanceScope, Bucket, CashBreakdown, DeliveryMethod, Direction, LegPlan, MovementPlan,
    MovementResult, PlannedMovement, RecordMovementInput, ReferenceType, SubBucketAmounts,
};
