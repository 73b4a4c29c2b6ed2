//! Core business logic for Cashpoint.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `catalog` - External services and whether they carry their own balance
//! - `ledger` - Bucket allocation, balance arithmetic and movement planning
//! - `reconciliation` - Ledger replay and drift correction decisions
//! - `cash_close` - Daily cash-close (cuadre) state machine and counts

pub mod cash_close;
pub mod catalog;
pub mod ledger;
pub mod reconciliation;
