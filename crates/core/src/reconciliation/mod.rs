//! Reconciliation of stored balances against the movement ledger.
//!
//! - Ledger replay and chain verification
//! - Drift detection and adjustment planning
//! - Result and report types

pub mod replay;
pub mod service;
pub mod types;

#[cfg(test)]
mod replay_props;

pub use replay::{ChainBreak, LedgerRow, TheoreticalBalance, replay, verify_chain};
pub use service::{ReconciliationDecision, ReconciliationService};
pub use types::{ChainReport, DriftEntry, ReconciliationResult};
