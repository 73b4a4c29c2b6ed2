//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Stores that take part in a movement (`BalanceStore`, `MovementLedger`,
//! `IdempotencyStore`) expose associated functions over the caller's
//! transaction instead of owning a connection.

pub mod assignment;
pub mod balance;
pub mod cash_close;
pub mod catalog;
pub mod error;
pub mod idempotency;
pub mod movement;
pub mod orchestrator;
pub mod reconciliation;
pub mod reference;

pub use assignment::AssignmentRepository;
pub use balance::{BalanceKey, BalanceStore, BalanceView, LockedBalance};
pub use cash_close::{CashCloseRepository, CashCloseView};
pub use catalog::{CatalogRepository, CreateCurrencyInput, CreatePointInput};
pub use error::{RepoResult, RepositoryError};
pub use idempotency::{IdempotencyStore, KeyClaim};
pub use movement::{MovementContext, MovementFilter, MovementLedger};
pub use orchestrator::{AvailabilityCheck, MovementOrchestrator};
pub use reconciliation::ReconciliationRepository;
pub use reference::ReferenceRepository;
