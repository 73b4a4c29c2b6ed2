//! Shared types, errors, and configuration for Cashpoint.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for points, currencies, movements and cash closes
//! - Money helpers built on `rust_decimal` with the ledger tolerance
//! - Pagination types for list endpoints
//! - Identity claims issued by the external identity provider
//! - Application-wide error types
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, Role};
pub use config::{AppConfig, LedgerConfig, WithdrawalPolicyConfig};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
