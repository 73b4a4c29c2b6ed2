//! Application configuration management.

use serde::Deserialize;

use crate::types::SubBucket;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSecretConfig,
    /// Ledger behaviour (locking, withdrawal policy).
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Secret used to verify identity-provider tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSecretConfig {
    /// Secret key shared with the identity provider.
    pub secret: String,
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// How long a movement waits for a balance row lock before aborting.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Upper bound for any single statement inside a ledger transaction.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
    /// Sub-bucket preference orders for withdrawals.
    #[serde(default)]
    pub withdrawal_policy: WithdrawalPolicyConfig,
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_statement_timeout_ms() -> u64 {
    15_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            statement_timeout_ms: default_statement_timeout_ms(),
            withdrawal_policy: WithdrawalPolicyConfig::default(),
        }
    }
}

/// Order in which sub-buckets are drawn when a withdrawal does not declare
/// its own cash breakdown, one order per delivery method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WithdrawalPolicyConfig {
    /// Order for CASH withdrawals.
    #[serde(default = "default_cash_order")]
    pub cash: Vec<SubBucket>,
    /// Order for BANK withdrawals.
    #[serde(default = "default_bank_order")]
    pub bank: Vec<SubBucket>,
    /// Order for MIXED withdrawals.
    #[serde(default = "default_mixed_order")]
    pub mixed: Vec<SubBucket>,
    /// Order for the service-balance leg of a service consumption.
    #[serde(default = "default_mixed_order")]
    pub service: Vec<SubBucket>,
}

fn default_cash_order() -> Vec<SubBucket> {
    vec![SubBucket::Bills, SubBucket::Coins]
}

fn default_bank_order() -> Vec<SubBucket> {
    vec![SubBucket::Bank]
}

fn default_mixed_order() -> Vec<SubBucket> {
    vec![SubBucket::Bank, SubBucket::Bills, SubBucket::Coins]
}

impl Default for WithdrawalPolicyConfig {
    fn default() -> Self {
        Self {
            cash: default_cash_order(),
            bank: default_bank_order(),
            mixed: default_mixed_order(),
            service: default_mixed_order(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CASHPOINT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
