//! Transaction scope for ledger writes.
//!
//! Every ledger write runs inside one `UnitOfWork`: a database transaction
//! with `lock_timeout` and `statement_timeout` set via `SET LOCAL`, so a
//! request stuck behind a balance row lock fails instead of waiting forever.
//!
//! # Usage
//!
//! ```ignore
//! use cashpoint_db::unit_of_work::{LockSettings, UnitOfWork};
//!
//! let uow = UnitOfWork::begin(&db, LockSettings::default()).await?;
//! let balance = BalanceStore::lock(uow.transaction(), point, currency, scope).await?;
//! // ... plan and write ...
//! uow.commit().await?;
//! ```

use cashpoint_shared::LedgerConfig;
use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

/// Timeouts applied to every unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Maximum wait for a row lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Maximum duration of one statement, in milliseconds.
    pub statement_timeout_ms: u64,
}

impl LockSettings {
    fn statements(self) -> [String; 2] {
        [
            format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms),
            format!(
                "SET LOCAL statement_timeout = '{}ms'",
                self.statement_timeout_ms
            ),
        ]
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for LockSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            lock_timeout_ms: config.lock_timeout_ms,
            statement_timeout_ms: config.statement_timeout_ms,
        }
    }
}

/// A database transaction with ledger timeouts applied.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it
/// back, so an early `?` return leaves no partial effects.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
}

impl UnitOfWork {
    /// Begins a transaction and applies the timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or a setting
    /// cannot be applied.
    pub async fn begin(db: &DatabaseConnection, settings: LockSettings) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        for sql in settings.statements() {
            txn.execute_unprepared(&sql).await?;
        }
        Ok(Self { txn })
    }

    /// Returns the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Returns true if `err` is Postgres aborting a statement on `lock_timeout`
/// or `statement_timeout`.
#[must_use]
pub fn is_timeout(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("lock timeout")
        || message.contains("statement timeout")
        || message.contains("55P03")
        || message.contains("57014")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    #[test]
    fn test_settings_sql_format() {
        let settings = LockSettings {
            lock_timeout_ms: 250,
            statement_timeout_ms: 1_000,
        };
        assert_eq!(
            settings.statements(),
            [
                "SET LOCAL lock_timeout = '250ms'".to_string(),
                "SET LOCAL statement_timeout = '1000ms'".to_string(),
            ]
        );
    }

    #[test]
    fn test_settings_follow_ledger_config() {
        let config = LedgerConfig {
            lock_timeout_ms: 10,
            statement_timeout_ms: 20,
            ..LedgerConfig::default()
        };
        let settings = LockSettings::from(&config);
        assert_eq!(settings.lock_timeout_ms, 10);
        assert_eq!(settings.statement_timeout_ms, 20);
    }

    #[test]
    fn test_is_timeout_matches_postgres_messages() {
        let lock = DbErr::Query(RuntimeErr::Internal(
            "canceling statement due to lock timeout".to_string(),
        ));
        let statement = DbErr::Query(RuntimeErr::Internal(
            "canceling statement due to statement timeout".to_string(),
        ));
        let other = DbErr::Query(RuntimeErr::Internal(
            "duplicate key value violates unique constraint".to_string(),
        ));
        assert!(is_timeout(&lock));
        assert!(is_timeout(&statement));
        assert!(!is_timeout(&other));
    }
}
