//! Error type shared by the ledger repositories.

use cashpoint_core::ledger::LedgerError;
use sea_orm::{DbErr, SqlErr};

use crate::unit_of_work::is_timeout;

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Error types for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Business rule failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        if is_timeout(&err) {
            Self::Ledger(LedgerError::LockTimeout)
        } else {
            Self::Database(err)
        }
    }
}

impl RepositoryError {
    /// Returns true if the database rejected a write on a unique constraint.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    #[test]
    fn test_lock_timeout_maps_to_ledger_error() {
        let err = RepositoryError::from(DbErr::Query(RuntimeErr::Internal(
            "canceling statement due to lock timeout".to_string(),
        )));
        assert!(matches!(err, RepositoryError::Ledger(LedgerError::LockTimeout)));
    }

    #[test]
    fn test_other_database_errors_stay_database_errors() {
        let err = RepositoryError::from(DbErr::RecordNotFound("balances".to_string()));
        assert!(!err.is_unique_violation());
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
