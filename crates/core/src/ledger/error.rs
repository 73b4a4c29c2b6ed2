//! Ledger error types for validation and state errors.
//!
//! This module defines every business failure the ledger can raise:
//! input validation, bucket allocation, insufficient funds, catalog lookups,
//! cash-close state violations and replay failures. All of them are detected
//! before commit.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use super::types::Bucket;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Movement amount cannot be zero.
    #[error("Movement amount cannot be zero")]
    ZeroAmount,

    /// Movement amount cannot be negative.
    #[error("Movement amount cannot be negative")]
    NegativeAmount,

    /// Amount has more decimal places than the ledger stores.
    #[error("Amount {0} has more decimal places than the ledger stores")]
    ExcessivePrecision(Decimal),

    /// Only reconciliation writes ADJUSTMENT-direction movements.
    #[error("ADJUSTMENT direction is reserved for reconciliation")]
    AdjustmentNotAllowed,

    /// Declared cash breakdown does not fit the total.
    #[error("Cash breakdown {declared} is inconsistent with total {total}: {reason}")]
    InconsistentBreakdown {
        /// Total amount of the operation.
        total: Decimal,
        /// Declared bills + coins.
        declared: Decimal,
        /// What is wrong with the declaration.
        reason: &'static str,
    },

    /// Withdrawal policy is empty or targets the wrong bucket.
    #[error("Invalid withdrawal policy: {0}")]
    InvalidWithdrawalPolicy(String),

    // ========== Funds Errors ==========
    /// A bucket would end below zero.
    #[error("Insufficient balance in {bucket}: shortfall {shortfall}")]
    InsufficientBalance {
        /// Bucket that would go negative.
        bucket: Bucket,
        /// Amount available before the operation.
        available: Decimal,
        /// How far below zero the bucket would end.
        shortfall: Decimal,
    },

    /// The sub-buckets cannot cover the requested draw.
    #[error(
        "Insufficient funds in {bucket}: requested {requested}, available {available}, shortfall {shortfall}"
    )]
    InsufficientBucketFunds {
        /// Bucket the draw was taken from.
        bucket: Bucket,
        /// Requested amount.
        requested: Decimal,
        /// Amount the eligible sub-buckets hold.
        available: Decimal,
        /// Part of the request that cannot be drawn.
        shortfall: Decimal,
    },

    // ========== Catalog Errors ==========
    /// Point not found.
    #[error("Point not found: {0}")]
    PointNotFound(Uuid),

    /// Point is inactive.
    #[error("Point {0} is inactive")]
    PointInactive(Uuid),

    /// Currency not found.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(Uuid),

    /// Currency is inactive.
    #[error("Currency {0} is inactive")]
    CurrencyInactive(Uuid),

    /// Referenced business operation does not exist.
    #[error("Reference {reference_type} {reference_id} not found")]
    ReferenceNotFound {
        /// Kind of the reference.
        reference_type: &'static str,
        /// ID of the reference.
        reference_id: Uuid,
    },

    /// The actor has no point assigned.
    #[error("No point is assigned to the current actor")]
    NoAssignedPoint,

    // ========== Cash-Close Errors ==========
    /// A session is already open for the point.
    #[error("A cash-close session is already open for point {point_id} (business date {business_date})")]
    DuplicateOpenClose {
        /// The point.
        point_id: Uuid,
        /// Business date of the open session.
        business_date: NaiveDate,
    },

    /// No OPEN or PARTIAL session for the point and day.
    #[error("No open cash-close session for point {point_id} on {business_date}")]
    NoOpenSession {
        /// The point.
        point_id: Uuid,
        /// Requested business date.
        business_date: NaiveDate,
    },

    /// The day's session is already closed.
    #[error("Cash-close session for point {point_id} on {business_date} is already closed")]
    CashCloseAlreadyClosed {
        /// The point.
        point_id: Uuid,
        /// Business date of the session.
        business_date: NaiveDate,
    },

    /// Closing requires a physical count for the currency.
    #[error("Missing physical count for currency {0}")]
    MissingPhysicalCount(Uuid),

    /// A physical count was supplied twice, or for a currency that is not active.
    #[error("Unexpected physical count for currency {0}")]
    UnexpectedPhysicalCount(Uuid),

    /// Counted bills and coins do not fit the physical count.
    #[error("Counted cash {counted} exceeds physical count {physical_count} for currency {currency_id}")]
    InconsistentPhysicalCount {
        /// Currency of the count.
        currency_id: Uuid,
        /// Reported physical count.
        physical_count: Decimal,
        /// Bills + coins.
        counted: Decimal,
    },

    // ========== Reconciliation Errors ==========
    /// Ledger replay failed.
    #[error("Ledger replay failed: {reason}")]
    ReconciliationComputeFailure {
        /// Row that could not be replayed, if known.
        movement_id: Option<Uuid>,
        /// What went wrong.
        reason: String,
    },

    // ========== Infrastructure Errors ==========
    /// A balance lock or statement timed out; nothing was written.
    #[error("Balance is busy, please retry")]
    LockTimeout,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::ExcessivePrecision(_) => "EXCESSIVE_PRECISION",
            Self::AdjustmentNotAllowed => "ADJUSTMENT_NOT_ALLOWED",
            Self::InconsistentBreakdown { .. } => "INCONSISTENT_BREAKDOWN",
            Self::InvalidWithdrawalPolicy(_) => "INVALID_WITHDRAWAL_POLICY",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InsufficientBucketFunds { .. } => "INSUFFICIENT_BUCKET_FUNDS",
            Self::PointNotFound(_) => "POINT_NOT_FOUND",
            Self::PointInactive(_) => "POINT_INACTIVE",
            Self::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            Self::CurrencyInactive(_) => "CURRENCY_INACTIVE",
            Self::ReferenceNotFound { .. } => "REFERENCE_NOT_FOUND",
            Self::NoAssignedPoint => "NO_ASSIGNED_POINT",
            Self::DuplicateOpenClose { .. } => "DUPLICATE_OPEN_CLOSE",
            Self::NoOpenSession { .. } => "NO_OPEN_SESSION",
            Self::CashCloseAlreadyClosed { .. } => "CASH_CLOSE_ALREADY_CLOSED",
            Self::MissingPhysicalCount(_) => "MISSING_PHYSICAL_COUNT",
            Self::UnexpectedPhysicalCount(_) => "UNEXPECTED_PHYSICAL_COUNT",
            Self::InconsistentPhysicalCount { .. } => "INCONSISTENT_PHYSICAL_COUNT",
            Self::ReconciliationComputeFailure { .. } => "RECONCILIATION_COMPUTE_FAILURE",
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::ZeroAmount
            | Self::NegativeAmount
            | Self::ExcessivePrecision(_)
            | Self::AdjustmentNotAllowed
            | Self::InconsistentBreakdown { .. }
            | Self::PointInactive(_)
            | Self::CurrencyInactive(_)
            | Self::NoAssignedPoint
            | Self::MissingPhysicalCount(_)
            | Self::UnexpectedPhysicalCount(_)
            | Self::InconsistentPhysicalCount { .. } => 400,

            // 404 Not Found
            Self::PointNotFound(_) | Self::CurrencyNotFound(_) | Self::ReferenceNotFound { .. } => {
                404
            }

            // 409 Conflict - state errors
            Self::DuplicateOpenClose { .. }
            | Self::NoOpenSession { .. }
            | Self::CashCloseAlreadyClosed { .. }
            | Self::LockTimeout => 409,

            // 422 Unprocessable - insufficient funds
            Self::InsufficientBalance { .. } | Self::InsufficientBucketFunds { .. } => 422,

            // 500 Internal Server Error
            Self::InvalidWithdrawalPolicy(_)
            | Self::ReconciliationComputeFailure { .. }
            | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout)
    }

    /// Offending amounts and identifiers for the response body.
    #[must_use]
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::ExcessivePrecision(amount) => Some(json!({ "amount": amount })),
            Self::InconsistentBreakdown { total, declared, .. } => {
                Some(json!({ "total": total, "declared": declared }))
            }
            Self::InsufficientBalance {
                bucket,
                available,
                shortfall,
            } => Some(json!({
                "bucket": bucket,
                "available": available,
                "shortfall": shortfall,
            })),
            Self::InsufficientBucketFunds {
                bucket,
                requested,
                available,
                shortfall,
            } => Some(json!({
                "bucket": bucket,
                "requested": requested,
                "available": available,
                "shortfall": shortfall,
            })),
            Self::ReferenceNotFound {
                reference_type,
                reference_id,
            } => Some(json!({
                "reference_type": reference_type,
                "reference_id": reference_id,
            })),
            Self::DuplicateOpenClose {
                point_id,
                business_date,
            }
            | Self::NoOpenSession {
                point_id,
                business_date,
            }
            | Self::CashCloseAlreadyClosed {
                point_id,
                business_date,
            } => Some(json!({
                "point_id": point_id,
                "business_date": business_date,
            })),
            Self::MissingPhysicalCount(currency_id) | Self::UnexpectedPhysicalCount(currency_id) => {
                Some(json!({ "currency_id": currency_id }))
            }
            Self::InconsistentPhysicalCount {
                currency_id,
                physical_count,
                counted,
            } => Some(json!({
                "currency_id": currency_id,
                "physical_count": physical_count,
                "counted": counted,
            })),
            Self::ReconciliationComputeFailure { movement_id, .. } => {
                movement_id.map(|id| json!({ "movement_id": id }))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::ZeroAmount.error_code(), "ZERO_AMOUNT");
        assert_eq!(LedgerError::NegativeAmount.error_code(), "NEGATIVE_AMOUNT");
        assert_eq!(
            LedgerError::InconsistentBreakdown {
                total: dec!(100),
                declared: dec!(90),
                reason: "cash breakdown must equal the total",
            }
            .error_code(),
            "INCONSISTENT_BREAKDOWN"
        );
        assert_eq!(LedgerError::NoAssignedPoint.error_code(), "NO_ASSIGNED_POINT");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::ZeroAmount.http_status_code(), 400);
        assert_eq!(LedgerError::PointNotFound(Uuid::nil()).http_status_code(), 404);
        assert_eq!(
            LedgerError::DuplicateOpenClose {
                point_id: Uuid::nil(),
                business_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            }
            .http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::InsufficientBucketFunds {
                bucket: Bucket::Bank,
                requested: dec!(40),
                available: dec!(0),
                shortfall: dec!(40),
            }
            .http_status_code(),
            422
        );
        assert_eq!(LedgerError::Internal("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_details_carry_offending_amounts() {
        let err = LedgerError::InsufficientBalance {
            bucket: Bucket::Cash,
            available: dec!(10),
            shortfall: dec!(5.50),
        };
        let details = err.details().unwrap();
        assert_eq!(details["bucket"], "CASH");
        assert_eq!(details["shortfall"], "5.50");
        assert!(LedgerError::ZeroAmount.details().is_none());
    }

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        assert!(LedgerError::LockTimeout.is_retryable());
        assert!(!LedgerError::ZeroAmount.is_retryable());
    }
}
