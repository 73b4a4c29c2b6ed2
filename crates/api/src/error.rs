//! Error responses.
//!
//! Every failure leaves the API as `{ "error": code, "message": text,
//! "details": {..} }` with the status code of its kind. Failures the client
//! may retry as-is also carry `Retry-After`.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use cashpoint_core::ledger::LedgerError;
use cashpoint_db::RepositoryError;
use cashpoint_shared::AppError;
use serde_json::{Value, json};
use tracing::{error, warn};

/// Seconds a client should wait before retrying a busy balance.
const RETRY_AFTER_SECS: &str = "1";

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Business failure of the ledger or cash-close workflow.
    Ledger(LedgerError),
    /// Identity, request validation or infrastructure failure.
    App(AppError),
}

impl ApiError {
    /// Returns the HTTP status of the error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::Ledger(err) => err.http_status_code(),
            Self::App(err) => err.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ledger(err) => err.error_code(),
            Self::App(err) => err.error_code(),
        }
    }

    /// Returns true if the same request may succeed when sent again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Ledger(err) if err.is_retryable())
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Ledger(err) => err.details(),
            Self::App(_) => None,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Ledger(err) => err.to_string(),
            // Infrastructure details stay in the logs.
            Self::App(err) if err.is_server_error() => "An internal error occurred".to_string(),
            Self::App(err) => err.to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger(err) => err.fmt(f),
            Self::App(err) => err.fmt(f),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Ledger(err) => Self::Ledger(err),
            RepositoryError::Database(err) => Self::App(AppError::Database(err.to_string())),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::App(AppError::Validation(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            error!(error = %self, code, "Request failed");
        } else {
            warn!(error = %self, code, "Request rejected");
        }

        let mut body = json!({
            "error": code,
            "message": self.message(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        let mut response = (status, Json(body)).into_response();
        if self.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashpoint_core::ledger::Bucket;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use sea_orm::DbErr;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case(LedgerError::ZeroAmount.into(), StatusCode::BAD_REQUEST)]
    #[case(LedgerError::NoAssignedPoint.into(), StatusCode::BAD_REQUEST)]
    #[case(LedgerError::LockTimeout.into(), StatusCode::CONFLICT)]
    #[case(AppError::Forbidden(String::new()).into(), StatusCode::FORBIDDEN)]
    #[case(AppError::Unauthorized(String::new()).into(), StatusCode::UNAUTHORIZED)]
    fn test_status_mapping(#[case] err: ApiError, #[case] status: StatusCode) {
        assert_eq!(err.status(), status);
    }

    #[tokio::test]
    async fn test_insufficient_funds_body_carries_amounts() {
        let err = ApiError::from(LedgerError::InsufficientBucketFunds {
            bucket: Bucket::Bank,
            requested: dec!(50),
            available: dec!(0),
            shortfall: dec!(50),
        });

        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "INSUFFICIENT_BUCKET_FUNDS");
        assert_eq!(body["details"]["bucket"], "BANK");
        assert_eq!(body["details"]["shortfall"], "50");
    }

    #[tokio::test]
    async fn test_lock_timeout_asks_client_to_retry() {
        let response = ApiError::from(LedgerError::LockTimeout).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[tokio::test]
    async fn test_business_rejection_is_not_retryable() {
        let response = ApiError::from(LedgerError::ZeroAmount).into_response();

        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[tokio::test]
    async fn test_database_error_hides_detail() {
        let err = ApiError::from(RepositoryError::Database(DbErr::Custom(
            "connection reset".to_string(),
        )));

        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DATABASE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("connection reset"));
        assert!(body.get("details").is_none());
    }
}
