//! Balance routes: recording movements, availability checks and read models.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use cashpoint_core::catalog::ExternalService;
use cashpoint_core::ledger::{
    CashBreakdown, DeliveryMethod, Direction, RecordMovementInput, ReferenceType,
};
use cashpoint_db::repositories::{BalanceStore, MovementFilter, MovementLedger};
use cashpoint_shared::AppError;
use cashpoint_shared::types::{CurrencyId, PageRequest, PointId, ReferenceId};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Header carrying the client's retry key for `POST /balances/movements`.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Creates the balance routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/balances/movements", post(record_movement))
        .route("/balances/movements", get(list_movements))
        .route("/balances/validate", post(validate_available))
        .route("/balances/{point_id}", get(list_balances))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for recording a movement.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordMovementRequest {
    /// Point whose balance changes.
    pub point_id: Uuid,
    /// Currency of the amount.
    pub currency_id: Uuid,
    /// INCOME or EXPENSE.
    pub direction: Direction,
    /// Positive amount.
    pub amount: Decimal,
    /// CASH, BANK or MIXED.
    pub delivery_method: DeliveryMethod,
    /// Declared split of the cash part.
    #[serde(default)]
    pub breakdown: Option<CashBreakdown>,
    /// External service involved.
    #[serde(default)]
    pub service: Option<ExternalService>,
    /// Kind of the originating operation.
    pub reference_type: ReferenceType,
    /// ID of the originating operation.
    pub reference_id: Uuid,
    /// Free text.
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Request body for an availability check.
#[derive(Debug, Deserialize)]
pub struct ValidateAvailableRequest {
    /// Point to check.
    pub point_id: Uuid,
    /// Currency to check.
    pub currency_id: Uuid,
    /// Amount the caller wants to withdraw.
    pub required_amount: Decimal,
    /// Restricts the check to the buckets this method draws from.
    pub delivery_method: Option<DeliveryMethod>,
}

/// Query parameters for the movement history.
#[derive(Debug, Default, Deserialize)]
pub struct ListMovementsQuery {
    /// Filter by point.
    pub point_id: Option<Uuid>,
    /// Filter by currency.
    pub currency_id: Option<Uuid>,
    /// Only rows of this service balance.
    pub service: Option<ExternalService>,
    /// Only rows of the general balance.
    #[serde(default)]
    pub general_only: bool,
    /// Filter by originating operation kind.
    pub reference_type: Option<ReferenceType>,
    /// Filter by originating operation.
    pub reference_id: Option<Uuid>,
    /// Rows created at or after.
    pub from: Option<DateTime<FixedOffset>>,
    /// Rows created before.
    pub to: Option<DateTime<FixedOffset>>,
}

impl ListMovementsQuery {
    fn into_filter(self) -> Result<MovementFilter, ApiError> {
        let service = match (self.general_only, self.service) {
            (true, Some(_)) => {
                return Err(AppError::Validation(
                    "general_only and service are mutually exclusive".to_string(),
                )
                .into());
            }
            (true, None) => Some(None),
            (false, service) => service.map(Some),
        };

        Ok(MovementFilter {
            point_id: self.point_id.map(PointId::from_uuid),
            currency_id: self.currency_id.map(CurrencyId::from_uuid),
            service,
            reference_type: self.reference_type,
            reference_id: self.reference_id.map(ReferenceId::from_uuid),
            from: self.from,
            to: self.to,
        })
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .map_err(|_| AppError::Validation("Idempotency-Key must be ASCII".to_string()))?
        .trim();
    if key.is_empty() || key.len() > 255 {
        return Err(AppError::Validation(
            "Idempotency-Key must be 1 to 255 characters".to_string(),
        )
        .into());
    }
    Ok(Some(key))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/balances/movements` - Record the balance effect of an operation.
async fn record_movement(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let point_id = PointId::from_uuid(payload.point_id);
    auth.ensure_point_access(point_id)?;
    let key = idempotency_key(&headers)?;

    let input = RecordMovementInput {
        point_id,
        currency_id: CurrencyId::from_uuid(payload.currency_id),
        direction: payload.direction,
        amount: payload.amount,
        delivery_method: payload.delivery_method,
        breakdown: payload.breakdown,
        service: payload.service,
        reference_type: payload.reference_type,
        reference_id: ReferenceId::from_uuid(payload.reference_id),
        actor_id: auth.actor_id(),
        description: payload.description,
    };

    let result = state.orchestrator.record_movement(input, key).await?;
    let status = if result.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(result)))
}

/// POST `/balances/validate` - Check whether a withdrawal would fit.
async fn validate_available(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ValidateAvailableRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let point_id = PointId::from_uuid(payload.point_id);
    auth.ensure_point_access(point_id)?;

    let check = state
        .orchestrator
        .validate_available(
            point_id,
            CurrencyId::from_uuid(payload.currency_id),
            payload.required_amount,
            payload.delivery_method,
        )
        .await?;
    Ok(Json(check))
}

/// GET `/balances/{point_id}` - Every balance of a point.
async fn list_balances(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(point_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let point_id = PointId::from_uuid(point_id);
    auth.ensure_point_access(point_id)?;

    let balances = BalanceStore::list_for_point(&*state.db, point_id).await?;
    Ok(Json(json!({
        "point_id": point_id,
        "balances": balances,
    })))
}

/// GET `/balances/movements` - Paginated movement history, newest first.
///
/// Operators only see their own point.
async fn list_movements(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListMovementsQuery>,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut filter = query.into_filter()?;
    if !auth.role().is_administrative() {
        let own = auth.point_id().ok_or(AppError::Forbidden(
            "operators need an assigned point to read movements".to_string(),
        ))?;
        if let Some(requested) = filter.point_id {
            auth.ensure_point_access(requested)?;
        }
        filter.point_id = Some(own);
    }

    let movements = MovementLedger::list(&*state.db, &filter, &page).await?;
    Ok(Json(movements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, operator_token, admin_token, test_state};
    use axum::{
        body::Body,
        http::{Request, header::AUTHORIZATION},
        middleware::from_fn_with_state,
    };
    use tower::ServiceExt;

    use crate::middleware::auth_middleware;

    fn app(state: AppState) -> Router {
        Router::new()
            .merge(routes())
            .layer(from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    fn movement_body(point_id: Uuid, amount: &str) -> String {
        json!({
            "point_id": point_id,
            "currency_id": Uuid::new_v4(),
            "direction": "INCOME",
            "amount": amount,
            "delivery_method": "CASH",
            "reference_type": "EXCHANGE",
            "reference_id": Uuid::new_v4(),
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_record_movement_requires_token() {
        let state = test_state();

        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/balances/movements")
                    .header("Content-Type", "application/json")
                    .body(Body::from(movement_body(Uuid::new_v4(), "10")))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_operator_cannot_record_on_other_point() {
        let state = test_state();
        let token = operator_token(&state, Some(Uuid::new_v4()));

        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/balances/movements")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(movement_body(Uuid::new_v4(), "10")))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_before_any_write() {
        let state = test_state();
        let token = admin_token(&state);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/balances/movements")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(movement_body(Uuid::new_v4(), "0")))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "ZERO_AMOUNT");
    }

    #[tokio::test]
    async fn test_blank_idempotency_key_rejected() {
        let state = test_state();
        let token = admin_token(&state);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/balances/movements")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .header(IDEMPOTENCY_KEY_HEADER, "  ")
                    .header("Content-Type", "application/json")
                    .body(Body::from(movement_body(Uuid::new_v4(), "10")))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_operator_cannot_read_other_point_balances() {
        let state = test_state();
        let token = operator_token(&state, Some(Uuid::new_v4()));

        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/balances/{}", Uuid::new_v4()))
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_movement_query_scope_filter() {
        let general = ListMovementsQuery {
            general_only: true,
            ..Default::default()
        };
        assert_eq!(general.into_filter().unwrap().service, Some(None));

        let service = ListMovementsQuery {
            service: Some(ExternalService::YaGanaste),
            ..Default::default()
        };
        assert_eq!(
            service.into_filter().unwrap().service,
            Some(Some(ExternalService::YaGanaste))
        );

        let both = ListMovementsQuery {
            general_only: true,
            service: Some(ExternalService::YaGanaste),
            ..Default::default()
        };
        assert!(both.into_filter().is_err());
    }

    #[test]
    fn test_description_length_validated() {
        let request: RecordMovementRequest = serde_json::from_str(&movement_body(Uuid::new_v4(), "1")).unwrap();
        assert!(request.validate().is_ok());

        let long = RecordMovementRequest {
            description: Some("x".repeat(501)),
            ..request
        };
        assert!(long.validate().is_err());
    }
}
