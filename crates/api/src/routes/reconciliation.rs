//! Reconciliation routes (ADMIN and SUPER only).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use cashpoint_core::catalog::ExternalService;
use cashpoint_core::ledger::BalanceScope;
use cashpoint_shared::types::{CurrencyId, PointId};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the reconciliation routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reconciliation/report", get(inconsistency_report))
        .route("/reconciliation/{point_id}", post(reconcile_point))
        .route("/reconciliation/{point_id}/{currency_id}", post(reconcile_balance))
        .route("/reconciliation/{point_id}/{currency_id}/chain", get(verify_chain))
}

/// Selects a service balance instead of the general one.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    /// Service whose balance is targeted.
    pub service: Option<ExternalService>,
}

impl ScopeQuery {
    fn scope(&self) -> BalanceScope {
        self.service.map_or(BalanceScope::General, BalanceScope::Service)
    }
}

/// POST `/reconciliation/{point_id}/{currency_id}` - Reconcile one balance.
async fn reconcile_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((point_id, currency_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    let result = state
        .reconciliation
        .reconcile_scope(
            PointId::from_uuid(point_id),
            CurrencyId::from_uuid(currency_id),
            query.scope(),
            auth.actor_id(),
        )
        .await?;
    Ok(Json(result))
}

/// POST `/reconciliation/{point_id}` - Reconcile every balance of a point.
async fn reconcile_point(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(point_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    let point_id = PointId::from_uuid(point_id);
    let results = state
        .reconciliation
        .reconcile_all_for_point(point_id, auth.actor_id())
        .await?;
    let corrected = results.iter().filter(|r| r.corrected).count();
    info!(point_id = %point_id, balances = results.len(), corrected, "Point reconciled");

    Ok(Json(json!({
        "point_id": point_id,
        "results": results,
        "corrected": corrected,
    })))
}

/// GET `/reconciliation/report` - Balances that drifted from their ledger.
async fn inconsistency_report(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    let entries = state.reconciliation.inconsistency_report().await?;
    Ok(Json(json!({
        "count": entries.len(),
        "entries": entries,
    })))
}

/// GET `/reconciliation/{point_id}/{currency_id}/chain` - Check ledger chaining.
async fn verify_chain(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((point_id, currency_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_admin()?;

    let report = state
        .reconciliation
        .verify_chain(
            PointId::from_uuid(point_id),
            CurrencyId::from_uuid(currency_id),
            query.scope(),
        )
        .await?;
    Ok(Json(json!({
        "intact": report.is_intact(),
        "report": report,
    })))
}
