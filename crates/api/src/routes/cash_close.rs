//! Cash-close (cuadre) routes.
//!
//! The point always comes from the actor: the one in the token, else the
//! active assignment on record.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use cashpoint_core::cash_close::PhysicalCount;
use cashpoint_db::repositories::CashCloseRepository;
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the cuadre routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cuadre", post(open_session))
        .route("/cuadre", get(current_session))
        .route("/cuadre/parcial", post(partial_close))
        .route("/cuadre/cerrar", post(final_close))
}

/// Query parameters for reading a session.
#[derive(Debug, Deserialize)]
pub struct CurrentQuery {
    /// Business day; defaults to the active session or today's.
    pub date: Option<NaiveDate>,
}

/// Request body for a partial snapshot.
#[derive(Debug, Deserialize)]
pub struct PartialCloseRequest {
    /// Counts for any subset of active currencies.
    #[serde(default)]
    pub counts: Vec<PhysicalCount>,
}

/// Request body for the final close.
#[derive(Debug, Deserialize, Validate)]
pub struct FinalCloseRequest {
    /// One count per active currency.
    #[validate(length(min = 1))]
    pub counts: Vec<PhysicalCount>,
    /// Operator notes.
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// POST `/cuadre` - Open today's session.
async fn open_session(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let point_id = auth.working_point(&state).await?;
    let session = state
        .cash_close
        .open(point_id, auth.actor_id(), CashCloseRepository::business_date())
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET `/cuadre` - The session with its per-currency details.
async fn current_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CurrentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let point_id = auth.working_point(&state).await?;
    let view = state.cash_close.current(point_id, query.date).await?;
    Ok(Json(view))
}

/// POST `/cuadre/parcial` - Intermediate snapshot.
async fn partial_close(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<PartialCloseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let point_id = auth.working_point(&state).await?;
    let view = state
        .cash_close
        .partial(point_id, auth.actor_id(), &payload.counts)
        .await?;
    Ok(Json(view))
}

/// POST `/cuadre/cerrar` - Close the day.
async fn final_close(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<FinalCloseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let point_id = auth.working_point(&state).await?;
    let view = state
        .cash_close
        .close(point_id, auth.actor_id(), &payload.counts, payload.notes)
        .await?;
    Ok(Json(view))
}
