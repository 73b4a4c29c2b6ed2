//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Balance, reconciliation and cash-close (cuadre) routes
//! - Authentication middleware
//! - Structured error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use cashpoint_core::ledger::WithdrawalPolicy;
use cashpoint_db::{
    AssignmentRepository, CashCloseRepository, LockSettings, MovementOrchestrator,
    ReconciliationRepository,
};
use cashpoint_shared::JwtService;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Records movements against balances and the ledger.
    pub orchestrator: Arc<MovementOrchestrator>,
    /// Replays ledgers and corrects drift.
    pub reconciliation: Arc<ReconciliationRepository>,
    /// Daily cash-close sessions.
    pub cash_close: Arc<CashCloseRepository>,
    /// Operator-to-point assignments.
    pub assignments: Arc<AssignmentRepository>,
}

impl AppState {
    /// Builds the state around one connection pool.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        jwt_service: JwtService,
        policy: WithdrawalPolicy,
        settings: LockSettings,
    ) -> Self {
        Self {
            orchestrator: Arc::new(MovementOrchestrator::new(db.clone(), policy, settings)),
            reconciliation: Arc::new(ReconciliationRepository::new(db.clone(), settings)),
            cash_close: Arc::new(CashCloseRepository::new(db.clone(), settings)),
            assignments: Arc::new(AssignmentRepository::new(db.clone())),
            jwt_service: Arc::new(jwt_service),
            db: Arc::new(db),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
