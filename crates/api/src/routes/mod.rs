//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod balances;
pub mod cash_close;
pub mod health;
pub mod reconciliation;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Every ledger route needs an actor identity
    let protected_routes = Router::new()
        .merge(balances::routes())
        .merge(reconciliation::routes())
        .merge(cash_close::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(health::routes()).merge(protected_routes)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{body::Body, http::Response};
    use cashpoint_core::ledger::WithdrawalPolicy;
    use cashpoint_db::LockSettings;
    use cashpoint_shared::{JwtConfig, JwtService, Role};
    use http_body_util::BodyExt;
    use sea_orm::DatabaseConnection;
    use uuid::Uuid;

    use crate::AppState;

    /// State whose database is never reached by the tests using it.
    pub fn test_state() -> AppState {
        AppState::new(
            DatabaseConnection::Disconnected,
            JwtService::new(JwtConfig::default()),
            WithdrawalPolicy::default(),
            LockSettings::default(),
        )
    }

    pub fn operator_token(state: &AppState, point_id: Option<Uuid>) -> String {
        state
            .jwt_service
            .issue(Uuid::new_v4(), point_id, Role::Operator)
            .expect("should issue token")
    }

    pub fn admin_token(state: &AppState) -> String {
        state
            .jwt_service
            .issue(Uuid::new_v4(), None, Role::Admin)
            .expect("should issue token")
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
