//! Cashpoint API Server
//!
//! Main entry point for the balance ledger and cash-close service.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cashpoint_api::{AppState, create_router};
use cashpoint_core::ledger::WithdrawalPolicy;
use cashpoint_db::{LockSettings, connect_with};
use cashpoint_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cashpoint=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // An invalid preference order must stop the boot, not the first withdrawal
    let policy = WithdrawalPolicy::from_config(&config.ledger.withdrawal_policy)
        .context("Invalid ledger.withdrawal_policy")?;
    let settings = LockSettings::from(&config.ledger);

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        lock_timeout_ms = settings.lock_timeout_ms,
        "Connected to database"
    );

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        ..JwtConfig::default()
    });

    let state = AppState::new(db, jwt_service, policy, settings);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
