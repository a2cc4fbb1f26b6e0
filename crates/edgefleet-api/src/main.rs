//! Edgefleet API server entry point.

use std::sync::Arc;

use edgefleet_api::error::AppError;
use edgefleet_api::settings::Settings;
use edgefleet_api::state::AppState;
use edgefleet_api::{app, telemetry};
use edgefleet_core::clock::SystemClock;
use edgefleet_event_store::schema;
use edgefleet_worker::container::NoopContainerManager;
use edgefleet_worker::heartbeat::HeartbeatMonitor;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let telemetry = telemetry::init(settings.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Edgefleet API server");

    let clock = Arc::new(SystemClock);
    let containers = Arc::new(NoopContainerManager);
    let app_state = match settings.database_url.as_deref() {
        Some(database_url) => {
            let pool = schema::connect(database_url, settings.database_max_connections).await?;
            schema::run_migrations(&pool).await?;
            AppState::postgres(pool, clock, containers, settings.worker)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            AppState::in_memory(clock, containers, settings.worker)
        }
    };

    let monitor = HeartbeatMonitor::new(app_state.dispatcher.clone(), settings.heartbeat).spawn();

    let addr = settings.bind_addr()?;
    tracing::info!(%addr, backend = app_state.backend, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    monitor.abort();
    tracing::info!("server stopped");
    telemetry.shutdown();
    Ok(())
}
