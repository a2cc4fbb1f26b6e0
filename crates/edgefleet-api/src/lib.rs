//! Edgefleet — HTTP API library.
//!
//! Re-exports route modules and shared state so that integration tests can
//! build the same router as `main.rs`.

pub mod error;
pub mod routes;
pub mod settings;
pub mod state;
pub mod telemetry;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/gateways", routes::gateways::router())
        .nest("/api/v1/configs", routes::configs::router())
        .nest("/api/v1/events", routes::events::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
