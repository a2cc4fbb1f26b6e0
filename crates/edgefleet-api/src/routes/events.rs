//! Message-bus ingress.
//!
//! A bridge forwards every device message here as one tagged JSON
//! `InboundMessage`; the response is the projection the message produced.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use edgefleet_core::error::DomainError;
use edgefleet_worker::dispatcher::ProcessOutcome;
use edgefleet_worker::message::InboundMessage;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /
#[instrument(skip(state, message), fields(kind = message.kind()))]
async fn ingest(
    State(state): State<AppState>,
    Json(message): Json<InboundMessage>,
) -> Result<Json<ProcessOutcome>, ApiError> {
    if message.is_internal() {
        return Err(ApiError(DomainError::Validation(format!(
            "{} messages cannot be submitted",
            message.kind()
        ))));
    }
    let outcome = state.dispatcher.process(message).await?;
    Ok(Json(outcome))
}

/// Returns the router for message ingress.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(ingest))
}
