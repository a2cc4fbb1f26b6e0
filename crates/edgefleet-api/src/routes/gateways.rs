//! Routes for the Gateway Lifecycle context.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use edgefleet_core::aggregate::TransitionResult;
use edgefleet_gateway::application::projection::GatewayView;
use edgefleet_gateway::application::query_handlers::{self, GatewayEventView};
use edgefleet_gateway::domain::aggregates::GatewayStatus;
use edgefleet_worker::dispatcher::ProcessOutcome;
use edgefleet_worker::message::InboundMessage;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateGatewayRequest {
    /// Identifier; generated when absent.
    #[serde(default)]
    pub gateway_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Physical location.
    pub location: String,
}

/// Optional request body for DELETE /{gateway_id}.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteGatewayRequest {
    /// Why the gateway is deleted.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Query string for GET /.
#[derive(Debug, Deserialize)]
pub struct ListGatewaysQuery {
    /// Only return gateways in this state.
    #[serde(default)]
    pub status: Option<String>,
}

fn all_applied(outcome: &ProcessOutcome) -> bool {
    let transitions: &[TransitionResult] = match outcome {
        ProcessOutcome::Gateway { transitions, .. }
        | ProcessOutcome::ConfigUpdate { transitions, .. } => transitions,
    };
    transitions.iter().all(TransitionResult::is_applied)
}

/// POST /
#[instrument(skip(state, request), fields(gateway_id = ?request.gateway_id))]
async fn create_gateway(
    State(state): State<AppState>,
    Json(request): Json<CreateGatewayRequest>,
) -> Result<(StatusCode, Json<ProcessOutcome>), ApiError> {
    info!("handling create_gateway command");

    let outcome = state
        .dispatcher
        .process(InboundMessage::CreateGateway {
            gateway_id: request.gateway_id,
            name: request.name,
            location: request.location,
        })
        .await?;

    let status = if all_applied(&outcome) {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// GET /
async fn list_gateways(
    State(state): State<AppState>,
    Query(query): Query<ListGatewaysQuery>,
) -> Result<Json<Vec<GatewayView>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<GatewayStatus>)
        .transpose()?;
    let gateways = query_handlers::list_gateways(status, state.dispatcher.projections()).await?;
    Ok(Json(gateways))
}

/// GET /{gateway_id}
async fn get_gateway(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
) -> Result<Json<GatewayView>, ApiError> {
    let view = query_handlers::get_gateway(&gateway_id, state.dispatcher.projections()).await?;
    Ok(Json(view))
}

/// DELETE /{gateway_id}
#[instrument(skip(state, request))]
async fn delete_gateway(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
    request: Option<Json<DeleteGatewayRequest>>,
) -> Result<Json<ProcessOutcome>, ApiError> {
    info!("handling delete_gateway command");

    let request = request.map(|Json(body)| body).unwrap_or_default();
    let outcome = state
        .dispatcher
        .process(InboundMessage::DeleteGateway {
            gateway_id,
            reason: request.reason,
        })
        .await?;
    Ok(Json(outcome))
}

/// POST /{gateway_id}/connect
#[instrument(skip(state))]
async fn connect_gateway(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
) -> Result<Json<ProcessOutcome>, ApiError> {
    info!("handling connect_gateway command");

    let outcome = state
        .dispatcher
        .process(InboundMessage::ConnectGateway { gateway_id })
        .await?;
    Ok(Json(outcome))
}

/// GET /{gateway_id}/events
async fn get_gateway_events(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
) -> Result<Json<Vec<GatewayEventView>>, ApiError> {
    let history =
        query_handlers::get_gateway_history(&gateway_id, state.dispatcher.repository()).await?;
    Ok(Json(history))
}

/// POST /{gateway_id}/rebuild
#[instrument(skip(state))]
async fn rebuild_gateway(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
) -> Result<Json<GatewayView>, ApiError> {
    let dispatcher = &state.dispatcher;
    let view = query_handlers::rebuild_gateway_projection(
        &gateway_id,
        dispatcher.clock(),
        dispatcher.repository(),
        dispatcher.projections(),
    )
    .await?;
    info!(version = view.version, "gateway projection rebuilt");
    Ok(Json(view))
}

/// Returns the router for the gateway context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_gateway).get(list_gateways))
        .route("/{gateway_id}", get(get_gateway).delete(delete_gateway))
        .route("/{gateway_id}/connect", post(connect_gateway))
        .route("/{gateway_id}/events", get(get_gateway_events))
        .route("/{gateway_id}/rebuild", post(rebuild_gateway))
}
