//! Routes for the Configuration Rollout context.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use edgefleet_config_rollout::application::projection::ConfigUpdateView;
use edgefleet_config_rollout::application::query_handlers;
use edgefleet_config_rollout::domain::aggregates::ConfigState;
use edgefleet_worker::dispatcher::ProcessOutcome;
use edgefleet_worker::message::InboundMessage;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateConfigRequest {
    /// The target gateway.
    pub gateway_id: String,
    /// YAML body.
    pub yaml_config: String,
    /// SHA-256 the caller computed over `yaml_config`.
    #[serde(default)]
    pub config_hash: Option<String>,
    /// Identifier; generated when absent.
    #[serde(default)]
    pub update_id: Option<String>,
}

/// Query string for GET /.
#[derive(Debug, Deserialize)]
pub struct ListConfigsQuery {
    #[serde(default)]
    pub gateway_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Query string for GET /{update_id}.
#[derive(Debug, Default, Deserialize)]
pub struct GetConfigQuery {
    /// Include the YAML body in the response.
    #[serde(default)]
    pub include_config: bool,
}

/// POST /
#[instrument(skip(state, request), fields(gateway_id = %request.gateway_id))]
async fn create_config(
    State(state): State<AppState>,
    Json(request): Json<CreateConfigRequest>,
) -> Result<(StatusCode, Json<ProcessOutcome>), ApiError> {
    info!("handling config_update command");

    let outcome = state
        .dispatcher
        .process(InboundMessage::ConfigUpdate {
            gateway_id: request.gateway_id,
            yaml_config: request.yaml_config,
            config_hash: request.config_hash,
            update_id: request.update_id,
        })
        .await?;

    let created = matches!(
        &outcome,
        ProcessOutcome::ConfigUpdate { transitions, .. }
            if transitions.iter().all(|t| t.is_applied())
    );
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// GET /
async fn list_configs(
    State(state): State<AppState>,
    Query(query): Query<ListConfigsQuery>,
) -> Result<Json<Vec<ConfigUpdateView>>, ApiError> {
    let config_state = query
        .state
        .as_deref()
        .map(str::parse::<ConfigState>)
        .transpose()?;
    let updates = query_handlers::list_config_updates(
        query.gateway_id.as_deref(),
        config_state,
        state.dispatcher.projections(),
    )
    .await?;
    Ok(Json(updates))
}

/// GET /{update_id}
async fn get_config(
    State(state): State<AppState>,
    Path(update_id): Path<String>,
    Query(query): Query<GetConfigQuery>,
) -> Result<Json<ConfigUpdateView>, ApiError> {
    let view = query_handlers::get_config_update(
        &update_id,
        query.include_config,
        state.dispatcher.projections(),
        state.dispatcher.blobs(),
    )
    .await?;
    Ok(Json(view))
}

/// Returns the router for the configuration context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_config).get(list_configs))
        .route("/{update_id}", get(get_config))
}
