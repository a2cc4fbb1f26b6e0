//! Inbound message dispatcher.

use std::future::Future;
use std::sync::Arc;

use edgefleet_config_rollout::application::command_handlers::{
    ConfigCommandResult, handle_create_config_update, handle_record_config_progress,
};
use edgefleet_config_rollout::application::projection::ConfigUpdateView;
use edgefleet_config_rollout::application::query_handlers::{
    get_config_update, latest_active_update,
};
use edgefleet_config_rollout::domain::commands::{
    ConfigStep, CreateConfigUpdate, RecordConfigProgress,
};
use edgefleet_core::aggregate::TransitionResult;
use edgefleet_core::blob::ConfigBlobStore;
use edgefleet_core::clock::Clock;
use edgefleet_core::container::ContainerManager;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::projection::ProjectionStore;
use edgefleet_core::repository::EventRepository;
use edgefleet_gateway::application::command_handlers::{
    GatewayCommandResult, handle_connect_gateway, handle_delete_gateway,
    handle_disconnect_gateway, handle_record_gateway_update, handle_register_gateway,
};
use edgefleet_gateway::application::projection::GatewayView;
use edgefleet_gateway::application::query_handlers::replay_gateway;
use edgefleet_gateway::domain::aggregates::GatewayStatus;
use edgefleet_gateway::domain::commands::{
    ConnectGateway, DeleteGateway, DisconnectGateway, RecordGatewayUpdate, RegisterGateway,
};
use edgefleet_gateway::domain::events::{CertificateInfo, GatewayUpdate, ReportedStatus};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::message::InboundMessage;
use crate::policy::{GatewayMessageKind, allow_auto_register};
use crate::topic::{ConfigAction, parse_config_topic};

/// Location recorded for gateways registered from a device message.
pub const AUTO_REGISTER_LOCATION: &str = "unknown";

/// Reason recorded when the heartbeat monitor disconnects a gateway.
pub const MISSED_HEARTBEATS: &str = "missed heartbeats";

/// What processing a message produced.
#[derive(Debug, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// A gateway stream was written.
    Gateway {
        /// Projected status after the message.
        gateway: GatewayView,
        /// Result of every event appended for the message.
        transitions: Vec<TransitionResult>,
        /// Whether the gateway was registered on the fly.
        auto_registered: bool,
    },
    /// A configuration update stream was written.
    ConfigUpdate {
        /// Projected status after the message.
        config_update: ConfigUpdateView,
        /// Result of every event appended for the message.
        transitions: Vec<TransitionResult>,
    },
}

impl ProcessOutcome {
    fn gateway(result: GatewayCommandResult, auto_registered: bool) -> Self {
        Self::Gateway {
            gateway: result.view,
            transitions: result.transitions,
            auto_registered,
        }
    }

    fn config_update(result: ConfigCommandResult) -> Self {
        Self::ConfigUpdate {
            config_update: result.view,
            transitions: result.transitions,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct HeartbeatPayload {
    #[serde(default)]
    uptime: Option<u64>,
    #[serde(default)]
    health: Option<Value>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct StatusPayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    certificate_info: Option<CertificateInfo>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct DeletePayload {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ConfigEventPayload {
    #[serde(default)]
    update_id: Option<String>,
    #[serde(default)]
    gateway_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn parse_payload<T: DeserializeOwned + Default>(
    payload: &Value,
    kind: &str,
) -> Result<T, DomainError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload.clone())
        .map_err(|e| DomainError::Validation(format!("invalid {kind} payload: {e}")))
}

fn config_step(action: ConfigAction, payload: &ConfigEventPayload, raw: &Value) -> ConfigStep {
    let failure = || ConfigStep::Fail {
        error: payload
            .error
            .clone()
            .or_else(|| payload.message.clone())
            .unwrap_or_else(|| "gateway reported failure".to_owned()),
    };
    match action {
        ConfigAction::Published => ConfigStep::Publish,
        ConfigAction::Requested => ConfigStep::Request,
        ConfigAction::Sent => ConfigStep::Send,
        ConfigAction::Acknowledged => {
            let failed = payload
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("error") || s.eq_ignore_ascii_case("failed"));
            if failed {
                failure()
            } else {
                ConfigStep::Deliver {
                    details: raw.clone(),
                }
            }
        }
        ConfigAction::Failed => failure(),
    }
}

/// Routes inbound messages to the gateway and configuration handlers.
pub struct Dispatcher {
    repo: Arc<dyn EventRepository>,
    projections: Arc<dyn ProjectionStore>,
    blobs: Arc<dyn ConfigBlobStore>,
    containers: Arc<dyn ContainerManager>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher over the given stores and collaborators.
    #[must_use]
    pub fn new(
        repo: Arc<dyn EventRepository>,
        projections: Arc<dyn ProjectionStore>,
        blobs: Arc<dyn ConfigBlobStore>,
        containers: Arc<dyn ContainerManager>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            repo,
            projections,
            blobs,
            containers,
            clock,
            config,
        }
    }

    /// The event log.
    #[must_use]
    pub fn repository(&self) -> &dyn EventRepository {
        self.repo.as_ref()
    }

    /// The read model.
    #[must_use]
    pub fn projections(&self) -> &dyn ProjectionStore {
        self.projections.as_ref()
    }

    /// The configuration body store.
    #[must_use]
    pub fn blobs(&self) -> &dyn ConfigBlobStore {
        self.blobs.as_ref()
    }

    /// The clock stamped on every event.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Processes one message and returns the resulting projection.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for malformed messages,
    /// `DomainError::AggregateNotFound` for unknown targets that may not be
    /// auto-registered, and `DomainError::ConcurrencyConflict` once the
    /// retry budget is spent.
    #[instrument(skip(self, message), fields(kind = message.kind()))]
    pub async fn process(&self, message: InboundMessage) -> Result<ProcessOutcome, DomainError> {
        let correlation_id = Uuid::new_v4();
        match message {
            InboundMessage::CreateGateway {
                gateway_id,
                name,
                location,
            } => {
                let command = RegisterGateway {
                    correlation_id,
                    gateway_id: gateway_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                    name,
                    location,
                };
                self.create_gateway(&command).await
            }
            InboundMessage::DeleteGateway { gateway_id, reason } => {
                let command = DeleteGateway {
                    correlation_id,
                    gateway_id,
                    reason,
                };
                self.delete_gateway(&command).await
            }
            InboundMessage::MqttDelete {
                gateway_id,
                payload,
            } => {
                self.ensure_gateway(&gateway_id, GatewayMessageKind::Delete, correlation_id)
                    .await?;
                let body: DeletePayload = parse_payload(&payload, "delete")?;
                let command = DeleteGateway {
                    correlation_id,
                    gateway_id,
                    reason: body.reason,
                };
                self.delete_gateway(&command).await
            }
            InboundMessage::ConnectGateway { gateway_id } => {
                let command = ConnectGateway {
                    correlation_id,
                    gateway_id,
                };
                let result = self
                    .retrying(|| {
                        handle_connect_gateway(
                            &command,
                            self.clock(),
                            self.repository(),
                            self.projections(),
                        )
                    })
                    .await?;
                Ok(ProcessOutcome::gateway(result, false))
            }
            InboundMessage::MqttHeartbeat {
                gateway_id,
                payload,
            } => {
                let body: HeartbeatPayload = parse_payload(&payload, "heartbeat")?;
                let update = GatewayUpdate::Heartbeat {
                    uptime: body.uptime,
                    health: body.health,
                };
                self.record_update(gateway_id, update, GatewayMessageKind::Heartbeat, correlation_id)
                    .await
            }
            InboundMessage::MqttStatus {
                gateway_id,
                payload,
            } => {
                let body: StatusPayload = parse_payload(&payload, "status")?;
                let status: ReportedStatus = body
                    .status
                    .ok_or_else(|| DomainError::Validation("status is required".to_owned()))?
                    .parse()?;
                let update = GatewayUpdate::Status {
                    status,
                    certificate_info: body.certificate_info,
                };
                self.record_update(gateway_id, update, GatewayMessageKind::Status, correlation_id)
                    .await
            }
            InboundMessage::MqttAcknowledge {
                gateway_id,
                payload,
            } => {
                let update = GatewayUpdate::Acknowledge { details: payload };
                self.record_update(
                    gateway_id,
                    update,
                    GatewayMessageKind::Acknowledge,
                    correlation_id,
                )
                .await
            }
            InboundMessage::HeartbeatTimeout {
                gateway_id,
                stale_before,
            } => {
                let command = DisconnectGateway {
                    correlation_id,
                    gateway_id,
                    reason: Some(MISSED_HEARTBEATS.to_owned()),
                    stale_before: Some(stale_before),
                };
                let result = self
                    .retrying(|| {
                        handle_disconnect_gateway(
                            &command,
                            self.clock(),
                            self.repository(),
                            self.projections(),
                        )
                    })
                    .await?;
                if result.transitions.iter().all(TransitionResult::is_applied) {
                    info!(gateway_id = %command.gateway_id, "gateway timed out");
                }
                Ok(ProcessOutcome::gateway(result, false))
            }
            InboundMessage::ConfigUpdate {
                gateway_id,
                yaml_config,
                config_hash,
                update_id,
            } => {
                let command = CreateConfigUpdate {
                    correlation_id,
                    update_id: update_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                    gateway_id,
                    yaml_config,
                    config_hash,
                };
                self.create_config_update(&command).await
            }
            InboundMessage::MqttConfigEvent { topic, payload } => {
                self.config_event(&topic, &payload, correlation_id).await
            }
        }
    }

    /// Runs `attempt` until it succeeds, fails with something other than a
    /// concurrency conflict, or the retry budget is spent.
    async fn retrying<T, F, Fut>(&self, mut attempt: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected,
                    actual,
                }) if retries < self.config.max_append_retries => {
                    retries += 1;
                    debug!(
                        %aggregate_id,
                        expected,
                        actual,
                        retries,
                        "concurrency conflict, retrying append"
                    );
                }
                other => return other,
            }
        }
    }

    async fn create_gateway(&self, command: &RegisterGateway) -> Result<ProcessOutcome, DomainError> {
        let result = self
            .retrying(|| {
                handle_register_gateway(command, self.clock(), self.repository(), self.projections())
            })
            .await?;
        if result.transitions.iter().all(TransitionResult::is_applied) {
            info!(gateway_id = %command.gateway_id, "gateway registered");
            if let Err(e) = self.containers.start(&command.gateway_id).await {
                warn!(error = %e, "container start failed");
            }
        }
        Ok(ProcessOutcome::gateway(result, false))
    }

    async fn delete_gateway(&self, command: &DeleteGateway) -> Result<ProcessOutcome, DomainError> {
        let result = self
            .retrying(|| {
                handle_delete_gateway(command, self.clock(), self.repository(), self.projections())
            })
            .await?;
        if result.transitions.iter().all(TransitionResult::is_applied) {
            info!(gateway_id = %command.gateway_id, "gateway deleted");
            if let Err(e) = self.containers.stop(&command.gateway_id).await {
                warn!(error = %e, "container stop failed");
            }
        }
        Ok(ProcessOutcome::gateway(result, false))
    }

    /// Makes sure `gateway_id` exists, registering it when the policy allows.
    ///
    /// Returns the registration result if the gateway was created here.
    async fn ensure_gateway(
        &self,
        gateway_id: &str,
        kind: GatewayMessageKind,
        correlation_id: Uuid,
    ) -> Result<Option<GatewayCommandResult>, DomainError> {
        let version = self
            .repo
            .current_version(gateway_id, AggregateType::Gateway)
            .await?;
        if version >= 0 {
            return Ok(None);
        }
        if !allow_auto_register(kind) {
            return Err(DomainError::AggregateNotFound(gateway_id.to_owned()));
        }

        let command = RegisterGateway {
            correlation_id,
            gateway_id: gateway_id.to_owned(),
            name: gateway_id.to_owned(),
            location: AUTO_REGISTER_LOCATION.to_owned(),
        };
        let result = self
            .retrying(|| {
                handle_register_gateway(&command, self.clock(), self.repository(), self.projections())
            })
            .await?;
        info!(gateway_id, "gateway auto-registered");
        Ok(Some(result))
    }

    async fn record_update(
        &self,
        gateway_id: String,
        update: GatewayUpdate,
        kind: GatewayMessageKind,
        correlation_id: Uuid,
    ) -> Result<ProcessOutcome, DomainError> {
        let registered = self.ensure_gateway(&gateway_id, kind, correlation_id).await?;
        let command = RecordGatewayUpdate {
            correlation_id,
            gateway_id,
            update,
        };
        let mut result = self
            .retrying(|| {
                handle_record_gateway_update(
                    &command,
                    self.clock(),
                    self.repository(),
                    self.projections(),
                )
            })
            .await?;

        let auto_registered = registered.is_some();
        if let Some(registration) = registered {
            let mut transitions = registration.transitions;
            transitions.append(&mut result.transitions);
            result.transitions = transitions;
        }
        Ok(ProcessOutcome::gateway(result, auto_registered))
    }

    async fn create_config_update(
        &self,
        command: &CreateConfigUpdate,
    ) -> Result<ProcessOutcome, DomainError> {
        let gateway = replay_gateway(&command.gateway_id, self.repository()).await?;
        if gateway.status == GatewayStatus::Deleted {
            return Err(DomainError::Validation(format!(
                "gateway {} is deleted",
                command.gateway_id
            )));
        }
        let result = self
            .retrying(|| {
                handle_create_config_update(
                    command,
                    self.clock(),
                    self.repository(),
                    self.projections(),
                    self.blobs(),
                )
            })
            .await?;
        info!(
            update_id = %command.update_id,
            gateway_id = %command.gateway_id,
            config_hash = %result.view.config_hash,
            "configuration update stored"
        );
        Ok(ProcessOutcome::config_update(result))
    }

    async fn config_event(
        &self,
        topic: &str,
        payload: &Value,
        correlation_id: Uuid,
    ) -> Result<ProcessOutcome, DomainError> {
        let parsed = parse_config_topic(topic)?;
        let body: ConfigEventPayload = parse_payload(payload, "config event")?;
        let gateway_id = body.gateway_id.clone().unwrap_or(parsed.gateway_id);

        let update_id = match body.update_id.clone().or(parsed.update_id) {
            Some(update_id) => {
                // An unknown update surfaces as not found from the handler.
                match get_config_update(&update_id, false, self.projections(), self.blobs()).await
                {
                    Ok(view) if view.gateway_id != gateway_id => {
                        return Err(DomainError::Validation(format!(
                            "update {update_id} does not belong to gateway {gateway_id}"
                        )));
                    }
                    Ok(_) | Err(DomainError::AggregateNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
                update_id
            }
            None => {
                latest_active_update(&gateway_id, self.projections())
                    .await?
                    .ok_or_else(|| {
                        DomainError::AggregateNotFound(format!(
                            "active configuration update for gateway {gateway_id}"
                        ))
                    })?
                    .update_id
            }
        };

        let command = RecordConfigProgress {
            correlation_id,
            update_id,
            step: config_step(parsed.action, &body, payload),
        };
        let result = self
            .retrying(|| {
                handle_record_config_progress(
                    &command,
                    self.clock(),
                    self.repository(),
                    self.projections(),
                )
            })
            .await?;
        Ok(ProcessOutcome::config_update(result))
    }
}
