//! Heartbeat timeout monitor.
//!
//! Connected gateways are expected to publish a heartbeat every
//! `heartbeat_interval_seconds`. A gateway that stays silent for
//! `miss_threshold` intervals is reported through a `HeartbeatTimeout`
//! message, which disconnects it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use edgefleet_core::aggregate::TransitionResult;
use edgefleet_core::error::DomainError;
use edgefleet_gateway::application::projection::GatewayView;
use edgefleet_gateway::application::query_handlers::list_gateways;
use edgefleet_gateway::domain::aggregates::GatewayStatus;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{Dispatcher, ProcessOutcome};
use crate::message::InboundMessage;

/// Configuration for the heartbeat monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatMonitorConfig {
    /// How often the read model is scanned (in seconds).
    pub poll_interval_seconds: u64,
    /// Expected time between two heartbeats (in seconds).
    pub heartbeat_interval_seconds: u64,
    /// Missed heartbeats before a gateway is considered offline.
    pub miss_threshold: u32,
}

impl Default for HeartbeatMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 30,
            heartbeat_interval_seconds: 30,
            miss_threshold: 3,
        }
    }
}

impl HeartbeatMonitorConfig {
    /// Silence after which a connected gateway times out.
    #[must_use]
    pub fn timeout(&self) -> chrono::Duration {
        let seconds = self
            .heartbeat_interval_seconds
            .saturating_mul(u64::from(self.miss_threshold));
        chrono::Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX / 1_000))
    }
}

/// Last sign of life of a gateway: its latest heartbeat or, if it has not
/// sent one since connecting, the connection time.
fn last_seen(gateway: &GatewayView) -> Option<DateTime<Utc>> {
    match (gateway.last_heartbeat, gateway.connected_at) {
        (Some(heartbeat), Some(connected)) => Some(heartbeat.max(connected)),
        (heartbeat, connected) => heartbeat.or(connected),
    }
}

/// Periodically disconnects connected gateways that stopped sending
/// heartbeats.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    dispatcher: Arc<Dispatcher>,
    config: HeartbeatMonitorConfig,
}

impl HeartbeatMonitor {
    /// Creates a monitor dispatching through `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, config: HeartbeatMonitorConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Scans the read model once and dispatches a `HeartbeatTimeout` for
    /// every connected gateway silent for longer than the timeout.
    ///
    /// Returns the IDs of the gateways that were timed out. A failure for
    /// one gateway is logged and does not stop the scan.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the read model cannot be listed.
    pub async fn scan_once(&self) -> Result<Vec<String>, DomainError> {
        let now = self.dispatcher.clock().now();
        let timeout = self.config.timeout();
        let stale_before = now - timeout;
        let connected =
            list_gateways(Some(GatewayStatus::Connected), self.dispatcher.projections()).await?;

        let mut timed_out = Vec::new();
        for gateway in connected {
            let Some(seen) = last_seen(&gateway) else {
                continue;
            };
            if seen >= stale_before {
                continue;
            }
            debug!(
                gateway_id = %gateway.gateway_id,
                silent_seconds = (now - seen).num_seconds(),
                "gateway missed heartbeats"
            );
            match self
                .dispatcher
                .process(InboundMessage::HeartbeatTimeout {
                    gateway_id: gateway.gateway_id.clone(),
                    stale_before,
                })
                .await
            {
                Ok(ProcessOutcome::Gateway { transitions, .. })
                    if transitions.iter().all(TransitionResult::is_applied) =>
                {
                    timed_out.push(gateway.gateway_id);
                }
                Ok(_) => debug!(
                    gateway_id = %gateway.gateway_id,
                    "gateway seen again before the timeout was recorded"
                ),
                Err(e) => warn!(
                    gateway_id = %gateway.gateway_id,
                    error = %e,
                    "failed to time out gateway"
                ),
            }
        }
        Ok(timed_out)
    }

    /// Starts the monitor on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            poll_interval_seconds = self.config.poll_interval_seconds,
            timeout_seconds = self.config.timeout().num_seconds(),
            "starting heartbeat monitor"
        );

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(self.config.poll_interval_seconds.max(1)));

            loop {
                ticker.tick().await;

                match self.scan_once().await {
                    Ok(timed_out) => {
                        if !timed_out.is_empty() {
                            info!(count = timed_out.len(), "timed out silent gateways");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "heartbeat scan failed");
                    }
                }
            }
        })
    }
}
