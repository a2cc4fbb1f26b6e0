//! Server settings read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use edgefleet_worker::config::WorkerConfig;
use edgefleet_worker::heartbeat::HeartbeatMonitorConfig;

use crate::error::AppError;

/// Settings resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// PostgreSQL URL; the in-memory backend is used when absent.
    pub database_url: Option<String>,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Connection pool size.
    pub database_max_connections: u32,
    /// Dispatcher tuning.
    pub worker: WorkerConfig,
    /// Heartbeat monitor tuning.
    pub heartbeat: HeartbeatMonitorConfig,
    /// OTLP collector endpoint; span export is off when absent.
    pub otlp_endpoint: Option<String>,
}

impl Settings {
    /// Reads settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which returns the raw value of a
    /// variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = HeartbeatMonitorConfig::default();

        let max_append_retries = parse_or(
            &lookup,
            "MAX_APPEND_RETRIES",
            WorkerConfig::default().max_append_retries,
        )?;
        let poll_interval_seconds = parse_or(
            &lookup,
            "HEARTBEAT_POLL_INTERVAL_SECONDS",
            defaults.poll_interval_seconds,
        )?;
        let heartbeat_interval_seconds = parse_or(
            &lookup,
            "HEARTBEAT_INTERVAL_SECONDS",
            defaults.heartbeat_interval_seconds,
        )?;
        let miss_threshold =
            parse_or(&lookup, "HEARTBEAT_MISS_THRESHOLD", defaults.miss_threshold)?;

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            worker: WorkerConfig { max_append_retries },
            heartbeat: HeartbeatMonitorConfig {
                poll_interval_seconds: positive(
                    poll_interval_seconds,
                    "HEARTBEAT_POLL_INTERVAL_SECONDS",
                )?,
                heartbeat_interval_seconds: positive(
                    heartbeat_interval_seconds,
                    "HEARTBEAT_INTERVAL_SECONDS",
                )?,
                miss_threshold: positive(miss_threshold, "HEARTBEAT_MISS_THRESHOLD")?,
            },
            otlp_endpoint: non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if host and port do not form an address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        _ => Ok(default),
    }
}

fn positive<T: PartialEq + Default>(value: T, key: &str) -> Result<T, AppError> {
    if value == T::default() {
        return Err(AppError::Config(format!("{key} must be greater than zero")));
    }
    Ok(value)
}
