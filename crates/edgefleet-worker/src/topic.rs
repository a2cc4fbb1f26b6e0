//! Configuration topic parsing.
//!
//! Gateways report rollout progress on
//! `gateways/{gateway_id}/config[/{update_id}]/{action}`.

use std::str::FromStr;

use edgefleet_core::error::DomainError;

/// Rollout step named by the last topic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// `published`
    Published,
    /// `request` or `requested`
    Requested,
    /// `sent`
    Sent,
    /// `ack`, `acknowledged` or `delivered`
    Acknowledged,
    /// `failed` or `error`
    Failed,
}

impl FromStr for ConfigAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "published" => Ok(Self::Published),
            "request" | "requested" => Ok(Self::Requested),
            "sent" => Ok(Self::Sent),
            "ack" | "acknowledged" | "delivered" => Ok(Self::Acknowledged),
            "failed" | "error" => Ok(Self::Failed),
            other => Err(DomainError::Validation(format!(
                "unknown config action: {other}"
            ))),
        }
    }
}

/// A parsed configuration topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTopic {
    /// Gateway named in the topic.
    pub gateway_id: String,
    /// Update named in the topic, if any.
    pub update_id: Option<String>,
    /// Reported step.
    pub action: ConfigAction,
}

/// Parses a configuration topic.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the topic does not follow the
/// grammar or names an unknown action.
pub fn parse_config_topic(topic: &str) -> Result<ConfigTopic, DomainError> {
    let invalid = || DomainError::Validation(format!("invalid config topic: {topic}"));
    let segments: Vec<&str> = topic.trim_matches('/').split('/').collect();

    let (gateway_id, update_id, action) = match segments.as_slice() {
        ["gateways", gateway_id, "config", action] => (*gateway_id, None, *action),
        ["gateways", gateway_id, "config", update_id, action] => {
            (*gateway_id, Some(*update_id), *action)
        }
        _ => return Err(invalid()),
    };
    if gateway_id.is_empty() || update_id.is_some_and(str::is_empty) {
        return Err(invalid());
    }

    Ok(ConfigTopic {
        gateway_id: gateway_id.to_owned(),
        update_id: update_id.map(str::to_owned),
        action: action.parse()?,
    })
}
