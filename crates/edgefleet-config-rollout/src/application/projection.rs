//! Read model projection for configuration updates.

use chrono::{DateTime, Utc};
use edgefleet_core::aggregate::AggregateRoot;
use edgefleet_core::error::DomainError;
use edgefleet_core::event::AggregateType;
use edgefleet_core::projection::{ProjectionRow, ProjectionStore};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{ConfigState, ConfigUpdate, DeliveryStatus};

/// Projected status of a configuration update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdateView {
    /// The update identifier.
    pub update_id: String,
    /// The target gateway.
    pub gateway_id: String,
    /// Rollout state.
    pub state: ConfigState,
    /// SHA-256 of the YAML body.
    pub config_hash: String,
    /// Delivery progress.
    pub delivery_status: Option<DeliveryStatus>,
    /// Failure message.
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub requested_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    /// Time of the last applied change.
    pub last_updated: Option<DateTime<Utc>>,
    /// Version of the last applied event.
    pub version: i64,
    /// YAML body, only filled in on request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_config: Option<String>,
}

impl From<&ConfigUpdate> for ConfigUpdateView {
    fn from(update: &ConfigUpdate) -> Self {
        Self {
            update_id: update.id.clone(),
            gateway_id: update.gateway_id.clone(),
            state: update.state,
            config_hash: update.config_hash.clone(),
            delivery_status: update.delivery_status,
            error: update.error.clone(),
            created_at: update.created_at,
            published_at: update.published_at,
            requested_at: update.requested_at,
            sent_at: update.sent_at,
            completed_at: update.completed_at,
            failed_at: update.failed_at,
            last_updated: update.last_updated,
            version: update.version(),
            yaml_config: None,
        }
    }
}

impl ConfigUpdateView {
    /// Converts the view into a projection row owned by its gateway.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the view cannot be serialized.
    pub fn to_row(&self, now: DateTime<Utc>) -> Result<ProjectionRow, DomainError> {
        let mut document = serde_json::to_value(self)
            .map_err(|e| DomainError::Infrastructure(format!("view serialization failed: {e}")))?;
        if let Some(fields) = document.as_object_mut() {
            fields.remove("yaml_config");
        }
        Ok(ProjectionRow {
            aggregate_id: self.update_id.clone(),
            aggregate_type: AggregateType::ConfigUpdate,
            state: self.state.as_str().to_owned(),
            owner_id: Some(self.gateway_id.clone()),
            version: self.version,
            document,
            updated_at: now,
        })
    }

    /// Reads a view back out of a projection row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the stored document is malformed.
    pub fn from_row(row: &ProjectionRow) -> Result<Self, DomainError> {
        serde_json::from_value(row.document.clone()).map_err(|e| {
            DomainError::Infrastructure(format!(
                "config update projection {} is malformed: {e}",
                row.aggregate_id
            ))
        })
    }
}

/// Overwrites the read model row of an update with `view`.
///
/// # Errors
///
/// Returns `DomainError` if serialization or the store write fails.
pub async fn upsert_config_update(
    store: &dyn ProjectionStore,
    view: &ConfigUpdateView,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    store.upsert(&view.to_row(now)?).await
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use edgefleet_test_support::FixedClock;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_row_is_owned_by_gateway_and_omits_yaml() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let mut update = ConfigUpdate::new("cu-1");
        update.create("gw-1".to_owned(), "abc".to_owned(), Uuid::new_v4(), &clock);
        let pending = update.uncommitted_events().to_vec();
        for event in &pending {
            update.apply(event);
        }
        let mut view = ConfigUpdateView::from(&update);
        view.yaml_config = Some("a: 1\n".to_owned());

        let row = view.to_row(clock.0).unwrap();

        assert_eq!(row.owner_id.as_deref(), Some("gw-1"));
        assert_eq!(row.state, "stored");
        assert_eq!(row.document["delivery_status"], "pending");
        assert!(row.document.get("yaml_config").is_none());
        assert_eq!(ConfigUpdateView::from_row(&row).unwrap().yaml_config, None);
    }
}
