//! Static workflow settings that do not change between runs.
//!
//! # Design
//! - Pure data carriers with defaults from `defaults.rs`.
//! - Builder-style overrides keep call sites at the CLI boundary short.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Retry budget for each workflow stage, counted after the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRetries {
    /// Retries for the configuration echo.
    pub echo_config: u32,
    /// Retries for the parameter validator.
    pub validate_params: u32,
    /// Retries for the bulk copy invocation.
    pub bulk_copy: u32,
    /// Retries for the destination listing.
    pub list_destination: u32,
}

impl Default for StageRetries {
    fn default() -> Self {
        Self {
            echo_config: defaults::ECHO_CONFIG_RETRIES,
            validate_params: defaults::VALIDATE_PARAMS_RETRIES,
            bulk_copy: defaults::BULK_COPY_RETRIES,
            list_destination: defaults::LIST_DESTINATION_RETRIES,
        }
    }
}

/// Settings shared by every run executed by a workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Connection reference handed to collaborators for the source store.
    pub source_connection: String,
    /// Connection reference handed to collaborators for the destination store.
    pub destination_connection: String,
    /// Per-stage retry budgets.
    pub retries: StageRetries,
    /// Base delay between retries.
    #[serde(with = "duration_millis")]
    pub retry_base_delay: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            source_connection: defaults::SOURCE_CONNECTION_ID.to_string(),
            destination_connection: defaults::DESTINATION_CONNECTION_ID.to_string(),
            retries: StageRetries::default(),
            retry_base_delay: defaults::RETRY_BASE_DELAY,
        }
    }
}

impl WorkflowSettings {
    /// Override the source connection reference.
    #[must_use]
    pub fn with_source_connection(mut self, connection: impl Into<String>) -> Self {
        self.source_connection = connection.into();
        self
    }

    /// Override the destination connection reference.
    #[must_use]
    pub fn with_destination_connection(mut self, connection: impl Into<String>) -> Self {
        self.destination_connection = connection.into();
        self
    }

    /// Override the per-stage retry budgets.
    #[must_use]
    pub const fn with_retries(mut self, retries: StageRetries) -> Self {
        self.retries = retries;
        self
    }

    /// Override the base delay between retries.
    #[must_use]
    pub const fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_stage_budgets() {
        let settings = WorkflowSettings::default();
        assert_eq!(settings.source_connection, "aws_default");
        assert_eq!(settings.destination_connection, "google_cloud_default");
        assert_eq!(settings.retries.echo_config, 3);
        assert_eq!(settings.retries.validate_params, 1);
        assert_eq!(settings.retries.bulk_copy, 0);
        assert_eq!(settings.retries.list_destination, 1);
    }

    #[test]
    fn overrides_apply_and_round_trip_through_json() -> anyhow::Result<()> {
        let settings = WorkflowSettings::default()
            .with_source_connection("aws_prod")
            .with_destination_connection("gcp_prod")
            .with_retry_base_delay(Duration::from_millis(25));
        let value = serde_json::to_value(&settings)?;
        assert_eq!(value["retry_base_delay"], json!(25));
        let parsed: WorkflowSettings = serde_json::from_value(value)?;
        assert_eq!(parsed, settings);
        Ok(())
    }
}
