//! Typed run configuration models.
//!
//! # Design
//! - `RunConfiguration` keeps the trigger payload untouched for echoing.
//! - `ValidatedParameters` can only be produced by the validator, so later
//!   stages never see a partially populated record.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// Trigger key naming the source bucket.
pub const SOURCE_BUCKET_KEY: &str = "s3_bucket";
/// Trigger key naming the folder-style source prefix.
pub const SOURCE_PREFIX_KEY: &str = "s3_object_prefix";
/// Trigger key naming the destination bucket.
pub const DESTINATION_BUCKET_KEY: &str = "gcs_bucket";
/// Required trigger keys in the order they are reported.
pub const REQUIRED_FIELDS: [&str; 3] = [SOURCE_BUCKET_KEY, SOURCE_PREFIX_KEY, DESTINATION_BUCKET_KEY];

/// Raw configuration supplied when a run is triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration(Value);

impl RunConfiguration {
    /// Parse configuration text. Blank input yields a `null` configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not valid JSON.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self(Value::Null));
        }
        serde_json::from_str(text)
            .map(Self)
            .map_err(|source| ConfigError::Parse { source })
    }

    /// Borrow the underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Parameters extracted from a run configuration that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedParameters {
    #[serde(rename = "s3_bucket")]
    source_bucket: String,
    #[serde(rename = "s3_object_prefix")]
    source_object_prefix: String,
    #[serde(rename = "gcs_bucket")]
    destination_bucket: String,
}

impl ValidatedParameters {
    pub(crate) const fn new(
        source_bucket: String,
        source_object_prefix: String,
        destination_bucket: String,
    ) -> Self {
        Self {
            source_bucket,
            source_object_prefix,
            destination_bucket,
        }
    }

    /// Bucket the objects are copied from.
    #[must_use]
    pub fn source_bucket(&self) -> &str {
        &self.source_bucket
    }

    /// Folder-style prefix selecting the objects to copy.
    #[must_use]
    pub fn source_object_prefix(&self) -> &str {
        &self.source_object_prefix
    }

    /// Bucket the objects are copied into.
    #[must_use]
    pub fn destination_bucket(&self) -> &str {
        &self.destination_bucket
    }

    /// Prefix written at the destination. There is no remapping: it is always
    /// the source prefix.
    #[must_use]
    pub fn destination_prefix(&self) -> &str {
        &self.source_object_prefix
    }
}

impl Display for ValidatedParameters {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{SOURCE_BUCKET_KEY}={} {SOURCE_PREFIX_KEY}={} {DESTINATION_BUCKET_KEY}={}",
            self.source_bucket, self.source_object_prefix, self.destination_bucket
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_text_parses_to_null_configuration() -> anyhow::Result<()> {
        let conf = RunConfiguration::from_json_str("   \n")?;
        assert_eq!(conf.as_value(), &Value::Null);
        Ok(())
    }

    #[test]
    fn invalid_text_is_a_parse_error() {
        let err = RunConfiguration::from_json_str("{\"s3_bucket\":").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn validated_parameters_serialise_with_trigger_keys() -> anyhow::Result<()> {
        let params = ValidatedParameters::new(
            "b1".to_string(),
            "raw/x/".to_string(),
            "b2".to_string(),
        );
        let value = serde_json::to_value(&params)?;
        assert_eq!(
            value,
            json!({"s3_bucket": "b1", "s3_object_prefix": "raw/x/", "gcs_bucket": "b2"})
        );
        assert_eq!(params.destination_prefix(), params.source_object_prefix());
        assert_eq!(
            params.to_string(),
            "s3_bucket=b1 s3_object_prefix=raw/x/ gcs_bucket=b2"
        );
        Ok(())
    }
}
