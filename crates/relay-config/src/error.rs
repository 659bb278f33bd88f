//! Error types for run configuration handling.
//!
//! # Design
//! - Every variant describes a caller mistake; none of them can be fixed by retrying.
//! - Messages name the offending fields so a failed run explains itself.

use thiserror::Error;

/// Primary error type for run configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The run was triggered without any configuration (absent, `null`, or `{}`).
    #[error("config missing. please trigger the run with a configuration object")]
    Missing,
    /// The configuration was present but was not a JSON object.
    #[error("run configuration must be a JSON object, found {kind}")]
    NotAMapping {
        /// JSON kind that was supplied instead of an object.
        kind: &'static str,
    },
    /// One or more of the required fields were absent.
    #[error(
        "one or more of the following required params missing: s3_bucket, s3_object_prefix, gcs_bucket (missing: {})",
        .missing.join(", ")
    )]
    MissingFields {
        /// Required fields that were absent or blank.
        missing: Vec<&'static str>,
    },
    /// A field was present but carried an unusable value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The configuration text could not be parsed as JSON.
    #[error("failed to parse run configuration: {source}")]
    Parse {
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Configuration errors are structural and never resolved by a retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn missing_fields_message_names_every_required_field() {
        let err = ConfigError::MissingFields {
            missing: vec!["s3_object_prefix"],
        };
        let message = err.to_string();
        for field in ["s3_bucket", "s3_object_prefix", "gcs_bucket"] {
            assert!(message.contains(field), "{message} should name {field}");
        }
        assert!(message.ends_with("(missing: s3_object_prefix)"));
    }

    #[test]
    fn config_errors_are_never_retryable() {
        let cases = [
            ConfigError::Missing,
            ConfigError::NotAMapping { kind: "array" },
            ConfigError::MissingFields {
                missing: vec!["gcs_bucket"],
            },
            ConfigError::InvalidField {
                field: "s3_bucket",
                reason: "must be a string",
                value: Some("42".to_string()),
            },
        ];
        for err in cases {
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn parse_error_preserves_source() {
        let Err(source) = serde_json::from_str::<serde_json::Value>("{") else {
            panic!("expected invalid json");
        };
        let err = ConfigError::Parse { source };
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("failed to parse run configuration"));
    }
}
