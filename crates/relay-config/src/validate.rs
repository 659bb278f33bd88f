//! Validation boundary turning an untyped run configuration into typed parameters.

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    DESTINATION_BUCKET_KEY, REQUIRED_FIELDS, SOURCE_BUCKET_KEY, SOURCE_PREFIX_KEY,
    ValidatedParameters,
};

const PREFIX_DELIMITER: char = '/';

/// Validate the configuration supplied for the current run.
///
/// An absent configuration, JSON `null`, and an empty object are all treated
/// as "no configuration".
///
/// # Errors
///
/// Returns a [`ConfigError`] when the configuration is missing, is not an
/// object, lacks any required field, or carries an unusable value. None of
/// these errors are retryable.
pub fn validate_run_configuration(conf: Option<&Value>) -> ConfigResult<ValidatedParameters> {
    let map = match conf {
        None | Some(Value::Null) => return Err(ConfigError::Missing),
        Some(Value::Object(map)) if map.is_empty() => return Err(ConfigError::Missing),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ConfigError::NotAMapping {
                kind: json_kind(other),
            });
        }
    };

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| is_absent(map.get(*field)))
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::MissingFields { missing });
    }

    let source_bucket = required_string(map, SOURCE_BUCKET_KEY)?;
    let source_object_prefix = required_string(map, SOURCE_PREFIX_KEY)?;
    let destination_bucket = required_string(map, DESTINATION_BUCKET_KEY)?;

    if !source_object_prefix.ends_with(PREFIX_DELIMITER) {
        return Err(ConfigError::InvalidField {
            field: SOURCE_PREFIX_KEY,
            reason: "must be a folder-style prefix ending in '/'",
            value: Some(source_object_prefix),
        });
    }

    Ok(ValidatedParameters::new(
        source_bucket,
        source_object_prefix,
        destination_bucket,
    ))
}

/// A missing key, `null` and blank text all count as absent.
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

/// Read a field already known to be present, rejecting non-string values.
fn required_string(map: &Map<String, Value>, field: &'static str) -> ConfigResult<String> {
    match map.get(field) {
        Some(Value::String(text)) => Ok(text.clone()),
        other => Err(ConfigError::InvalidField {
            field,
            reason: "must be a string",
            value: other.map(Value::to_string),
        }),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
