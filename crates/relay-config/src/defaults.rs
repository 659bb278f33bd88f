//! Default connection references and retry budgets for workflow stages.
//!
//! # Design
//! - Centralize defaults so the CLI and tests agree on them.
//! - Retry budgets count retries after the first attempt.

use std::time::Duration;

/// Connection reference used for the source object store.
pub const SOURCE_CONNECTION_ID: &str = "aws_default";
/// Connection reference used for the destination object store.
pub const DESTINATION_CONNECTION_ID: &str = "google_cloud_default";

/// Retries allowed for the configuration echo stage.
pub const ECHO_CONFIG_RETRIES: u32 = 3;
/// Retries allowed for the parameter validator (transient failures only).
pub const VALIDATE_PARAMS_RETRIES: u32 = 1;
/// Retries allowed for the bulk copy stage.
pub const BULK_COPY_RETRIES: u32 = 0;
/// Retries allowed for the destination listing stage.
pub const LIST_DESTINATION_RETRIES: u32 = 1;

/// Base delay between retry attempts; doubled per attempt.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
