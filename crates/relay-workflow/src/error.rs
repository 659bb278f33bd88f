//! # Design
//!
//! - Three failure classes, one per failing stage family.
//! - Upstream text is kept in the message so the terminal status carries it.

use relay_config::ConfigError;
use relay_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::Retryable;

/// Result type for workflow stages.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that terminate a run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The run configuration was absent or incomplete.
    #[error("configuration error: {source}")]
    Configuration {
        /// Validation failure.
        #[from]
        source: ConfigError,
    },
    /// The bulk copy capability failed.
    #[error("transfer failed: {source}")]
    Transfer {
        /// Upstream storage failure.
        source: StorageError,
    },
    /// Listing the destination failed.
    #[error("destination verification failed: {source}")]
    Verification {
        /// Upstream storage failure.
        source: StorageError,
    },
}

impl WorkflowError {
    /// Failure class reported in the run's terminal status.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration { .. } => FailureKind::ConfigurationError,
            Self::Transfer { .. } => FailureKind::TransferError,
            Self::Verification { .. } => FailureKind::VerificationError,
        }
    }
}

impl Retryable for WorkflowError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration { source } => source.is_retryable(),
            Self::Transfer { source } => source.is_transient(),
            Self::Verification { .. } => true,
        }
    }
}

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing or invalid run configuration; never retried.
    ConfigurationError,
    /// The bulk copy failed.
    TransferError,
    /// The destination listing failed.
    VerificationError,
}

impl FailureKind {
    /// Stable label for logs, events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::TransferError => "transfer_error",
            Self::VerificationError => "verification_error",
        }
    }
}
