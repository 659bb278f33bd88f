//! Run reports and per-stage step records.

use chrono::{DateTime, Utc};
use relay_config::ValidatedParameters;
use relay_storage::CopyReport;
use serde::Serialize;
use uuid::Uuid;

use crate::error::FailureKind;

/// The four stages of a transfer run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Emit the raw run configuration.
    EchoConfig,
    /// Extract and check the required parameters.
    ValidateParams,
    /// Invoke the bulk copy capability.
    BulkCopy,
    /// List the destination prefix.
    ListDestination,
}

impl StageKind {
    /// Every stage, in execution order.
    pub const ALL: [Self; 4] = [
        Self::EchoConfig,
        Self::ValidateParams,
        Self::BulkCopy,
        Self::ListDestination,
    ];

    /// Stable label for logs, events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EchoConfig => "echo_config",
            Self::ValidateParams => "validate_params",
            Self::BulkCopy => "bulk_copy",
            Self::ListDestination => "list_destination",
        }
    }
}

/// Lifecycle of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The stage is running.
    Started,
    /// The stage finished successfully.
    Completed,
    /// The stage failed and ended the run.
    Failed,
    /// An earlier stage failed; this one never started.
    Skipped,
}

impl StepStatus {
    /// Stable label for logs, events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Recorded state of one stage within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Stage the record describes.
    pub stage: StageKind,
    /// Latest status.
    pub status: StepStatus,
    /// Attempts made; zero for skipped stages.
    pub attempts: u32,
    /// Human-readable outcome detail.
    pub detail: Option<String>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All four stages completed.
    Succeeded,
    /// A stage failed; later stages were skipped.
    Failed,
}

impl RunStatus {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// The first failure of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    /// Stage that failed.
    pub stage: StageKind,
    /// Failure class.
    pub kind: FailureKind,
    /// Error text, including upstream detail.
    pub message: String,
}

/// Terminal record of a single run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Identifier shared by the run's logs and events.
    pub run_id: Uuid,
    /// Terminal status.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached its terminal status.
    pub finished_at: DateTime<Utc>,
    /// Parameters that passed validation, if validation was reached and passed.
    pub parameters: Option<ValidatedParameters>,
    /// Keys written or skipped by the bulk copy.
    pub copy: Option<CopyReport>,
    /// Keys found under the destination prefix after the copy.
    pub destination_objects: Vec<String>,
    /// One record per stage, in execution order.
    pub steps: Vec<StepRecord>,
    /// The failure that ended the run, when it failed.
    pub failure: Option<RunFailure>,
}

impl RunReport {
    /// Whether every stage completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Record for `stage`, if one was made.
    #[must_use]
    pub fn step(&self, stage: StageKind) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.stage == stage)
    }
}
