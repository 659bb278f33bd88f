use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sequence number assigned by the bus, starting at 1.
pub type EventId = u64;

/// Progress notifications emitted while a run executes.
///
/// Stage, status and failure kinds travel as their stable string labels so
/// consumers do not depend on the workflow crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run was triggered.
    RunStarted {
        /// Run identifier.
        run_id: Uuid,
    },
    /// The raw configuration was echoed.
    ConfigEchoed {
        /// Run identifier.
        run_id: Uuid,
        /// `conf: <json>` or `conf: None`.
        rendered: String,
    },
    /// A stage changed status.
    StageProgress {
        /// Run identifier.
        run_id: Uuid,
        /// Stage label, e.g. `bulk_copy`.
        stage: String,
        /// Status label, e.g. `completed`.
        status: String,
    },
    /// A stage attempt failed and will be retried.
    StageRetrying {
        /// Run identifier.
        run_id: Uuid,
        /// Stage label.
        stage: String,
        /// One-based number of the attempt that failed.
        attempt: u32,
        /// Error text of the failed attempt.
        message: String,
    },
    /// Every stage completed.
    RunSucceeded {
        /// Run identifier.
        run_id: Uuid,
        /// Objects found at the destination.
        objects: usize,
    },
    /// A stage failed and the run terminated.
    RunFailed {
        /// Run identifier.
        run_id: Uuid,
        /// Stage label.
        stage: String,
        /// Failure kind label.
        kind: String,
        /// Error text.
        message: String,
    },
}

impl RunEvent {
    /// Event type label, identical to the serialized `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::ConfigEchoed { .. } => "config_echoed",
            Self::StageProgress { .. } => "stage_progress",
            Self::StageRetrying { .. } => "stage_retrying",
            Self::RunSucceeded { .. } => "run_succeeded",
            Self::RunFailed { .. } => "run_failed",
        }
    }

    /// Run the event belongs to.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id }
            | Self::ConfigEchoed { run_id, .. }
            | Self::StageProgress { run_id, .. }
            | Self::StageRetrying { run_id, .. }
            | Self::RunSucceeded { run_id, .. }
            | Self::RunFailed { run_id, .. } => *run_id,
        }
    }

    /// Whether this event ends its run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::RunSucceeded { .. } | Self::RunFailed { .. })
    }
}

/// A published event with its sequence number and publication time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Sequence number assigned by the bus.
    pub id: EventId,
    /// When the event was published.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    pub event: RunEvent,
}
