//! Transfer pipeline: echo, validate, bulk copy, list.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use relay_config::{ValidatedParameters, WorkflowSettings, validate_run_configuration};
use relay_events::{EventBus, RunEvent};
use relay_storage::{
    BulkCopy, ConnectionRef, CopyReport, CopyRequest, ListObjects, ListRequest, ObjectLocation,
};
use relay_telemetry::{Metrics, run_span};
use serde_json::Value;
use tracing::{Instrument, debug, error, info};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{RunFailure, RunReport, RunStatus, StageKind, StepRecord, StepStatus};
use crate::retry::{RetryPolicy, retry_with_policy};

/// Render the raw run configuration the way the echo stage emits it.
#[must_use]
pub fn render_configuration(conf: Option<&Value>) -> String {
    match conf {
        None | Some(Value::Null) => "conf: None".to_string(),
        Some(value) => format!("conf: {value}"),
    }
}

/// Runs transfer workflows against the configured collaborators.
///
/// Holds no per-run state; clones share collaborators, the event bus and
/// metrics, so independent runs may execute concurrently.
#[derive(Clone)]
pub struct TransferWorkflow {
    copier: Arc<dyn BulkCopy>,
    lister: Arc<dyn ListObjects>,
    events: EventBus,
    metrics: Metrics,
    settings: Arc<WorkflowSettings>,
}

struct RunState {
    run_id: Uuid,
    steps: Vec<StepRecord>,
    parameters: Option<ValidatedParameters>,
    copy: Option<CopyReport>,
    destination_objects: Vec<String>,
}

struct StageFailure {
    stage: StageKind,
    error: WorkflowError,
}

impl RunState {
    const fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            steps: Vec::new(),
            parameters: None,
            copy: None,
            destination_objects: Vec::new(),
        }
    }

    fn update_step(
        &mut self,
        stage: StageKind,
        status: StepStatus,
        attempts: u32,
        detail: Option<String>,
    ) {
        let updated_at = Utc::now();
        if let Some(record) = self.steps.iter_mut().find(|record| record.stage == stage) {
            record.status = status;
            record.attempts = attempts;
            record.detail = detail;
            record.updated_at = updated_at;
        } else {
            self.steps.push(StepRecord {
                stage,
                status,
                attempts,
                detail,
                updated_at,
            });
        }
    }

    fn has_step(&self, stage: StageKind) -> bool {
        self.steps.iter().any(|record| record.stage == stage)
    }
}

impl TransferWorkflow {
    /// Assemble a workflow from its collaborators.
    #[must_use]
    pub fn new(
        copier: Arc<dyn BulkCopy>,
        lister: Arc<dyn ListObjects>,
        events: EventBus,
        metrics: Metrics,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            copier,
            lister,
            events,
            metrics,
            settings: Arc::new(settings),
        }
    }

    /// Settings shared by every run.
    #[must_use]
    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Execute one run end to end. Failures never escape as errors: they are
    /// recorded in the returned report, which always carries a terminal status.
    pub async fn run(&self, conf: Option<&Value>) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = run_span(&run_id.to_string());
        self.execute_run(run_id, conf).instrument(span).await
    }

    async fn execute_run(&self, run_id: Uuid, conf: Option<&Value>) -> RunReport {
        let started_at = Utc::now();
        info!("transfer run started");
        self.publish_event(RunEvent::RunStarted { run_id });

        let mut state = RunState::new(run_id);
        let outcome = self.execute_pipeline(&mut state, conf).await;

        let failure = match outcome {
            Ok(()) => {
                info!(
                    objects = state.destination_objects.len(),
                    "transfer run succeeded"
                );
                self.metrics.inc_workflow_run(RunStatus::Succeeded.as_str());
                self.publish_event(RunEvent::RunSucceeded {
                    run_id,
                    objects: state.destination_objects.len(),
                });
                None
            }
            Err(StageFailure { stage, error }) => {
                let message = error.to_string();
                let kind = error.kind();
                error!(
                    stage = stage.as_str(),
                    kind = kind.as_str(),
                    error = %message,
                    "transfer run failed"
                );
                self.skip_remaining(&mut state);
                self.metrics.inc_workflow_run(RunStatus::Failed.as_str());
                self.publish_event(RunEvent::RunFailed {
                    run_id,
                    stage: stage.as_str().to_string(),
                    kind: kind.as_str().to_string(),
                    message: message.clone(),
                });
                Some(RunFailure {
                    stage,
                    kind,
                    message,
                })
            }
        };

        self.build_report(state, started_at, failure)
    }

    async fn execute_pipeline(
        &self,
        state: &mut RunState,
        conf: Option<&Value>,
    ) -> Result<(), StageFailure> {
        self.echo_config(state, conf).await?;
        let parameters = self.validate_params(state, conf).await?;
        state.parameters = Some(parameters.clone());
        let copy = self.bulk_copy(state, &parameters).await?;
        state.copy = Some(copy);
        state.destination_objects = self.list_destination(state, &parameters).await?;
        Ok(())
    }

    async fn echo_config(
        &self,
        state: &mut RunState,
        conf: Option<&Value>,
    ) -> Result<(), StageFailure> {
        let run_id = state.run_id;
        let rendered = self
            .execute_step(
                state,
                StageKind::EchoConfig,
                self.settings.retries.echo_config,
                move || async move { Ok::<_, WorkflowError>(render_configuration(conf)) },
                |_| None,
            )
            .await?;
        info!("{rendered}");
        self.publish_event(RunEvent::ConfigEchoed { run_id, rendered });
        Ok(())
    }

    async fn validate_params(
        &self,
        state: &mut RunState,
        conf: Option<&Value>,
    ) -> Result<ValidatedParameters, StageFailure> {
        let parameters = self
            .execute_step(
                state,
                StageKind::ValidateParams,
                self.settings.retries.validate_params,
                move || async move {
                    validate_run_configuration(conf).map_err(WorkflowError::from)
                },
                |parameters: &ValidatedParameters| Some(parameters.to_string()),
            )
            .await?;
        info!(%parameters, "validated run parameters");
        Ok(parameters)
    }

    async fn bulk_copy(
        &self,
        state: &mut RunState,
        parameters: &ValidatedParameters,
    ) -> Result<CopyReport, StageFailure> {
        let request = CopyRequest {
            source: ObjectLocation::new(
                parameters.source_bucket(),
                parameters.source_object_prefix(),
            ),
            source_connection: ConnectionRef::new(self.settings.source_connection.as_str()),
            destination: ObjectLocation::new(
                parameters.destination_bucket(),
                parameters.destination_prefix(),
            ),
            destination_connection: ConnectionRef::new(
                self.settings.destination_connection.as_str(),
            ),
            replace: true,
        };
        let request = &request;
        let copier = &self.copier;

        let report = self
            .execute_step(
                state,
                StageKind::BulkCopy,
                self.settings.retries.bulk_copy,
                move || async move {
                    copier
                        .copy_prefix(request)
                        .await
                        .map_err(|source| WorkflowError::Transfer { source })
                },
                |report: &CopyReport| {
                    Some(format!(
                        "copied {} objects, skipped {}",
                        report.copied.len(),
                        report.skipped.len()
                    ))
                },
            )
            .await?;
        self.metrics.add_objects_copied(report.copied.len());
        info!(
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            "bulk copy finished"
        );
        Ok(report)
    }

    async fn list_destination(
        &self,
        state: &mut RunState,
        parameters: &ValidatedParameters,
    ) -> Result<Vec<String>, StageFailure> {
        let request = ListRequest {
            location: ObjectLocation::new(
                parameters.destination_bucket(),
                parameters.destination_prefix(),
            ),
            connection: ConnectionRef::new(self.settings.destination_connection.as_str()),
        };
        let request = &request;
        let lister = &self.lister;

        let keys = self
            .execute_step(
                state,
                StageKind::ListDestination,
                self.settings.retries.list_destination,
                move || async move {
                    lister
                        .list_objects(request)
                        .await
                        .map_err(|source| WorkflowError::Verification { source })
                },
                |keys: &Vec<String>| Some(format!("{} objects at destination", keys.len())),
            )
            .await?;
        for key in &keys {
            debug!(key = %key, "destination object");
        }
        info!(
            objects = keys.len(),
            location = %request.location,
            "destination listing"
        );
        Ok(keys)
    }

    async fn execute_step<T, F, Fut, D>(
        &self,
        state: &mut RunState,
        stage: StageKind,
        max_retries: u32,
        op: F,
        describe: D,
    ) -> Result<T, StageFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = WorkflowResult<T>>,
        D: FnOnce(&T) -> Option<String>,
    {
        let run_id = state.run_id;
        self.record_step(state, stage, StepStatus::Started, 0, None);

        let policy = RetryPolicy::new(max_retries, self.settings.retry_base_delay);
        let outcome = retry_with_policy(
            policy,
            stage.as_str(),
            |attempt, err: &WorkflowError| {
                self.publish_event(RunEvent::StageRetrying {
                    run_id,
                    stage: stage.as_str().to_string(),
                    attempt,
                    message: err.to_string(),
                });
            },
            op,
        )
        .await;

        match outcome.result {
            Ok(value) => {
                let detail = describe(&value);
                self.record_step(
                    state,
                    stage,
                    StepStatus::Completed,
                    outcome.attempts,
                    detail,
                );
                Ok(value)
            }
            Err(error) => {
                self.record_step(
                    state,
                    stage,
                    StepStatus::Failed,
                    outcome.attempts,
                    Some(error.to_string()),
                );
                Err(StageFailure { stage, error })
            }
        }
    }

    fn record_step(
        &self,
        state: &mut RunState,
        stage: StageKind,
        status: StepStatus,
        attempts: u32,
        detail: Option<String>,
    ) {
        state.update_step(stage, status, attempts, detail);
        self.metrics
            .inc_workflow_step(stage.as_str(), status.as_str());
        self.publish_event(RunEvent::StageProgress {
            run_id: state.run_id,
            stage: stage.as_str().to_string(),
            status: status.as_str().to_string(),
        });
    }

    fn skip_remaining(&self, state: &mut RunState) {
        for stage in StageKind::ALL {
            if !state.has_step(stage) {
                self.record_step(state, stage, StepStatus::Skipped, 0, None);
            }
        }
    }

    fn publish_event(&self, event: RunEvent) {
        self.metrics.inc_event(event.kind());
        self.events.publish(event);
    }

    fn build_report(
        &self,
        state: RunState,
        started_at: DateTime<Utc>,
        failure: Option<RunFailure>,
    ) -> RunReport {
        let status = if failure.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
        debug!(
            steps = state.steps.len(),
            status = status.as_str(),
            connection = %self.settings.destination_connection,
            "run report assembled"
        );
        RunReport {
            run_id: state.run_id,
            status,
            started_at,
            finished_at: Utc::now(),
            parameters: state.parameters,
            copy: state.copy,
            destination_objects: state.destination_objects,
            steps: state.steps,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configuration_renders_for_echo() {
        assert_eq!(render_configuration(None), "conf: None");
        assert_eq!(render_configuration(Some(&Value::Null)), "conf: None");
        assert_eq!(render_configuration(Some(&json!({}))), "conf: {}");
        assert_eq!(
            render_configuration(Some(&json!({"s3_bucket": "b1"}))),
            r#"conf: {"s3_bucket":"b1"}"#
        );
    }

    #[test]
    fn step_updates_replace_existing_records() {
        let mut state = RunState::new(Uuid::nil());
        state.update_step(StageKind::BulkCopy, StepStatus::Started, 0, None);
        state.update_step(
            StageKind::BulkCopy,
            StepStatus::Completed,
            1,
            Some("copied 2 objects, skipped 0".to_string()),
        );
        assert_eq!(state.steps.len(), 1);
        assert_eq!(state.steps[0].status, StepStatus::Completed);
        assert_eq!(state.steps[0].attempts, 1);
        assert!(state.has_step(StageKind::BulkCopy));
        assert!(!state.has_step(StageKind::ListDestination));
    }
}
