//! Output renderers for run reports and validated parameters.

use std::fmt::Write as _;

use anyhow::anyhow;
use relay_config::ValidatedParameters;
use relay_workflow::RunReport;
use serde::Serialize;

use crate::cli::{CliError, CliResult, OutputFormat};

pub(crate) fn render_report(report: &RunReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(report)?),
        OutputFormat::Table => print!("{}", format_report_table(report)),
    }
    Ok(())
}

pub(crate) fn render_parameters(
    parameters: &ValidatedParameters,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(parameters)?),
        OutputFormat::Table => {
            println!("s3_bucket: {}", parameters.source_bucket());
            println!("s3_object_prefix: {}", parameters.source_object_prefix());
            println!("gcs_bucket: {}", parameters.destination_bucket());
        }
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

fn format_report_table(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "run: {}", report.run_id);
    let _ = writeln!(out, "status: {}", report.status.as_str());
    if let Some(parameters) = &report.parameters {
        let _ = writeln!(out, "parameters: {parameters}");
    }
    let _ = writeln!(out, "{:<18} {:<10} {:>8} DETAIL", "STAGE", "STATUS", "ATTEMPTS");
    for step in &report.steps {
        let _ = writeln!(
            out,
            "{:<18} {:<10} {:>8} {}",
            step.stage.as_str(),
            step.status.as_str(),
            step.attempts,
            step.detail.as_deref().unwrap_or("-")
        );
    }
    if let Some(failure) = &report.failure {
        let _ = writeln!(
            out,
            "failure: {} {}: {}",
            failure.stage.as_str(),
            failure.kind.as_str(),
            failure.message
        );
    }
    if report.failure.is_none() || !report.destination_objects.is_empty() {
        let _ = writeln!(
            out,
            "destination objects ({}):",
            report.destination_objects.len()
        );
        for key in &report.destination_objects {
            let _ = writeln!(out, "  {key}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relay_workflow::{
        FailureKind, RunFailure, RunStatus, StageKind, StepRecord, StepStatus,
    };
    use uuid::Uuid;

    fn step(stage: StageKind, status: StepStatus, attempts: u32, detail: Option<&str>) -> StepRecord {
        StepRecord {
            stage,
            status,
            attempts,
            detail: detail.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn table_lists_steps_and_objects() {
        let now = Utc::now();
        let report = RunReport {
            run_id: Uuid::nil(),
            status: RunStatus::Succeeded,
            started_at: now,
            finished_at: now,
            parameters: None,
            copy: None,
            destination_objects: vec!["raw/x/a.csv".to_string()],
            steps: vec![
                step(StageKind::EchoConfig, StepStatus::Completed, 1, None),
                step(
                    StageKind::ListDestination,
                    StepStatus::Completed,
                    2,
                    Some("1 objects at destination"),
                ),
            ],
            failure: None,
        };
        let table = format_report_table(&report);
        assert!(table.contains("status: succeeded"));
        assert!(table.contains("echo_config"));
        assert!(table.contains("1 objects at destination"));
        assert!(table.contains("destination objects (1):"));
        assert!(table.contains("  raw/x/a.csv"));
    }

    #[test]
    fn table_reports_failures_without_empty_listing() {
        let now = Utc::now();
        let report = RunReport {
            run_id: Uuid::nil(),
            status: RunStatus::Failed,
            started_at: now,
            finished_at: now,
            parameters: None,
            copy: None,
            destination_objects: Vec::new(),
            steps: vec![step(StageKind::BulkCopy, StepStatus::Skipped, 0, None)],
            failure: Some(RunFailure {
                stage: StageKind::ValidateParams,
                kind: FailureKind::ConfigurationError,
                message: "configuration error: config missing".to_string(),
            }),
        };
        let table = format_report_table(&report);
        assert!(table.contains("failure: validate_params configuration_error"));
        assert!(table.contains("skipped"));
        assert!(!table.contains("destination objects"));
    }
}
