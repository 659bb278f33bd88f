//! Argument parsing and command dispatch for the relay CLI.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand, ValueEnum};
use relay_config::defaults::{
    BULK_COPY_RETRIES, DESTINATION_CONNECTION_ID, ECHO_CONFIG_RETRIES, LIST_DESTINATION_RETRIES,
    SOURCE_CONNECTION_ID, VALIDATE_PARAMS_RETRIES,
};
use relay_config::{RunConfiguration, StageRetries, WorkflowSettings, validate_run_configuration};
use relay_events::EventBus;
use relay_storage::{LocalStore, StoreLister, StoreTransfer};
use relay_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, Metrics, init_logging};
use relay_workflow::{FailureKind, RunReport, TransferWorkflow, render_configuration};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::output::{render_parameters, render_report};

const STDIN_MARKER: &str = "-";
const BUILD_SHA: &str = match option_env!("RELAY_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: BUILD_SHA,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Run(args) => handle_run(args, cli.output).await,
        Command::Validate(args) => handle_validate(&args, cli.output),
    }
}

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Copy a bucket prefix between object stores and verify it landed"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "RELAY_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(
        long,
        global = true,
        env = "RELAY_LOG_FORMAT",
        value_parser = parse_log_format,
        help = "Log output format: json or pretty (defaults by build profile)"
    )]
    log_format: Option<LogFormat>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for reports"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full transfer workflow.
    Run(RunArgs),
    /// Echo and validate a run configuration without touching storage.
    Validate(ConfArgs),
}

#[derive(Args)]
struct ConfArgs {
    #[arg(long, conflicts_with = "conf_file", help = "Run configuration as inline JSON")]
    conf: Option<String>,
    #[arg(
        long = "conf-file",
        help = "Path to a JSON run configuration, or '-' to read standard input"
    )]
    conf_file: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    conf: ConfArgs,
    #[arg(
        long,
        env = "RELAY_SOURCE_ROOT",
        help = "Directory holding source buckets"
    )]
    source_root: PathBuf,
    #[arg(
        long,
        env = "RELAY_DESTINATION_ROOT",
        help = "Directory holding destination buckets"
    )]
    destination_root: PathBuf,
    #[arg(long, env = "RELAY_SOURCE_CONN_ID", default_value = SOURCE_CONNECTION_ID)]
    source_conn_id: String,
    #[arg(
        long,
        env = "RELAY_DESTINATION_CONN_ID",
        default_value = DESTINATION_CONNECTION_ID
    )]
    destination_conn_id: String,
    #[command(flatten)]
    retries: RetryArgs,
    #[arg(long, help = "Write Prometheus metrics to this file after the run")]
    metrics_file: Option<PathBuf>,
}

/// Retries allowed per stage after the first attempt.
#[derive(Args)]
struct RetryArgs {
    #[arg(long, env = "RELAY_ECHO_RETRIES", default_value_t = ECHO_CONFIG_RETRIES)]
    echo_retries: u32,
    #[arg(long, env = "RELAY_VALIDATE_RETRIES", default_value_t = VALIDATE_PARAMS_RETRIES)]
    validate_retries: u32,
    #[arg(long, env = "RELAY_COPY_RETRIES", default_value_t = BULK_COPY_RETRIES)]
    copy_retries: u32,
    #[arg(long, env = "RELAY_LIST_RETRIES", default_value_t = LIST_DESTINATION_RETRIES)]
    list_retries: u32,
}

impl RetryArgs {
    const fn stage_retries(&self) -> StageRetries {
        StageRetries {
            echo_config: self.echo_retries,
            validate_params: self.validate_retries,
            bulk_copy: self.copy_retries,
            list_destination: self.list_retries,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse::<LogFormat>().map_err(|err| err.to_string())
}

async fn handle_run(args: RunArgs, output: OutputFormat) -> CliResult<()> {
    let conf = load_configuration(&args.conf)?;
    let metrics = Metrics::new()
        .map_err(|err| CliError::failure(anyhow!("failed to initialise metrics: {err}")))?;

    let source = Arc::new(LocalStore::new("s3", &args.source_root));
    let destination = Arc::new(LocalStore::new("gs", &args.destination_root));
    let settings = WorkflowSettings::default()
        .with_source_connection(args.source_conn_id)
        .with_destination_connection(args.destination_conn_id)
        .with_retries(args.retries.stage_retries());
    let events = EventBus::new();
    let watcher = watch_events(&events);
    let workflow = TransferWorkflow::new(
        Arc::new(StoreTransfer::new(source, destination.clone())),
        Arc::new(StoreLister::new(destination)),
        events.clone(),
        metrics.clone(),
        settings,
    );

    let report = workflow
        .run(conf.as_ref().map(RunConfiguration::as_value))
        .await;
    if let Err(err) = watcher.await {
        warn!(error = %err, "event watcher stopped unexpectedly");
    }
    debug!(
        events = events.replay_run(report.run_id).len(),
        last_event_id = ?events.last_event_id(),
        "run events recorded"
    );
    render_report(&report, output)?;

    if let Some(path) = &args.metrics_file {
        write_metrics(&metrics, path)?;
    }

    report_outcome(&report)
}

fn watch_events(events: &EventBus) -> JoinHandle<()> {
    let mut stream = events.subscribe(None);
    tokio::spawn(async move {
        while let Some(envelope) = stream.next().await {
            debug!(
                id = envelope.id,
                kind = envelope.event.kind(),
                at = %envelope.timestamp,
                "run event"
            );
            if envelope.event.is_terminal() {
                break;
            }
        }
    })
}

fn handle_validate(args: &ConfArgs, output: OutputFormat) -> CliResult<()> {
    let conf = load_configuration(args)?;
    let conf = conf.as_ref().map(RunConfiguration::as_value);
    let rendered = render_configuration(conf);
    info!("{rendered}");
    if output == OutputFormat::Table {
        println!("{rendered}");
    }
    let parameters = validate_run_configuration(conf)
        .map_err(|err| CliError::validation(err.to_string()))?;
    render_parameters(&parameters, output)
}

fn load_configuration(args: &ConfArgs) -> CliResult<Option<RunConfiguration>> {
    let text = match (&args.conf, &args.conf_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) if path.as_os_str() == STDIN_MARKER => io::read_to_string(io::stdin())
            .map_err(|err| CliError::failure(anyhow!("failed to read standard input: {err}")))?,
        (None, Some(path)) => fs::read_to_string(path).map_err(|err| {
            CliError::failure(anyhow!("failed to read {}: {err}", path.display()))
        })?,
        (None, None) => {
            warn!("no run configuration supplied");
            return Ok(None);
        }
    };

    RunConfiguration::from_json_str(&text)
        .map(Some)
        .map_err(|err| CliError::validation(err.to_string()))
}

fn write_metrics(metrics: &Metrics, path: &Path) -> CliResult<()> {
    metrics
        .write_textfile(path)
        .map_err(|err| CliError::failure(anyhow!("{err} ({})", path.display())))
}

fn report_outcome(report: &RunReport) -> CliResult<()> {
    match &report.failure {
        None => Ok(()),
        Some(failure) if failure.kind == FailureKind::ConfigurationError => Err(
            CliError::validation(format!("{}: {}", failure.stage.as_str(), failure.message)),
        ),
        Some(failure) => Err(CliError::failure(anyhow!(
            "{} ({}): {}",
            failure.stage.as_str(),
            failure.kind.as_str(),
            failure.message
        ))),
    }
}

#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relay_workflow::{RunFailure, RunStatus, StageKind};
    use serde_json::json;
    use std::error::Error;
    use uuid::Uuid;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("relay").chain(args.iter().copied()))
    }

    fn report_with(failure: Option<RunFailure>) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: Uuid::nil(),
            status: if failure.is_some() {
                RunStatus::Failed
            } else {
                RunStatus::Succeeded
            },
            started_at: now,
            finished_at: now,
            parameters: None,
            copy: None,
            destination_objects: Vec::new(),
            steps: Vec::new(),
            failure,
        }
    }

    #[test]
    fn run_command_parses_roots_and_defaults() -> Result<(), Box<dyn Error>> {
        let cli = parse(&[
            "run",
            "--conf",
            r#"{"s3_bucket":"b1"}"#,
            "--source-root",
            "/data/s3",
            "--destination-root",
            "/data/gcs",
            "--output",
            "json",
            "--log-format",
            "json",
        ])?;
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        let Command::Run(args) = cli.command else {
            return Err("expected run command".into());
        };
        assert_eq!(args.source_root, PathBuf::from("/data/s3"));
        assert_eq!(args.destination_root, PathBuf::from("/data/gcs"));
        assert_eq!(args.conf.conf.as_deref(), Some(r#"{"s3_bucket":"b1"}"#));
        assert!(args.metrics_file.is_none());
        assert_eq!(args.retries.stage_retries(), StageRetries::default());
        Ok(())
    }

    #[test]
    fn retry_flags_override_stage_budgets() -> Result<(), Box<dyn Error>> {
        let cli = parse(&[
            "run",
            "--source-root",
            "/data/s3",
            "--destination-root",
            "/data/gcs",
            "--copy-retries",
            "2",
            "--list-retries",
            "0",
        ])?;
        let Command::Run(args) = cli.command else {
            return Err("expected run command".into());
        };
        let retries = args.retries.stage_retries();
        assert_eq!(retries.bulk_copy, 2);
        assert_eq!(retries.list_destination, 0);
        assert_eq!(retries.echo_config, ECHO_CONFIG_RETRIES);
        assert_eq!(retries.validate_params, VALIDATE_PARAMS_RETRIES);
        Ok(())
    }

    #[test]
    fn conflicting_or_unknown_arguments_are_rejected() {
        assert!(parse(&["validate", "--conf", "{}", "--conf-file", "conf.json"]).is_err());
        assert!(parse(&["validate", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn configuration_loads_from_inline_text_and_files() -> Result<(), Box<dyn Error>> {
        let inline = ConfArgs {
            conf: Some(r#"{"s3_bucket":"b1"}"#.to_string()),
            conf_file: None,
        };
        let loaded = load_configuration(&inline).map_err(|err| err.display_message())?;
        assert_eq!(
            loaded.as_ref().map(RunConfiguration::as_value),
            Some(&json!({"s3_bucket": "b1"}))
        );

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("conf.json");
        fs::write(&path, r#"{"gcs_bucket":"b2"}"#)?;
        let from_file = ConfArgs {
            conf: None,
            conf_file: Some(path),
        };
        let loaded = load_configuration(&from_file).map_err(|err| err.display_message())?;
        assert_eq!(
            loaded.as_ref().map(RunConfiguration::as_value),
            Some(&json!({"gcs_bucket": "b2"}))
        );

        let absent = ConfArgs {
            conf: None,
            conf_file: None,
        };
        assert_eq!(
            load_configuration(&absent).map_err(|err| err.display_message())?,
            None
        );
        Ok(())
    }

    #[test]
    fn configuration_errors_map_to_exit_codes() {
        let malformed = ConfArgs {
            conf: Some("{not json".to_string()),
            conf_file: None,
        };
        assert!(matches!(
            load_configuration(&malformed).map_err(|err| err.exit_code()),
            Err(2)
        ));

        let missing_file = ConfArgs {
            conf: None,
            conf_file: Some(PathBuf::from("/nonexistent/relay/conf.json")),
        };
        assert!(matches!(
            load_configuration(&missing_file).map_err(|err| err.exit_code()),
            Err(3)
        ));
    }

    #[test]
    fn report_outcome_distinguishes_configuration_failures() {
        assert!(report_outcome(&report_with(None)).is_ok());

        let config = report_outcome(&report_with(Some(RunFailure {
            stage: StageKind::ValidateParams,
            kind: FailureKind::ConfigurationError,
            message: "config missing".to_string(),
        })));
        assert!(matches!(config.map_err(|err| err.exit_code()), Err(2)));

        let transfer = report_outcome(&report_with(Some(RunFailure {
            stage: StageKind::BulkCopy,
            kind: FailureKind::TransferError,
            message: "transfer failed: bucket 'b2' not found".to_string(),
        })));
        let err = match transfer {
            Ok(()) => panic!("expected transfer failure"),
            Err(err) => err,
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("bulk_copy (transfer_error)"));
    }

    #[tokio::test]
    async fn run_command_copies_between_directories() -> Result<(), Box<dyn Error>> {
        let source = tempfile::tempdir()?;
        let destination = tempfile::tempdir()?;
        fs::create_dir_all(source.path().join("b1/raw/x"))?;
        fs::write(source.path().join("b1/raw/x/a.csv"), "a")?;
        fs::create_dir_all(destination.path().join("b2"))?;
        let metrics_path = destination.path().join("relay.prom");

        let args = RunArgs {
            conf: ConfArgs {
                conf: Some(
                    json!({"s3_bucket": "b1", "s3_object_prefix": "raw/x/", "gcs_bucket": "b2"})
                        .to_string(),
                ),
                conf_file: None,
            },
            source_root: source.path().to_path_buf(),
            destination_root: destination.path().to_path_buf(),
            source_conn_id: SOURCE_CONNECTION_ID.to_string(),
            destination_conn_id: DESTINATION_CONNECTION_ID.to_string(),
            retries: RetryArgs {
                echo_retries: 0,
                validate_retries: 0,
                copy_retries: 0,
                list_retries: 0,
            },
            metrics_file: Some(metrics_path.clone()),
        };
        handle_run(args, OutputFormat::Json)
            .await
            .map_err(|err| err.display_message())?;

        assert_eq!(
            fs::read_to_string(destination.path().join("b2/raw/x/a.csv"))?,
            "a"
        );
        assert!(fs::read_to_string(metrics_path)?.contains("objects_copied_total 1"));
        Ok(())
    }
}
