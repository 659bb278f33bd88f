//! Run counters exposed in the Prometheus text format.

use std::path::Path;
use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Shared handle to the relay counters. Cloning shares the registry.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Counters>,
}

struct Counters {
    registry: Registry,
    steps: IntCounterVec,
    runs: IntCounterVec,
    events: IntCounterVec,
    objects_copied: IntCounter,
}

/// Run totals read back from the registry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Runs that finished with every stage completed.
    pub runs_succeeded: u64,
    /// Runs that terminated with a failure.
    pub runs_failed: u64,
    /// Objects reported as copied by the bulk copy stage.
    pub objects_copied: u64,
}

fn registered<C>(registry: &Registry, name: &'static str, built: prometheus::Result<C>) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    let collector = built.map_err(|source| TelemetryError::Collector { name, source })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Collector { name, source })?;
    Ok(collector)
}

impl Metrics {
    /// Create a private registry holding the relay counters.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Collector`] when a counter cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let steps = registered(
            &registry,
            "workflow_steps_total",
            IntCounterVec::new(
                Opts::new("workflow_steps_total", "Stage transitions by stage and status"),
                &["step", "status"],
            ),
        )?;
        let runs = registered(
            &registry,
            "workflow_runs_total",
            IntCounterVec::new(
                Opts::new("workflow_runs_total", "Finished runs by outcome"),
                &["status"],
            ),
        )?;
        let events = registered(
            &registry,
            "events_emitted_total",
            IntCounterVec::new(
                Opts::new("events_emitted_total", "Published run events by type"),
                &["type"],
            ),
        )?;
        let objects_copied = registered(
            &registry,
            "objects_copied_total",
            IntCounter::new("objects_copied_total", "Objects written by bulk copies"),
        )?;

        Ok(Self {
            inner: Arc::new(Counters {
                registry,
                steps,
                runs,
                events,
                objects_copied,
            }),
        })
    }

    /// Count one stage transition.
    pub fn inc_workflow_step(&self, step: &str, status: &str) {
        self.inner.steps.with_label_values(&[step, status]).inc();
    }

    /// Count one finished run under `status` (`succeeded` or `failed`).
    pub fn inc_workflow_run(&self, status: &str) {
        self.inner.runs.with_label_values(&[status]).inc();
    }

    /// Count one published event.
    pub fn inc_event(&self, event_type: &str) {
        self.inner.events.with_label_values(&[event_type]).inc();
    }

    /// Add `count` copied objects.
    pub fn add_objects_copied(&self, count: usize) {
        self.inner
            .objects_copied
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Encode every counter in the text exposition format.
    ///
    /// # Errors
    ///
    /// Fails when encoding fails or yields invalid UTF-8.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|source| TelemetryError::Encode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::Utf8 { source })
    }

    /// Write [`Self::render`] output to `path`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Fails when rendering fails or the file cannot be written.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        std::fs::write(path, rendered).map_err(|source| TelemetryError::Textfile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Current run totals.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let runs = &self.inner.runs;
        MetricsSnapshot {
            runs_succeeded: runs.with_label_values(&["succeeded"]).get(),
            runs_failed: runs.with_label_values(&["failed"]).get(),
            objects_copied: self.inner.objects_copied.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    type TestResult = std::result::Result<(), Box<dyn Error>>;

    #[test]
    fn counters_accumulate_into_snapshot_and_rendering() -> TestResult {
        let metrics = Metrics::new()?;
        metrics.inc_workflow_step("bulk_copy", "completed");
        metrics.inc_workflow_run("succeeded");
        metrics.inc_workflow_run("failed");
        metrics.inc_workflow_run("failed");
        metrics.inc_event("run_started");
        metrics.add_objects_copied(3);

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                runs_succeeded: 1,
                runs_failed: 2,
                objects_copied: 3,
            }
        );

        let text = metrics.render()?;
        assert!(text.contains(r#"step="bulk_copy""#));
        assert!(text.contains(r#"events_emitted_total{type="run_started"} 1"#));
        assert!(text.contains("objects_copied_total 3"));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> TestResult {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.add_objects_copied(5);
        assert_eq!(second.snapshot().objects_copied, 0);
        assert_eq!(first.clone().snapshot().objects_copied, 5);
        Ok(())
    }

    #[test]
    fn textfile_is_written_or_reports_its_path() -> TestResult {
        let metrics = Metrics::new()?;
        metrics.inc_workflow_run("succeeded");
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("relay.prom");
        metrics.write_textfile(&path)?;
        assert!(std::fs::read_to_string(&path)?.contains("workflow_runs_total"));

        let unreachable = temp.path().join("missing").join("relay.prom");
        match metrics.write_textfile(&unreachable) {
            Err(TelemetryError::Textfile { path, .. }) => assert_eq!(path, unreachable),
            other => panic!("expected textfile error, got {other:?}"),
        }
        Ok(())
    }
}
