//! # Design
//!
//! - One variant per telemetry concern; metric failures name the collector.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failures raised while installing logging or handling metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    #[error("tracing subscriber already installed")]
    Subscriber {
        /// Error returned by `try_init`.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A collector could not be created or added to the registry.
    #[error("metric collector '{name}' rejected")]
    Collector {
        /// Metric name.
        name: &'static str,
        /// Prometheus error.
        source: prometheus::Error,
    },
    /// The registry could not be encoded.
    #[error("metrics encoding failed")]
    Encode {
        /// Prometheus error.
        source: prometheus::Error,
    },
    /// The encoder produced bytes that are not UTF-8.
    #[error("encoded metrics are not utf-8")]
    Utf8 {
        /// Conversion error.
        source: std::string::FromUtf8Error,
    },
    /// The metrics textfile could not be written.
    #[error("metrics textfile {} not written", .path.display())]
    Textfile {
        /// Target path.
        path: PathBuf,
        /// IO error.
        source: std::io::Error,
    },
    /// A log format name was not recognised.
    #[error("unknown log format '{value}' (expected json or pretty)")]
    UnknownLogFormat {
        /// Value that failed to parse.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn messages_name_the_failing_piece() {
        let collector = TelemetryError::Collector {
            name: "objects_copied_total",
            source: prometheus::Error::AlreadyReg,
        };
        assert_eq!(
            collector.to_string(),
            "metric collector 'objects_copied_total' rejected"
        );
        assert!(collector.source().is_some());

        let textfile = TelemetryError::Textfile {
            path: PathBuf::from("/var/lib/relay/relay.prom"),
            source: io::Error::other("read-only"),
        };
        assert!(textfile.to_string().contains("/var/lib/relay/relay.prom"));

        let unknown = TelemetryError::UnknownLogFormat {
            value: "xml".to_string(),
        };
        assert!(unknown.to_string().contains("'xml'"));
        assert!(unknown.source().is_none());
    }
}
