//! # Design
//!
//! - Structured storage errors carrying the operation and location involved.
//! - `is_transient` separates failures worth retrying from permanent ones.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by object storage collaborators.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The bucket does not exist in the store.
    #[error("bucket '{bucket}' not found")]
    BucketNotFound {
        /// Bucket that was requested.
        bucket: String,
    },
    /// The object does not exist in the bucket.
    #[error("object '{key}' not found in bucket '{bucket}'")]
    ObjectNotFound {
        /// Bucket that was searched.
        bucket: String,
        /// Key that was requested.
        key: String,
    },
    /// The bucket name cannot be mapped onto the backend.
    #[error("invalid bucket name '{bucket}'")]
    InvalidBucket {
        /// Offending bucket name.
        bucket: String,
    },
    /// The object key cannot be mapped onto the backend.
    #[error("invalid object key '{key}': {reason}")]
    InvalidKey {
        /// Offending key.
        key: String,
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// The backend is temporarily unreachable.
    #[error("storage unavailable during {operation}: {detail}")]
    Unavailable {
        /// Operation that was attempted.
        operation: &'static str,
        /// Upstream detail.
        detail: String,
    },
    /// The backend rejected the operation.
    #[error("{operation} failed: {message}")]
    Upstream {
        /// Operation that was attempted.
        operation: &'static str,
        /// Upstream error text.
        message: String,
    },
    /// IO failures while interacting with a directory-backed store.
    #[error("storage io failure during {operation} at {}: {source}", .path.display())]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures while listing a directory-backed store.
    #[error("storage walk failure during {operation} at {}: {source}", .path.display())]
    Walkdir {
        /// Operation that triggered the traversal failure.
        operation: &'static str,
        /// Path involved in the traversal failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
}

impl StorageError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the failure may clear up on its own (connection resets,
    /// timeouts, interrupted calls, unavailable backends).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Io { source, .. } => is_transient_io(source.kind()),
            Self::Walkdir { source, .. } => source
                .io_error()
                .is_some_and(|err| is_transient_io(err.kind())),
            Self::BucketNotFound { .. }
            | Self::ObjectNotFound { .. }
            | Self::InvalidBucket { .. }
            | Self::InvalidKey { .. }
            | Self::Upstream { .. } => false,
        }
    }
}

const fn is_transient_io(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    )
}
