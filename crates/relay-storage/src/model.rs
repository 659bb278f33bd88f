//! Request and response types exchanged with storage collaborators.
//!
//! # Design
//! - Plain owned data so requests can be logged, recorded by test doubles, and
//!   moved across tasks.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Bucket plus key prefix addressing a folder-like set of objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix; empty selects the whole bucket.
    pub prefix: String,
}

impl ObjectLocation {
    /// Build a location from a bucket and prefix.
    #[must_use]
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Render the location as a provider URI (e.g. `gs://bucket/prefix`).
    #[must_use]
    pub fn uri(&self, scheme: &str) -> String {
        format!("{scheme}://{}/{}", self.bucket, self.prefix)
    }

    /// Whether `key` falls under this location's prefix.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }
}

impl Display for ObjectLocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.bucket, self.prefix)
    }
}

/// Opaque reference to credentials managed outside the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionRef(String);

impl ConnectionRef {
    /// Wrap a connection identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ConnectionRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Arguments for a bulk prefix copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRequest {
    /// Objects to copy.
    pub source: ObjectLocation,
    /// Credentials for the source store.
    pub source_connection: ConnectionRef,
    /// Where the objects land; keys keep their path relative to the source prefix.
    pub destination: ObjectLocation,
    /// Credentials for the destination store.
    pub destination_connection: ConnectionRef,
    /// Overwrite destination objects that share a key with a source object.
    pub replace: bool,
}

/// Keys touched by a bulk prefix copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    /// Destination keys that were written.
    pub copied: Vec<String>,
    /// Destination keys left untouched because they already existed.
    pub skipped: Vec<String>,
}

/// Arguments for listing objects under a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    /// Bucket and prefix to list.
    pub location: ObjectLocation,
    /// Credentials for the store.
    pub connection: ConnectionRef,
}
