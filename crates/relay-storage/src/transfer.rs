//! Bulk copy and listing capabilities implemented over generic object stores.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::model::{CopyReport, CopyRequest, ListRequest};
use crate::provider::{BulkCopy, ListObjects, ObjectStore};

/// Copies objects from one store into another, object by object.
#[derive(Clone)]
pub struct StoreTransfer {
    source: Arc<dyn ObjectStore>,
    destination: Arc<dyn ObjectStore>,
}

impl StoreTransfer {
    /// Pair a source store with a destination store.
    #[must_use]
    pub fn new(source: Arc<dyn ObjectStore>, destination: Arc<dyn ObjectStore>) -> Self {
        Self {
            source,
            destination,
        }
    }
}

#[async_trait]
impl BulkCopy for StoreTransfer {
    async fn copy_prefix(&self, request: &CopyRequest) -> StorageResult<CopyReport> {
        let source = &request.source;
        let destination = &request.destination;

        if !self.destination.bucket_exists(&destination.bucket).await? {
            return Err(StorageError::BucketNotFound {
                bucket: destination.bucket.clone(),
            });
        }

        let keys = self.source.list(&source.bucket, &source.prefix).await?;
        info!(
            source = %source.uri(self.source.provider()),
            destination = %destination.uri(self.destination.provider()),
            source_connection = %request.source_connection,
            destination_connection = %request.destination_connection,
            objects = keys.len(),
            replace = request.replace,
            "copying objects"
        );

        let mut report = CopyReport::default();
        for key in keys {
            if !source.contains(&key) {
                debug!(key = %key, "listed key outside source prefix; ignoring");
                continue;
            }
            let destination_key = format!("{}{}", destination.prefix, &key[source.prefix.len()..]);

            if !request.replace
                && self
                    .destination
                    .exists(&destination.bucket, &destination_key)
                    .await?
            {
                debug!(key = %destination_key, "destination object exists; skipping");
                report.skipped.push(destination_key);
                continue;
            }

            let body = self.source.get(&source.bucket, &key).await?;
            self.destination
                .put(&destination.bucket, &destination_key, body)
                .await?;
            report.copied.push(destination_key);
        }

        Ok(report)
    }
}

/// Lists objects in a single store.
#[derive(Clone)]
pub struct StoreLister {
    store: Arc<dyn ObjectStore>,
}

impl StoreLister {
    /// Wrap the store to list from.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ListObjects for StoreLister {
    async fn list_objects(&self, request: &ListRequest) -> StorageResult<Vec<String>> {
        let location = &request.location;
        let keys = self.store.list(&location.bucket, &location.prefix).await?;
        debug!(
            location = %location.uri(self.store.provider()),
            connection = %request.connection,
            objects = keys.len(),
            "listed objects"
        );
        Ok(keys)
    }
}
