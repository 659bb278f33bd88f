//! In-process object store keyed by bucket and object key.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::provider::ObjectStore;

type Buckets = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// Object store held entirely in memory. Clones share the same buckets.
#[derive(Clone, Default)]
pub struct MemoryStore {
    label: &'static str,
    buckets: Arc<RwLock<Buckets>>,
}

impl MemoryStore {
    /// Construct an empty store reporting `label` as its provider.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            buckets: Arc::default(),
        }
    }

    /// Create a bucket if it does not exist yet.
    pub fn create_bucket(&self, bucket: &str) {
        self.write().entry(bucket.to_string()).or_default();
    }

    /// Insert an object synchronously, creating the bucket when needed.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.write()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.into());
    }

    /// Read an object synchronously.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.read()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    /// All keys in a bucket, sorted ascending.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.read()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Buckets> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Buckets> {
        self.buckets.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn provider(&self) -> &'static str {
        if self.label.is_empty() {
            "memory"
        } else {
            self.label
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        Ok(self.read().contains_key(bucket))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let guard = self.read();
        let objects = guard
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })?;
        Ok(objects
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let guard = self.read();
        let objects = guard
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        let mut guard = self.write();
        let objects = guard
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })?;
        objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let guard = self.read();
        let objects = guard
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })?;
        Ok(objects.contains_key(key))
    }
}
