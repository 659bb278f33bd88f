//! Capability traits implemented by storage backends.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::model::{CopyReport, CopyRequest, ListRequest};

/// Copies every object under a source prefix into a destination bucket.
#[async_trait]
pub trait BulkCopy: Send + Sync {
    /// Copy all objects whose key starts with the source prefix, keeping each
    /// key's path relative to that prefix. When `replace` is set, destination
    /// objects with the same key are overwritten; otherwise they are skipped.
    async fn copy_prefix(&self, request: &CopyRequest) -> StorageResult<CopyReport>;
}

/// Lists object keys under a prefix.
#[async_trait]
pub trait ListObjects: Send + Sync {
    /// Return the keys matching the prefix, possibly empty.
    async fn list_objects(&self, request: &ListRequest) -> StorageResult<Vec<String>>;
}

/// Minimal object store surface the generic capabilities are built on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short provider label used in logs.
    fn provider(&self) -> &'static str;

    /// Whether the bucket exists.
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Keys under `prefix`, sorted ascending.
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Read an object body.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Write an object body, replacing any existing object with the same key.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()>;

    /// Whether an object exists.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;
}
