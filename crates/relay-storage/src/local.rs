//! Directory-backed object store: each bucket is a directory under a root and
//! each key a file path relative to it.

use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::error::{StorageError, StorageResult};
use crate::provider::ObjectStore;

const KEY_DELIMITER: char = '/';

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    label: &'static str,
    root: PathBuf,
}

impl LocalStore {
    /// Construct a store rooted at `root`, reporting `label` as its provider.
    #[must_use]
    pub fn new(label: &'static str, root: impl Into<PathBuf>) -> Self {
        Self {
            label,
            root: root.into(),
        }
    }

    fn bucket_path(&self, bucket: &str) -> StorageResult<PathBuf> {
        let mut components = Path::new(bucket).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(bucket)),
            _ => Err(StorageError::InvalidBucket {
                bucket: bucket.to_string(),
            }),
        }
    }

    async fn existing_bucket_path(&self, bucket: &str) -> StorageResult<PathBuf> {
        let path = self.bucket_path(bucket)?;
        if metadata("bucket_exists", &path)
            .await?
            .is_some_and(|meta| meta.is_dir())
        {
            Ok(path)
        } else {
            Err(StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })
        }
    }

    async fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        let bucket_path = self.existing_bucket_path(bucket).await?;
        Ok(bucket_path.join(sanitize_key(key)?))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn provider(&self) -> &'static str {
        self.label
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let path = self.bucket_path(bucket)?;
        Ok(metadata("bucket_exists", &path)
            .await?
            .is_some_and(|meta| meta.is_dir()))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let bucket_path = self.existing_bucket_path(bucket).await?;
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || walk_keys(&bucket_path, &prefix))
            .await
            .map_err(|err| StorageError::Upstream {
                operation: "list",
                message: err.to_string(),
            })?
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(bucket, key).await?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(body),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(err) => Err(StorageError::io("get", path, err)),
        }
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        let path = self.object_path(bucket, key).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::io("create_parent", parent, err))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|err| StorageError::io("put", path, err))
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let path = self.object_path(bucket, key).await?;
        Ok(metadata("exists", &path)
            .await?
            .is_some_and(|meta| meta.is_file()))
    }
}

/// Metadata for `path`, or `None` when nothing exists there.
async fn metadata(operation: &'static str, path: &Path) -> StorageResult<Option<Metadata>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StorageError::io(operation, path, err)),
    }
}

/// Map an object key onto a relative path, rejecting traversal and empty segments.
fn sanitize_key(key: &str) -> StorageResult<PathBuf> {
    if key.is_empty() || key.ends_with(KEY_DELIMITER) {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "must name an object, not a folder",
        });
    }

    let mut relative = PathBuf::new();
    for segment in key.split(KEY_DELIMITER) {
        match segment {
            "" => {
                return Err(StorageError::InvalidKey {
                    key: key.to_string(),
                    reason: "empty path segment",
                });
            }
            "." | ".." => {
                return Err(StorageError::InvalidKey {
                    key: key.to_string(),
                    reason: "relative path segment",
                });
            }
            other if other.contains('\\') => {
                return Err(StorageError::InvalidKey {
                    key: key.to_string(),
                    reason: "backslash in path segment",
                });
            }
            other => relative.push(other),
        }
    }
    Ok(relative)
}

fn walk_keys(bucket_path: &Path, prefix: &str) -> StorageResult<Vec<String>> {
    let mut keys = Vec::new();
    for entry in WalkDir::new(bucket_path).follow_links(false) {
        let entry = entry.map_err(|err| StorageError::walkdir("list", bucket_path, err))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(bucket_path) else {
            continue;
        };
        let key = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if key.starts_with(prefix) {
            keys.push(key);
        }
    }
    keys.sort();
    Ok(keys)
}
