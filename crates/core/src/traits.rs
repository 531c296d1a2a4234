//! Storage backend abstraction
//!
//! The pipeline only needs to put a local file at a remote path. Keeping the
//! trait this small lets the executor run against the S3 adapter or an
//! in-memory fake.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::path::RemotePath;

/// Metadata returned after a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size_bytes: Option<i64>,
    pub etag: Option<String>,
}

impl ObjectInfo {
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            etag: None,
        }
    }

    /// Human-readable binary size
    pub fn size_human(&self) -> Option<String> {
        self.size_bytes
            .map(|s| humansize::format_size(s.max(0) as u64, humansize::BINARY))
    }
}

/// An object store that files can be uploaded to
///
/// Implementations are built once per run and shared read-only across uploads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local` to `path`, replacing any existing object
    async fn put_file(&self, path: &RemotePath, local: &Path) -> Result<ObjectInfo>;
}
