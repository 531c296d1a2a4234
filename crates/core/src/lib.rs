//! s3up-core: Core library for the s3up upload tool
//!
//! This crate provides the upload pipeline, including:
//! - Configuration (endpoint parsing, config files, retry settings)
//! - File-set resolution from include/exclude glob patterns
//! - Remote key derivation
//! - Retry policy and the sequential upload executor
//! - ObjectStore trait for storage backends
//!
//! This crate is independent of any specific S3 SDK, so the pipeline can be
//! driven against a fake store in tests.

pub mod config;
pub mod error;
pub mod fileset;
pub mod path;
pub mod retry;
pub mod traits;
pub mod upload;

#[cfg(test)]
mod test_log;

pub use config::{
    Endpoint, FileConfig, RetryConfig, StorageConfig, UploadConfig, default_config_path,
};
pub use error::{Error, Result};
pub use fileset::{FileSetResolver, PatternList, split_patterns};
pub use path::{RemotePath, display_path, map_key, posix_join};
pub use retry::{AttemptOutcome, RetryPolicy, TaskState};
pub use traits::{ObjectInfo, ObjectStore};
pub use upload::{FailedTask, FileTask, RunResult, TaskOutcome, UploadExecutor, plan};
