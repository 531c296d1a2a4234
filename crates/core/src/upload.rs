//! Upload planning and execution
//!
//! [`plan`] turns an [`UploadConfig`] into the ordered list of [`FileTask`]s.
//! [`UploadExecutor`] uploads them one at a time, retrying each file under the
//! [`RetryPolicy`] and stopping the whole run at the first file that fails on
//! every attempt.

use std::path::{Path, PathBuf};

use crate::config::{RetryConfig, UploadConfig};
use crate::error::{Error, Result};
use crate::fileset::FileSetResolver;
use crate::path::{RemotePath, display_path, map_key};
use crate::retry::{AttemptOutcome, RetryPolicy, TaskState};
use crate::traits::{ObjectInfo, ObjectStore};

/// A single file to upload and the key it lands at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub local_path: PathBuf,
    /// Relative, prefix-stripped path used in log lines
    pub display_path: String,
    pub remote_key: String,
}

impl FileTask {
    pub fn new(
        local_path: PathBuf,
        workspace_root: &Path,
        target_path: &str,
        strip_prefix: Option<&str>,
    ) -> Self {
        let display_path = display_path(&local_path, workspace_root, strip_prefix);
        let remote_key = map_key(&local_path, workspace_root, target_path, strip_prefix);
        Self {
            local_path,
            display_path,
            remote_key,
        }
    }
}

/// Resolve the configured patterns and compute a remote key for every file
pub fn plan(config: &UploadConfig) -> Result<Vec<FileTask>> {
    let resolver = FileSetResolver::new(&config.workspace_root);
    let files = resolver.resolve(&config.files, config.exclude.as_deref())?;

    Ok(files
        .into_iter()
        .map(|local| {
            FileTask::new(
                local,
                &config.workspace_root,
                &config.target_path,
                config.strip_path_prefix.as_deref(),
            )
        })
        .collect())
}

/// The file that stopped the run
#[derive(Debug)]
pub struct FailedTask {
    pub task: FileTask,
    pub attempts: u32,
    pub last_error: Error,
}

/// Outcome of a run
#[derive(Debug, Default)]
pub struct RunResult {
    pub uploaded_count: usize,
    pub first_failure: Option<FailedTask>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.first_failure.is_none()
    }

    /// Number of uploaded files, or [`Error::UploadFailed`] for the failed file
    pub fn into_result(self) -> Result<usize> {
        match self.first_failure {
            None => Ok(self.uploaded_count),
            Some(failed) => Err(Error::UploadFailed {
                path: PathBuf::from(failed.task.display_path),
                attempts: failed.attempts,
                message: failed.last_error.to_string(),
            }),
        }
    }
}

/// Outcome of uploading one file
#[derive(Debug)]
pub enum TaskOutcome {
    Succeeded { info: ObjectInfo, attempts: u32 },
    Failed { attempts: u32, last_error: Error },
}

/// Sequential uploader for a single bucket
pub struct UploadExecutor<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    bucket: String,
    policy: RetryPolicy,
}

impl<'a, S: ObjectStore + ?Sized> UploadExecutor<'a, S> {
    pub fn new(store: &'a S, bucket: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            policy: RetryPolicy::new(retry),
        }
    }

    /// Upload every task in order, stopping at the first unrecoverable failure
    pub async fn run(&self, tasks: Vec<FileTask>) -> RunResult {
        let mut result = RunResult::default();

        for task in tasks {
            match self.upload(&task).await {
                TaskOutcome::Succeeded { .. } => result.uploaded_count += 1,
                TaskOutcome::Failed {
                    attempts,
                    last_error,
                } => {
                    result.first_failure = Some(FailedTask {
                        task,
                        attempts,
                        last_error,
                    });
                    break;
                }
            }
        }

        if result.is_success() && result.uploaded_count > 0 {
            tracing::info!("All files uploaded successfully!");
        }

        result
    }

    /// Upload one task, retrying failed attempts while the policy allows
    pub async fn upload(&self, task: &FileTask) -> TaskOutcome {
        let remote = RemotePath::new(&self.bucket, &task.remote_key);
        tracing::info!("Uploading {} to {}", task.display_path, remote);

        let mut state = self.policy.begin();
        let mut uploaded = None;
        let mut last_error = None;

        while let TaskState::Uploading {
            attempt,
            attempts_remaining,
        } = state
        {
            let outcome = match self.store.put_file(&remote, &task.local_path).await {
                Ok(info) => {
                    uploaded = Some(info);
                    AttemptOutcome::Success
                }
                Err(e) => {
                    if attempts_remaining > 0 {
                        tracing::warn!(
                            attempt,
                            attempts_remaining,
                            "Error uploading {}: {e}. Retrying ({attempts_remaining} attempt(s) left)",
                            task.display_path
                        );
                    } else {
                        tracing::error!(attempt, "Error uploading {}: {e}", task.display_path);
                    }
                    last_error = Some(e);
                    AttemptOutcome::Failure
                }
            };

            state = self.policy.transition(state, outcome);

            if matches!(state, TaskState::Uploading { .. }) {
                let delay = self.policy.backoff(attempt);
                if !delay.is_zero() {
                    tracing::debug!(backoff_ms = delay.as_millis() as u64, "Waiting before retry");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        match (state, uploaded) {
            (TaskState::Succeeded { attempts }, Some(info)) => {
                match info.size_human() {
                    Some(size) => {
                        tracing::info!("Uploaded {} successfully ({size}).", task.display_path)
                    }
                    None => tracing::info!("Uploaded {} successfully.", task.display_path),
                }
                TaskOutcome::Succeeded { info, attempts }
            }
            (TaskState::Failed { attempts }, _) => TaskOutcome::Failed {
                attempts,
                last_error: last_error
                    .unwrap_or_else(|| Error::General("upload failed".to_string())),
            },
            (other, _) => TaskOutcome::Failed {
                attempts: 0,
                last_error: Error::General(format!("upload ended in state {other:?}")),
            },
        }
    }
}
