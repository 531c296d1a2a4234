//! upload command - Upload glob-selected files to a bucket
//!
//! Resolves the include/exclude patterns, maps every file to a remote key and
//! uploads the files one by one, stopping at the first file that fails on
//! every retry.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use s3up_core::{
    FileConfig, FileTask, RemotePath, StorageConfig, UploadConfig, UploadExecutor,
    config::{StorageSection, UploadSection},
    default_config_path, plan,
};
use s3up_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Upload files matching a glob pattern to S3-compatible storage
#[derive(Args, Debug, Default)]
pub struct UploadArgs {
    /// Access key ID
    #[arg(long, env = "STORAGE_ACCESS_KEY_ID", hide_env_values = true)]
    pub storage_access_key_id: Option<String>,

    /// Secret access key
    #[arg(long, env = "STORAGE_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub storage_secret_access_key: Option<String>,

    /// Endpoint URL; https:// enables TLS (e.g., `https://s3.amazonaws.com`)
    #[arg(long, env = "STORAGE_ENDPOINT")]
    pub storage_endpoint: Option<String>,

    /// Destination bucket
    #[arg(long, env = "STORAGE_BUCKET")]
    pub storage_bucket: Option<String>,

    /// Region hint passed to the client (default: us-east-1)
    #[arg(long, env = "STORAGE_REGION")]
    pub storage_region: Option<String>,

    /// Glob pattern(s) selecting files to upload, one per line
    #[arg(long, env = "FILES")]
    pub files: Option<String>,

    /// Glob pattern(s) selecting files to leave out, one per line
    #[arg(long, env = "EXCLUDE")]
    pub exclude: Option<String>,

    /// Remote path prefix under which keys are placed
    #[arg(long, env = "TARGET_PATH")]
    pub target_path: Option<String>,

    /// Literal prefix removed from each relative path before building the key
    #[arg(long, env = "STRIP_PATH_PREFIX")]
    pub strip_path_prefix: Option<String>,

    /// Retries per file after the first attempt (default: 3)
    #[arg(long, env = "RETRY_COUNT")]
    pub retry_count: Option<u32>,

    /// Delay before the first retry in milliseconds; 0 retries immediately (default: 100)
    #[arg(long, env = "RETRY_BACKOFF_MS")]
    pub retry_backoff_ms: Option<u64>,

    /// Upper bound for a retry delay in milliseconds (default: 10000)
    #[arg(long, env = "RETRY_MAX_BACKOFF_MS")]
    pub retry_max_backoff_ms: Option<u64>,

    /// Directory that local paths are made relative to (default: current directory)
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// TOML config file (default: <config dir>/s3up/config.toml when present)
    #[arg(long, env = "S3UP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show what would be uploaded without uploading
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl UploadArgs {
    /// Flag and environment values as a config layer
    fn overrides(&self) -> FileConfig {
        FileConfig {
            storage: StorageSection {
                access_key_id: self.storage_access_key_id.clone(),
                secret_access_key: self.storage_secret_access_key.clone(),
                endpoint: self.storage_endpoint.clone(),
                bucket: self.storage_bucket.clone(),
                region: self.storage_region.clone(),
            },
            upload: UploadSection {
                files: self.files.clone(),
                exclude: self.exclude.clone(),
                target_path: self.target_path.clone(),
                strip_path_prefix: self.strip_path_prefix.clone(),
                retry_count: self.retry_count,
                retry_backoff_ms: self.retry_backoff_ms,
                retry_max_backoff_ms: self.retry_max_backoff_ms,
            },
        }
    }
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (storage, upload) = match resolve_configs(&args) {
        Ok(configs) => configs,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::UsageError;
        }
    };

    log_settings(&storage, &upload);

    let tasks = match plan(&upload) {
        Ok(tasks) => tasks,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    if tasks.is_empty() {
        formatter.warning("No files to upload");
        return ExitCode::Success;
    }

    if args.dry_run {
        for task in &tasks {
            formatter.println(&plan_line(&formatter, task, &storage.bucket));
        }
        formatter.success(&format!(
            "Dry run: {} file(s) would be uploaded",
            tasks.len()
        ));
        return ExitCode::Success;
    }

    let client = match S3Client::new(&storage).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to create storage client: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let result = UploadExecutor::new(&client, &storage.bucket, upload.retry)
        .run(tasks)
        .await;

    match result.into_result() {
        Ok(count) => {
            let destination = RemotePath::new(&storage.bucket, &upload.target_path);
            formatter.success(&format!(
                "Uploaded {count} file(s) to {}",
                formatter.style_url(&destination.to_string())
            ));
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        }
    }
}

/// Merge flags/env over the config file and validate the result
fn resolve_configs(args: &UploadArgs) -> anyhow::Result<(StorageConfig, UploadConfig)> {
    let file_config = load_file_config(args.config.as_deref())?;
    let workspace = workspace_root(args.workspace.as_deref())?;
    let configs = file_config.merge(args.overrides()).into_configs(workspace)?;
    Ok(configs)
}

fn load_file_config(explicit: Option<&Path>) -> anyhow::Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => path,
            None => return Ok(FileConfig::default()),
        },
    };

    tracing::debug!(path = %path.display(), "Loading config file");
    FileConfig::load(&path)
        .with_context(|| format!("Failed to load config file {}", path.display()))
}

/// Absolute workspace root; relative values resolve against the current directory
fn workspace_root(configured: Option<&Path>) -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    Ok(match configured.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd,
    })
}

fn log_settings(storage: &StorageConfig, upload: &UploadConfig) {
    tracing::info!("Uploading to S3 Bucket: {}", storage.bucket);
    tracing::info!("Using files glob pattern: {}", upload.files);
    if let Some(exclude) = &upload.exclude {
        tracing::info!("Excluding files matching: {exclude}");
    }
    tracing::info!("Target path in S3: {}", upload.target_path);
    if let Some(prefix) = &upload.strip_path_prefix {
        tracing::info!("Stripping path prefix: {prefix}");
    }
    tracing::debug!(
        retry_count = upload.retry.retry_count,
        initial_backoff_ms = upload.retry.initial_backoff_ms,
        max_backoff_ms = upload.retry.max_backoff_ms,
        workspace = %upload.workspace_root.display(),
        "Retry settings"
    );
}

/// One dry-run line: `<display path> -> s3://bucket/key`
fn plan_line(formatter: &Formatter, task: &FileTask, bucket: &str) -> String {
    let remote = RemotePath::new(bucket, &task.remote_key);
    format!(
        "{} -> {}",
        formatter.style_file(&task.display_path),
        formatter.style_url(&remote.to_string())
    )
}
