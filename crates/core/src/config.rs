//! Run configuration
//!
//! Settings arrive from three layers: command-line flags, environment
//! variables and an optional TOML file. The CLI collects flags and env into a
//! [`FileConfig`] overlay, merges it over the file layer and calls
//! [`FileConfig::into_configs`], which validates required inputs and produces
//! the read-only [`StorageConfig`] and [`UploadConfig`] used for the run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Default number of retries after the first attempt
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default delay before the first retry
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;
/// Upper bound for a single backoff delay
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

/// Retry settings applied to every file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = retry_count + 1
    pub retry_count: u32,
    /// Backoff before the first retry; 0 retries immediately
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    /// Total number of transfer attempts per file
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Parsed storage endpoint
///
/// TLS is inferred from the scheme. The port defaults to 443 for `https`
/// and 80 for `http` when the URL does not carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub use_tls: bool,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| Error::Config(format!("Invalid storage endpoint '{raw}': {e}")))?;

        let use_tls = match url.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(Error::Config(format!(
                    "Unsupported endpoint scheme '{other}' in '{raw}' (expected http or https)"
                )));
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config(format!("Storage endpoint '{raw}' has no host")))?
            .to_string();

        let port = url.port().unwrap_or(if use_tls { 443 } else { 80 });

        Ok(Self {
            use_tls,
            host,
            port,
        })
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    /// Base URL handed to the storage client
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Connection settings for the destination bucket
#[derive(Clone)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: Endpoint,
    pub bucket: String,
    pub region: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

/// What to upload and where to put it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Include glob pattern(s), newline separated
    pub files: String,
    pub exclude: Option<String>,
    pub target_path: String,
    pub strip_path_prefix: Option<String>,
    /// Root that local paths are made relative to
    pub workspace_root: PathBuf,
    pub retry: RetryConfig,
}

/// `[storage]` table of the config file
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
}

/// `[upload]` table of the config file
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UploadSection {
    pub files: Option<String>,
    pub exclude: Option<String>,
    pub target_path: Option<String>,
    pub strip_path_prefix: Option<String>,
    pub retry_count: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub retry_max_backoff_ms: Option<u64>,
}

/// One layer of settings, every field optional
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub upload: UploadSection,
}

impl FileConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Layer `overrides` on top of `self`; set values in `overrides` win
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        let s = self.storage;
        let o = overrides.storage;
        let u = self.upload;
        let ou = overrides.upload;

        FileConfig {
            storage: StorageSection {
                access_key_id: pick(o.access_key_id, s.access_key_id),
                secret_access_key: pick(o.secret_access_key, s.secret_access_key),
                endpoint: pick(o.endpoint, s.endpoint),
                bucket: pick(o.bucket, s.bucket),
                region: pick(o.region, s.region),
            },
            upload: UploadSection {
                files: pick(ou.files, u.files),
                exclude: pick(ou.exclude, u.exclude),
                // An explicitly empty target path is a value, not "unset"
                target_path: ou.target_path.or(u.target_path),
                strip_path_prefix: pick(ou.strip_path_prefix, u.strip_path_prefix),
                retry_count: ou.retry_count.or(u.retry_count),
                retry_backoff_ms: ou.retry_backoff_ms.or(u.retry_backoff_ms),
                retry_max_backoff_ms: ou.retry_max_backoff_ms.or(u.retry_max_backoff_ms),
            },
        }
    }

    /// Validate required inputs and build the run configuration
    pub fn into_configs(self, workspace_root: PathBuf) -> Result<(StorageConfig, UploadConfig)> {
        let s = self.storage;
        let u = self.upload;

        let endpoint_raw = required(s.endpoint, "storage-endpoint")?;
        let storage = StorageConfig {
            access_key_id: required(s.access_key_id, "storage-access-key-id")?,
            secret_access_key: required(s.secret_access_key, "storage-secret-access-key")?,
            endpoint: Endpoint::parse(&endpoint_raw)?,
            bucket: required(s.bucket, "storage-bucket")?,
            region: non_empty(s.region),
        };

        let retry = RetryConfig {
            retry_count: u.retry_count.unwrap_or(DEFAULT_RETRY_COUNT),
            initial_backoff_ms: u.retry_backoff_ms.unwrap_or(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff_ms: u.retry_max_backoff_ms.unwrap_or(DEFAULT_MAX_BACKOFF_MS),
        };

        let upload = UploadConfig {
            files: required(u.files, "files")?,
            exclude: non_empty(u.exclude),
            // An empty target path is valid: keys land at the bucket root.
            target_path: u
                .target_path
                .ok_or_else(|| Error::Config("Missing required input: target-path".to_string()))?,
            strip_path_prefix: non_empty(u.strip_path_prefix),
            workspace_root,
            retry,
        };

        Ok((storage, upload))
    }
}

/// Default config file location: `<config_dir>/s3up/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("s3up").join("config.toml"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn pick(preferred: Option<String>, fallback: Option<String>) -> Option<String> {
    non_empty(preferred).or(fallback)
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| Error::Config(format!("Missing required input: {name}")))
}
