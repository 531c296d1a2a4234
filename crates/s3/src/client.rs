//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from s3up-core.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use s3up_core::{Error, ObjectInfo, ObjectStore, RemotePath, Result, StorageConfig};

/// Region passed to the SDK when none is configured
const DEFAULT_REGION: &str = "us-east-1";

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from the storage configuration
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = config.endpoint.url();
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        tracing::info!("Using S3 Endpoint: {}", config.endpoint);
        if let Some(region) = &config.region {
            tracing::info!("Using S3 Region: {region}");
        }

        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None, // session token
            None, // expiry
            "s3up-static-credentials",
        );

        // Build SDK config
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(region))
            .endpoint_url(&endpoint)
            .load()
            .await;

        // Path-style addressing works with every S3-compatible server
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &aws_sdk_s3::error::SdkError<E>) -> String {
        match error {
            aws_sdk_s3::error::SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let meta = service_err.raw();
                let mut msg = format!("Service error: {}", err);
                if let Some(code) = meta.headers().get("x-amz-error-code") {
                    msg.push_str(&format!(" (code: {})", code));
                }
                msg
            }
            aws_sdk_s3::error::SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {:?}", err)
            }
            aws_sdk_s3::error::SdkError::TimeoutError(_) => "Request timeout".to_string(),
            aws_sdk_s3::error::SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {:?}", err)
            }
            aws_sdk_s3::error::SdkError::ResponseError(err) => {
                format!("Response error: {:?}", err)
            }
            _ => error.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_file(&self, path: &RemotePath, local: &Path) -> Result<ObjectInfo> {
        let size = tokio::fs::metadata(local).await?.len() as i64;

        // Re-opened on every attempt so a retry streams the file from the start
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

        let response = self
            .inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(Self::format_sdk_error(&e)))?;

        let mut info = ObjectInfo::file(&path.key, size);
        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }

        tracing::debug!(key = %path.key, etag = ?info.etag, "put_object completed");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3up_core::FileConfig;
    use std::path::PathBuf;

    fn storage(endpoint: &str, region: Option<&str>) -> StorageConfig {
        let mut cfg = FileConfig::default();
        cfg.storage.access_key_id = Some("AKID".to_string());
        cfg.storage.secret_access_key = Some("SECRET".to_string());
        cfg.storage.endpoint = Some(endpoint.to_string());
        cfg.storage.bucket = Some("artifacts".to_string());
        cfg.storage.region = region.map(str::to_string);
        cfg.upload.files = Some("*".to_string());
        cfg.upload.target_path = Some(String::new());
        cfg.into_configs(PathBuf::from("/ws")).unwrap().0
    }

    #[tokio::test]
    async fn test_client_uses_configured_region() {
        let client = S3Client::new(&storage("http://localhost:9000", Some("eu-west-1")))
            .await
            .unwrap();
        let region = client.inner().config().region().map(|r| r.as_ref().to_string());
        assert_eq!(region.as_deref(), Some("eu-west-1"));
    }

    #[tokio::test]
    async fn test_client_default_region() {
        let client = S3Client::new(&storage("https://s3.example.com", None))
            .await
            .unwrap();
        let region = client.inner().config().region().map(|r| r.as_ref().to_string());
        assert_eq!(region.as_deref(), Some(DEFAULT_REGION));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_io_error() {
        let client = S3Client::new(&storage("http://127.0.0.1:9", None))
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let result = client
            .put_file(
                &RemotePath::new("artifacts", "missing.txt"),
                &dir.path().join("missing.txt"),
            )
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
