use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

/// How long a presigned cover upload URL stays usable.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// Image types accepted for plan covers.
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to presign upload: {0}")]
    Presign(String),
}

/// StorageService
///
/// Object storage for plan cover images. Handlers only ever ask for upload URLs; the
/// browser PUTs the image straight to the bucket.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the bucket if missing. Only called for local (MinIO) runs.
    async fn ensure_bucket_exists(&self);

    /// Returns a presigned PUT URL for `key`, constrained to `content_type`.
    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, StorageError>;
}

/// S3StorageClient
///
/// AWS SDK client pointed at any S3-compatible endpoint. Path-style addressing is
/// forced so MinIO works locally.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket on an existing bucket errors; that is the expected case.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(request.uri().to_string())
    }
}

/// cover_object_key
///
/// Builds `covers/<uuid>.<ext>` from a client-supplied filename. Only the extension is
/// kept, lower-cased and restricted to ASCII alphanumerics, so no path component of the
/// original name reaches the bucket.
pub fn cover_object_key(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());

    format!("covers/{}.{}", uuid::Uuid::new_v4(), extension)
}

/// MockStorageService
///
/// Deterministic stand-in used by the test suite.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every presign call fails.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presign_upload(&self, key: &str, _content_type: &str) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Presign("simulated storage outage".to_string()));
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{key}?signature=fake"
        ))
    }
}

/// StorageState
///
/// The shared handle to object storage stored in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
