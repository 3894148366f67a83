use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use rusoto_core::{ByteStream, HttpClient, Region};
use rusoto_credential::ProfileProvider;
use rusoto_s3::{PutObjectRequest, S3Client, S3};
use tokio::time::{sleep, timeout};

use crate::cloud::uploader::{validate_remote_key, ArtifactUploader};
use crate::constants::{MAX_UPLOAD_RETRIES, RETRY_BASE_DELAY_MS};
use crate::models::{ContentKind, UploadReceipt};
use crate::utils::hash::sha256_bytes;

/// Uploads debug artifacts to Amazon S3 or an S3-compatible store.
///
/// Debug artifacts are small, so every file goes up in a single
/// `PutObject` with retry and exponential backoff. Each attempt is bounded
/// by `io_timeout`.
pub struct S3Uploader {
    bucket: String,
    region: Region,
    client: Arc<S3Client>,
    io_timeout: Duration,
}

impl S3Uploader {
    /// Create a new S3 uploader.
    ///
    /// # Arguments
    ///
    /// * `bucket` - S3 bucket name
    /// * `region_name` - Optional AWS region name. Invalid names fall back to the default region
    /// * `profile` - Optional AWS profile name for credentials
    /// * `endpoint` - Optional endpoint of an S3-compatible store
    /// * `io_timeout` - Upper bound for each `PutObject` attempt
    pub fn new(
        bucket: &str,
        region_name: Option<&str>,
        profile: Option<&str>,
        endpoint: Option<&str>,
        io_timeout: Duration,
    ) -> Result<Self> {
        validate_bucket_name(bucket)?;
        let region = resolve_region(region_name, endpoint);

        let client = match profile {
            Some(profile_name) => match ProfileProvider::new() {
                Ok(mut provider) => {
                    provider.set_profile(profile_name);
                    let http_client = HttpClient::new().context("Failed to create HTTP client")?;
                    S3Client::new_with(http_client, provider, region.clone())
                }
                Err(e) => {
                    warn!("Failed to create AWS profile provider: {}, using default", e);
                    S3Client::new(region.clone())
                }
            },
            None => S3Client::new(region.clone()),
        };

        Ok(Self {
            bucket: bucket.to_string(),
            region,
            client: Arc::new(client),
            io_timeout,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    fn object_url(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// Parse a region name, honouring a custom endpoint when given
fn resolve_region(region_name: Option<&str>, endpoint: Option<&str>) -> Region {
    if let Some(endpoint) = endpoint {
        return Region::Custom {
            name: region_name.unwrap_or("us-east-1").to_string(),
            endpoint: endpoint.to_string(),
        };
    }

    match region_name {
        Some(name) => match name.parse::<Region>() {
            Ok(region) => region,
            Err(_) => {
                warn!("Invalid region '{}', using default", name);
                Region::default()
            }
        },
        None => Region::default(),
    }
}

/// Basic bucket naming rules: 3-63 chars of lowercase letters, digits, `.` and `-`
fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        return Err(anyhow!("S3 bucket must not be empty"));
    }
    if !(3..=63).contains(&bucket.len()) {
        return Err(anyhow!("S3 bucket name must be 3-63 characters: {}", bucket));
    }
    let valid_chars = bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    if !valid_chars {
        return Err(anyhow!("S3 bucket name contains invalid characters: {}", bucket));
    }
    Ok(())
}

fn retry_delay(attempt: usize) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS * 2u64.pow(attempt as u32))
}

#[async_trait]
impl ArtifactUploader for S3Uploader {
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        content: ContentKind,
        is_public: bool,
    ) -> Result<UploadReceipt> {
        validate_remote_key(remote_key)?;

        let contents = tokio::fs::read(local_path)
            .await
            .context(format!("Failed to read {} for S3 upload", local_path.display()))?;
        let size = contents.len() as u64;
        let sha256 = sha256_bytes(&contents);

        debug!("Uploading {} ({} bytes) to {}", local_path.display(), size, self.object_url(remote_key));

        let mut attempt = 0;
        loop {
            attempt += 1;

            let request = PutObjectRequest {
                bucket: self.bucket.clone(),
                key: remote_key.to_string(),
                body: Some(ByteStream::from(contents.clone())),
                content_length: Some(size as i64),
                content_type: Some(content.content_type().to_string()),
                acl: is_public.then(|| "public-read".to_string()),
                ..Default::default()
            };

            let error = match timeout(self.io_timeout, self.client.put_object(request)).await {
                Ok(Ok(_)) => {
                    return Ok(UploadReceipt { url: self.object_url(remote_key), size, sha256 });
                }
                Ok(Err(e)) => anyhow!("{}", e),
                Err(_) => anyhow!("request timed out after {:?}", self.io_timeout),
            };

            if attempt >= MAX_UPLOAD_RETRIES {
                return Err(anyhow!(
                    "Failed to upload to S3 after {} attempts: {}",
                    MAX_UPLOAD_RETRIES,
                    error
                ));
            }

            let delay = retry_delay(attempt);
            warn!("S3 upload attempt {} failed, retrying in {:?}: {}", attempt, delay, error);
            sleep(delay).await;
        }
    }
}
