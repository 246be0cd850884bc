//! S3-compatible storage client
//!
//! Wraps the AWS SDK for S3-compatible storage access (MinIO, R2, S3, B2).

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};

/// Prefix under which uploaded PDFs are stored
const OBJECT_PREFIX: &str = "pdfs";

/// How long generated retrieval URLs stay valid
const PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// Result of storing a blob: the key the store assigned and, on
/// versioned buckets, the version id pinning this exact revision
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub external_id: String,
    pub storage_version: Option<String>,
}

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Build a client from configuration without touching the network
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "marginalia",
        );

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO and other S3-compatible services
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    /// Build a client and probe the configured bucket
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let client = Self::new(config);

        match client
            .client
            .head_bucket()
            .bucket(&client.bucket)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", client.bucket);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt operations anyway.",
                    client.bucket,
                    e
                );
            }
        }

        Ok(client)
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store raw PDF bytes under a freshly minted key
    ///
    /// The returned key is the document's external id from here on.
    pub async fn put_document(&self, data: Vec<u8>) -> Result<StoredObject> {
        let key = format!("{}/{}", OBJECT_PREFIX, Uuid::new_v4());

        let response = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/pdf")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::SdkError(format!("Failed to store object {}: {}", key, e)))?;

        Ok(StoredObject {
            external_id: key,
            storage_version: response.version_id().map(|s| s.to_string()),
        })
    }

    /// Generate a time-limited retrieval URL for a stored document
    ///
    /// The URL is pinned to `storage_version` when the bucket issued
    /// one, so the same bytes are always returned. Presigning is a
    /// local signing operation; it does not call the store.
    pub async fn presigned_url(
        &self,
        external_id: &str,
        storage_version: Option<&str>,
    ) -> Result<String> {
        let presigning = PresigningConfig::expires_in(PRESIGN_EXPIRY)
            .map_err(|e| StorageError::SdkError(format!("Invalid presign expiry: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(external_id)
            .set_version_id(storage_version.map(|s| s.to_string()))
            .response_content_type("application/pdf");

        let presigned = request.presigned(presigning).await.map_err(|e| {
            StorageError::SdkError(format!("Failed to presign URL for {}: {}", external_id, e))
        })?;

        Ok(presigned.uri().to_string())
    }

    /// Delete a stored document
    ///
    /// Callers must treat failure as aborting the whole delete flow;
    /// registry state is only mutated after this succeeds.
    pub async fn delete_object(
        &self,
        external_id: &str,
        storage_version: Option<&str>,
    ) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(external_id)
            .set_version_id(storage_version.map(|s| s.to_string()))
            .send()
            .await
            .map_err(|e| {
                StorageError::SdkError(format!("Failed to delete object {}: {}", external_id, e))
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, StorageProvider};

    fn test_config() -> StorageConfig {
        StorageConfig {
            provider: StorageProvider::Minio,
            endpoint: "http://localhost:9000".to_string(),
            bucket: "test-bucket".to_string(),
            access_key: "test".to_string(),
            secret_key: "test".to_string(),
            region: None,
        }
    }

    #[test]
    fn test_client_construction_is_offline() {
        let client = S3Client::new(&test_config());
        assert_eq!(client.bucket(), "test-bucket");
    }

    #[tokio::test]
    async fn test_presigned_url_pins_version() {
        let client = S3Client::new(&test_config());

        let url = client
            .presigned_url("pdfs/abc123", Some("v42"))
            .await
            .unwrap();
        assert!(url.contains("pdfs/abc123"));
        assert!(url.contains("versionId=v42"));

        let unversioned = client.presigned_url("pdfs/abc123", None).await.unwrap();
        assert!(!unversioned.contains("versionId"));
    }
}
