//! S3 upload of source bundles.
//!
//! The platform hands out the bucket name at deploy time, so a store is built
//! per upload rather than once per client.

use crate::config::AwsConfig;
use crate::provider::{ArtifactStorage, PlatformError, PlatformResult};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::{debug, info};

pub struct S3Storage {
    config: AwsConfig,
}

impl S3Storage {
    pub fn new(config: AwsConfig) -> PlatformResult<Self> {
        config
            .validate()
            .map_err(|message| PlatformError::InvalidConfig { message })?;
        Ok(Self { config })
    }

    fn store_for(&self, bucket: &str) -> PlatformResult<AmazonS3> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.config.region)
            .with_access_key_id(&self.config.access_key_id)
            .with_secret_access_key(&self.config.secret_access_key);

        if let Some(token) = &self.config.session_token {
            builder = builder.with_token(token);
        }

        if let Some(endpoint) = &self.config.endpoint_url {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        builder.build().map_err(|e| PlatformError::InvalidConfig {
            message: format!("failed to create S3 client for bucket '{}': {}", bucket, e),
        })
    }
}

#[async_trait]
impl ArtifactStorage for S3Storage {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> PlatformResult<()> {
        debug!(bucket = %bucket, key = %key, "Uploading to S3");

        let store = self.store_for(bucket)?;
        let path = ObjectPath::parse(key).map_err(|e| PlatformError::InvalidConfig {
            message: format!("invalid object key '{}': {}", key, e),
        })?;
        let size = body.len();

        store
            .put(&path, body.into())
            .await
            .map_err(|e| PlatformError::Storage {
                key: key.to_owned(),
                source: e,
            })?;

        info!(bucket = %bucket, key = %key, size, "Uploaded to S3");

        Ok(())
    }

    fn storage_name(&self) -> &'static str {
        "s3"
    }
}
