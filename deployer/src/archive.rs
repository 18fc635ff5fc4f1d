//! Archive naming and upload.
//!
//! An archive is named `<application>-<version>.<ext>`; the last `-` separated
//! segment of the file stem is the version label and everything before it is
//! the application name. Uploading is idempotent per version: if the platform
//! already lists the version, nothing is uploaded or registered.

use crate::error::{DeployError, DeployResult};
use bytes::Bytes;
use platform::{ArtifactStorage, CreateApplicationVersionRequest, DeploymentPlatform, SourceBundle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveName {
    /// File name including extension, used as the object key.
    pub archive_name: String,
    pub application_name: String,
    pub version_label: String,
}

impl ArchiveName {
    pub fn parse(path: impl AsRef<Path>) -> DeployResult<Self> {
        let path = path.as_ref();
        let invalid = || DeployError::InvalidArchiveName {
            file_name: path.display().to_string(),
        };

        let archive_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(invalid)?
            .to_string();
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(invalid)?;

        let (application_name, version_label) = stem.rsplit_once('-').ok_or_else(invalid)?;
        if application_name.is_empty() || version_label.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            archive_name,
            application_name: application_name.to_string(),
            version_label: version_label.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    AlreadyUploaded,
    Uploaded { bucket: String },
}

#[derive(Debug, Clone)]
pub struct UploadedArchive {
    pub archive: ArchiveName,
    pub status: UploadStatus,
}

pub struct ArchiveUploader {
    platform: Arc<dyn DeploymentPlatform>,
    storage: Arc<dyn ArtifactStorage>,
}

impl ArchiveUploader {
    pub fn new(platform: Arc<dyn DeploymentPlatform>, storage: Arc<dyn ArtifactStorage>) -> Self {
        Self { platform, storage }
    }

    pub async fn already_uploaded(
        &self,
        application_name: &str,
        version_label: &str,
    ) -> DeployResult<bool> {
        let versions = self
            .platform
            .describe_application_versions(application_name, &[version_label.to_string()])
            .await?;
        Ok(!versions.is_empty())
    }

    pub async fn create_storage_location(&self) -> DeployResult<String> {
        Ok(self.platform.create_storage_location().await?)
    }

    pub async fn upload_to_storage(
        &self,
        bucket: &str,
        archive_name: &str,
        path: &Path,
    ) -> DeployResult<()> {
        info!("Uploading {} to bucket {}...", archive_name, bucket);

        let body = tokio::fs::read(path)
            .await
            .map_err(|source| DeployError::ArchiveRead {
                path: path.to_path_buf(),
                source,
            })?;

        self.storage
            .put_object(bucket, archive_name, Bytes::from(body))
            .await?;
        Ok(())
    }

    /// Makes the uploaded bundle available to the platform as an application
    /// version, creating the application if needed.
    pub async fn register_version(
        &self,
        application_name: &str,
        version_label: &str,
        archive_name: &str,
        bucket: &str,
    ) -> DeployResult<()> {
        info!(
            "Making version {} of {} available to the platform...",
            version_label, application_name
        );

        let request = CreateApplicationVersionRequest::new(
            application_name,
            version_label,
            SourceBundle {
                bucket: bucket.to_string(),
                key: archive_name.to_string(),
            },
        );
        self.platform.create_application_version(request).await?;
        Ok(())
    }

    pub async fn upload(&self, path: impl AsRef<Path>) -> DeployResult<UploadedArchive> {
        let path = path.as_ref();
        let archive = ArchiveName::parse(path)?;

        if self
            .already_uploaded(&archive.application_name, &archive.version_label)
            .await?
        {
            info!("{} is already uploaded.", archive.version_label);
            return Ok(UploadedArchive {
                archive,
                status: UploadStatus::AlreadyUploaded,
            });
        }

        let bucket = self.create_storage_location().await?;
        self.upload_to_storage(&bucket, &archive.archive_name, path)
            .await?;
        self.register_version(
            &archive.application_name,
            &archive.version_label,
            &archive.archive_name,
            &bucket,
        )
        .await?;

        Ok(UploadedArchive {
            archive,
            status: UploadStatus::Uploaded { bucket },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::{InMemoryPlatform, InMemoryStorage};
    use std::io::Write;

    fn uploader() -> (Arc<InMemoryPlatform>, Arc<InMemoryStorage>, ArchiveUploader) {
        let platform = Arc::new(InMemoryPlatform::new());
        let storage = Arc::new(InMemoryStorage::new());
        let uploader = ArchiveUploader::new(platform.clone(), storage.clone());
        (platform, storage, uploader)
    }

    #[test]
    fn test_parse_file_name() {
        let parsed = ArchiveName::parse("/foo/bar/app-name-version.zip").unwrap();
        assert_eq!(parsed.archive_name, "app-name-version.zip");
        assert_eq!(parsed.version_label, "version");
        assert_eq!(parsed.application_name, "app-name");

        let parsed = ArchiveName::parse("/foo/bar/foo-version.zip").unwrap();
        assert_eq!(parsed.archive_name, "foo-version.zip");
        assert_eq!(parsed.version_label, "version");
        assert_eq!(parsed.application_name, "foo");

        let parsed = ArchiveName::parse("website-a-4543cbf.zip").unwrap();
        assert_eq!(parsed.application_name, "website-a");
        assert_eq!(parsed.version_label, "4543cbf");
    }

    #[test]
    fn test_parse_strips_only_last_extension() {
        let parsed = ArchiveName::parse("dist/api-1.2.3.tar.gz").unwrap();
        assert_eq!(parsed.archive_name, "api-1.2.3.tar.gz");
        assert_eq!(parsed.application_name, "api");
        assert_eq!(parsed.version_label, "1.2.3.tar");
    }

    #[test]
    fn test_parse_rejects_invalid_names() {
        for name in ["/foo/bar/foo.zip", "-1d595d3.zip", "tech-website-.zip", "/"] {
            let result = ArchiveName::parse(name);
            assert!(
                matches!(result, Err(DeployError::InvalidArchiveName { .. })),
                "expected {} to be rejected",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_already_uploaded() {
        let (platform, _, uploader) = uploader();
        assert!(!uploader.already_uploaded("tech-website", "e812ud").await.unwrap());

        platform.insert_application_version("tech-website", "e812ud");
        assert!(uploader.already_uploaded("tech-website", "e812ud").await.unwrap());
        assert!(!uploader.already_uploaded("tech-website", "foo").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_fails_before_remote_calls_on_invalid_name() {
        let (platform, _, uploader) = uploader();
        let result = uploader.upload("/foo/bar/foo.zip").await;
        assert!(matches!(result, Err(DeployError::InvalidArchiveName { .. })));
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_skips_upload_when_version_exists() {
        let (platform, _, uploader) = uploader();
        platform.insert_application_version("foo", "bar");

        let uploaded = uploader.upload("/foo/bar/foo-bar.zip").await.unwrap();
        assert_eq!(uploaded.status, UploadStatus::AlreadyUploaded);
        assert_eq!(platform.call_count("CreateStorageLocation"), 0);
        assert_eq!(platform.call_count("CreateApplicationVersion"), 0);
    }

    #[tokio::test]
    async fn test_uploads_and_registers_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo-bar.zip");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"archive bytes")
            .unwrap();

        let (platform, storage, uploader) = uploader();
        let uploaded = uploader.upload(&path).await.unwrap();

        let bucket = platform.storage_bucket().to_string();
        assert_eq!(
            uploaded.status,
            UploadStatus::Uploaded {
                bucket: bucket.clone()
            }
        );
        assert_eq!(
            platform.calls(),
            vec![
                "DescribeApplicationVersions",
                "CreateStorageLocation",
                "CreateApplicationVersion"
            ]
        );
        assert_eq!(platform.version_labels("foo"), vec!["bar"]);

        let stored = storage.get_object(&bucket, "foo-bar.zip").await.unwrap();
        assert_eq!(stored.as_deref(), Some(&b"archive bytes"[..]));
    }

    #[tokio::test]
    async fn test_missing_archive_file_is_reported() {
        let (platform, _, uploader) = uploader();
        let result = uploader.upload("/nonexistent/foo-bar.zip").await;
        assert!(matches!(result, Err(DeployError::ArchiveRead { .. })));
        assert_eq!(platform.call_count("CreateApplicationVersion"), 0);
    }
}
