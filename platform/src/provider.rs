use crate::types::{
    ApplicationVersion, CreateApplicationVersionRequest, CreateEnvironmentRequest,
    EnvironmentDescription, EnvironmentQuery, UpdateEnvironmentRequest,
};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error("Storage error for '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Unexpected response from {operation}: {message}")]
    UnexpectedResponse {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PlatformError {
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            operation,
            message: message.into(),
        }
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Application version and environment management on the hosting platform.
#[async_trait]
pub trait DeploymentPlatform: Send + Sync {
    /// Lists versions of `application_name`, restricted to `version_labels`
    /// when that slice is non-empty.
    async fn describe_application_versions(
        &self,
        application_name: &str,
        version_labels: &[String],
    ) -> PlatformResult<Vec<ApplicationVersion>>;

    /// Returns the bucket the platform uses for source bundles, creating it
    /// on first use.
    async fn create_storage_location(&self) -> PlatformResult<String>;

    async fn create_application_version(
        &self,
        request: CreateApplicationVersionRequest,
    ) -> PlatformResult<ApplicationVersion>;

    async fn delete_application_version(
        &self,
        application_name: &str,
        version_label: &str,
        delete_source_bundle: bool,
    ) -> PlatformResult<()>;

    async fn describe_environments(
        &self,
        query: EnvironmentQuery,
    ) -> PlatformResult<Vec<EnvironmentDescription>>;

    async fn check_dns_availability(&self, cname_prefix: &str) -> PlatformResult<bool>;

    async fn create_environment(
        &self,
        request: CreateEnvironmentRequest,
    ) -> PlatformResult<EnvironmentDescription>;

    async fn update_environment(
        &self,
        request: UpdateEnvironmentRequest,
    ) -> PlatformResult<EnvironmentDescription>;

    async fn terminate_environment(
        &self,
        environment_name: &str,
    ) -> PlatformResult<EnvironmentDescription>;

    async fn delete_application(
        &self,
        application_name: &str,
        terminate_env_by_force: bool,
    ) -> PlatformResult<()>;

    fn platform_name(&self) -> &'static str;
}

/// Object storage for source bundles.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> PlatformResult<()>;

    fn storage_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let error = PlatformError::service("DescribeEnvironments", "access denied");
        assert_eq!(
            error.to_string(),
            "DescribeEnvironments failed: access denied"
        );

        let error = PlatformError::InvalidConfig {
            message: "Region cannot be empty".to_string(),
        };
        assert!(error.to_string().contains("Region cannot be empty"));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<Vec<String>>("{not: [a list").unwrap_err();
        let error: PlatformError = yaml_error.into();
        assert!(matches!(error, PlatformError::Yaml(_)));
    }
}
