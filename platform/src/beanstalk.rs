use crate::config::AwsConfig;
use crate::provider::{DeploymentPlatform, PlatformError, PlatformResult};
use crate::types::{
    ApplicationVersion, CreateApplicationVersionRequest, CreateEnvironmentRequest,
    EnvironmentDescription, EnvironmentHealth, EnvironmentQuery, EnvironmentStatus, OptionSetting,
    SourceBundle, Tag, UpdateEnvironmentRequest,
};
use async_trait::async_trait;
use aws_sdk_elasticbeanstalk as eb;
use eb::config::{BehaviorVersion, Credentials, Region};
use eb::error::DisplayErrorContext;
use eb::types::{
    ApplicationVersionDescription, ConfigurationOptionSetting, EnvironmentTier as SdkTier,
    S3Location, Tag as SdkTag,
};
use tracing::{debug, info};

const CREDENTIALS_PROVIDER: &str = "deployer-key-file";

/// Create, update and describe output shapes share the same accessors but
/// not a type, so the conversion is spelled once here.
macro_rules! environment_from {
    ($source:expr) => {{
        let source = $source;
        EnvironmentDescription {
            environment_id: source.environment_id().map(str::to_string),
            environment_name: source.environment_name().unwrap_or_default().to_string(),
            application_name: source.application_name().map(str::to_string),
            version_label: source.version_label().map(str::to_string),
            solution_stack_name: source.solution_stack_name().map(str::to_string),
            cname: source.cname().map(str::to_string),
            endpoint_url: source.endpoint_url().map(str::to_string),
            status: source
                .status()
                .map(|status| EnvironmentStatus::from(status.as_str()))
                .unwrap_or_else(|| EnvironmentStatus::Unknown(String::new())),
            health: source
                .health()
                .map(|health| EnvironmentHealth::from(health.as_str()))
                .unwrap_or_else(|| EnvironmentHealth::Unknown(String::new())),
            tier: source
                .tier()
                .and_then(|tier| tier.name())
                .and_then(|name| name.parse().ok()),
        }
    }};
}

fn service_error<E>(operation: &'static str) -> impl FnOnce(E) -> PlatformError
where
    E: std::error::Error,
{
    move |err| PlatformError::service(operation, DisplayErrorContext(err).to_string())
}

/// Elastic Beanstalk backed [`DeploymentPlatform`].
pub struct BeanstalkPlatform {
    client: eb::Client,
    region: String,
}

impl BeanstalkPlatform {
    pub fn new(config: &AwsConfig) -> PlatformResult<Self> {
        config
            .validate()
            .map_err(|message| PlatformError::InvalidConfig { message })?;

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            config.session_token.clone(),
            None,
            CREDENTIALS_PROVIDER,
        );

        let mut builder = eb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint_url) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        info!(region = %config.region, "Elastic Beanstalk client created");

        Ok(Self {
            client: eb::Client::from_conf(builder.build()),
            region: config.region.clone(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn convert_version(version: &ApplicationVersionDescription) -> ApplicationVersion {
        ApplicationVersion {
            application_name: version.application_name().unwrap_or_default().to_string(),
            version_label: version.version_label().unwrap_or_default().to_string(),
            source_bundle: version.source_bundle().map(|bundle| SourceBundle {
                bucket: bundle.s3_bucket().unwrap_or_default().to_string(),
                key: bundle.s3_key().unwrap_or_default().to_string(),
            }),
            status: version.status().map(|status| status.as_str().to_string()),
        }
    }

    fn convert_option_setting(setting: &OptionSetting) -> ConfigurationOptionSetting {
        ConfigurationOptionSetting::builder()
            .namespace(&setting.namespace)
            .option_name(&setting.option_name)
            .value(&setting.value)
            .set_resource_name(setting.resource_name.clone())
            .build()
    }

    fn convert_option_settings(settings: &[OptionSetting]) -> Option<Vec<ConfigurationOptionSetting>> {
        (!settings.is_empty()).then(|| settings.iter().map(Self::convert_option_setting).collect())
    }

    fn convert_tags(tags: &[Tag]) -> Option<Vec<SdkTag>> {
        (!tags.is_empty()).then(|| {
            tags.iter()
                .map(|tag| SdkTag::builder().key(&tag.key).value(&tag.value).build())
                .collect()
        })
    }
}

#[async_trait]
impl DeploymentPlatform for BeanstalkPlatform {
    async fn describe_application_versions(
        &self,
        application_name: &str,
        version_labels: &[String],
    ) -> PlatformResult<Vec<ApplicationVersion>> {
        debug!(application = %application_name, labels = ?version_labels, "DescribeApplicationVersions");

        let output = self
            .client
            .describe_application_versions()
            .application_name(application_name)
            .set_version_labels((!version_labels.is_empty()).then(|| version_labels.to_vec()))
            .send()
            .await
            .map_err(service_error("DescribeApplicationVersions"))?;

        Ok(output
            .application_versions()
            .iter()
            .map(Self::convert_version)
            .collect())
    }

    async fn create_storage_location(&self) -> PlatformResult<String> {
        debug!("CreateStorageLocation");

        let output = self
            .client
            .create_storage_location()
            .send()
            .await
            .map_err(service_error("CreateStorageLocation"))?;

        output
            .s3_bucket()
            .map(str::to_string)
            .ok_or(PlatformError::UnexpectedResponse {
                operation: "CreateStorageLocation",
                message: "response did not include a bucket".to_string(),
            })
    }

    async fn create_application_version(
        &self,
        request: CreateApplicationVersionRequest,
    ) -> PlatformResult<ApplicationVersion> {
        debug!(
            application = %request.application_name,
            version = %request.version_label,
            "CreateApplicationVersion"
        );

        let bundle = S3Location::builder()
            .s3_bucket(&request.source_bundle.bucket)
            .s3_key(&request.source_bundle.key)
            .build();

        let output = self
            .client
            .create_application_version()
            .application_name(&request.application_name)
            .version_label(&request.version_label)
            .source_bundle(bundle)
            .auto_create_application(request.auto_create_application)
            .send()
            .await
            .map_err(service_error("CreateApplicationVersion"))?;

        Ok(output
            .application_version()
            .map(Self::convert_version)
            .unwrap_or(ApplicationVersion {
                application_name: request.application_name,
                version_label: request.version_label,
                source_bundle: Some(request.source_bundle),
                status: None,
            }))
    }

    async fn delete_application_version(
        &self,
        application_name: &str,
        version_label: &str,
        delete_source_bundle: bool,
    ) -> PlatformResult<()> {
        debug!(application = %application_name, version = %version_label, "DeleteApplicationVersion");

        self.client
            .delete_application_version()
            .application_name(application_name)
            .version_label(version_label)
            .delete_source_bundle(delete_source_bundle)
            .send()
            .await
            .map_err(service_error("DeleteApplicationVersion"))?;

        Ok(())
    }

    async fn describe_environments(
        &self,
        query: EnvironmentQuery,
    ) -> PlatformResult<Vec<EnvironmentDescription>> {
        debug!(?query, "DescribeEnvironments");

        let environment_names =
            (!query.environment_names.is_empty()).then_some(query.environment_names);

        let output = self
            .client
            .describe_environments()
            .set_application_name(query.application_name)
            .set_environment_names(environment_names)
            .include_deleted(query.include_deleted)
            .send()
            .await
            .map_err(service_error("DescribeEnvironments"))?;

        Ok(output
            .environments()
            .iter()
            .map(|environment| environment_from!(environment))
            .collect())
    }

    async fn check_dns_availability(&self, cname_prefix: &str) -> PlatformResult<bool> {
        debug!(cname_prefix = %cname_prefix, "CheckDNSAvailability");

        let output = self
            .client
            .check_dns_availability()
            .cname_prefix(cname_prefix)
            .send()
            .await
            .map_err(service_error("CheckDNSAvailability"))?;

        Ok(output.available().unwrap_or(false))
    }

    async fn create_environment(
        &self,
        request: CreateEnvironmentRequest,
    ) -> PlatformResult<EnvironmentDescription> {
        debug!(
            application = %request.application_name,
            environment = %request.environment_name,
            tier = %request.tier,
            "CreateEnvironment"
        );

        let tier = SdkTier::builder()
            .name(request.tier.name())
            .r#type(request.tier.tier_type())
            .build();
        let option_settings = Self::convert_option_settings(&request.option_settings);
        let tags = Self::convert_tags(&request.tags);

        let output = self
            .client
            .create_environment()
            .application_name(request.application_name)
            .environment_name(request.environment_name)
            .version_label(request.version_label)
            .solution_stack_name(request.solution_stack_name)
            .set_option_settings(option_settings)
            .set_tags(tags)
            .tier(tier)
            .set_cname_prefix(request.cname_prefix)
            .send()
            .await
            .map_err(service_error("CreateEnvironment"))?;

        Ok(environment_from!(&output))
    }

    async fn update_environment(
        &self,
        request: UpdateEnvironmentRequest,
    ) -> PlatformResult<EnvironmentDescription> {
        debug!(
            environment = %request.environment_name,
            version = %request.version_label,
            "UpdateEnvironment"
        );

        let option_settings = Self::convert_option_settings(&request.option_settings);

        let output = self
            .client
            .update_environment()
            .environment_name(request.environment_name)
            .version_label(request.version_label)
            .set_solution_stack_name(request.solution_stack_name)
            .set_option_settings(option_settings)
            .send()
            .await
            .map_err(service_error("UpdateEnvironment"))?;

        Ok(environment_from!(&output))
    }

    async fn terminate_environment(
        &self,
        environment_name: &str,
    ) -> PlatformResult<EnvironmentDescription> {
        debug!(environment = %environment_name, "TerminateEnvironment");

        let output = self
            .client
            .terminate_environment()
            .environment_name(environment_name)
            .send()
            .await
            .map_err(service_error("TerminateEnvironment"))?;

        Ok(environment_from!(&output))
    }

    async fn delete_application(
        &self,
        application_name: &str,
        terminate_env_by_force: bool,
    ) -> PlatformResult<()> {
        debug!(application = %application_name, terminate_env_by_force, "DeleteApplication");

        self.client
            .delete_application()
            .application_name(application_name)
            .terminate_env_by_force(terminate_env_by_force)
            .send()
            .await
            .map_err(service_error("DeleteApplication"))?;

        Ok(())
    }

    fn platform_name(&self) -> &'static str {
        "elasticbeanstalk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_config() {
        let config = AwsConfig::new("AKIDEXAMPLE", "secret", "");
        let result = BeanstalkPlatform::new(&config);
        assert!(matches!(result, Err(PlatformError::InvalidConfig { .. })));
    }

    #[test]
    fn test_builds_client_for_region() {
        let config = AwsConfig::new("AKIDEXAMPLE", "secret", "eu-central-1")
            .with_endpoint_url("http://localhost:4566");
        let platform = BeanstalkPlatform::new(&config).unwrap();
        assert_eq!(platform.region(), "eu-central-1");
        assert_eq!(platform.platform_name(), "elasticbeanstalk");
    }

    #[test]
    fn test_empty_lists_are_not_sent() {
        assert!(BeanstalkPlatform::convert_option_settings(&[]).is_none());
        assert!(BeanstalkPlatform::convert_tags(&[]).is_none());

        let settings = BeanstalkPlatform::convert_option_settings(&[OptionSetting::new(
            "aws:autoscaling:asg",
            "MaxSize",
            "4",
        )])
        .unwrap();
        assert_eq!(settings[0].option_name(), Some("MaxSize"));
        assert_eq!(settings[0].value(), Some("4"));
    }

    #[test]
    fn test_convert_version_without_bundle() {
        let description = ApplicationVersionDescription::builder()
            .application_name("tech-website")
            .version_label("1d595d3")
            .build();
        let version = BeanstalkPlatform::convert_version(&description);
        assert_eq!(version.application_name, "tech-website");
        assert_eq!(version.version_label, "1d595d3");
        assert!(version.source_bundle.is_none());
    }
}
