use crate::error::{DeployError, DeployResult};
use platform::{
    CreateEnvironmentRequest, DeploymentPlatform, EnvironmentDescription, EnvironmentHealth,
    EnvironmentQuery, EnvironmentStatus, EnvironmentTier, OptionSetting, Tag,
    UpdateEnvironmentRequest,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Timing for the status and health polling loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval: Duration,
    pub status_change_timeout: Duration,
    pub healthy_timeout: Duration,
    /// Pause between application version deletions.
    pub cleanup_pause: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            status_change_timeout: Duration::from_secs(1200),
            healthy_timeout: Duration::from_secs(300),
            cleanup_pause: Duration::from_secs(1),
        }
    }
}

impl PollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_status_change_timeout(mut self, timeout: Duration) -> Self {
        self.status_change_timeout = timeout;
        self
    }

    pub fn with_healthy_timeout(mut self, timeout: Duration) -> Self {
        self.healthy_timeout = timeout;
        self
    }

    pub fn with_cleanup_pause(mut self, pause: Duration) -> Self {
        self.cleanup_pause = pause;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.interval.is_zero() {
            return Err("Poll interval must be greater than 0".to_string());
        }

        if self.interval > self.status_change_timeout || self.interval > self.healthy_timeout {
            return Err("Poll interval cannot exceed the polling timeouts".to_string());
        }

        Ok(())
    }
}

/// Environment lifecycle operations on top of a [`DeploymentPlatform`].
pub struct EnvironmentManager {
    platform: Arc<dyn DeploymentPlatform>,
    poll: PollConfig,
}

impl EnvironmentManager {
    pub fn new(platform: Arc<dyn DeploymentPlatform>) -> Self {
        Self {
            platform,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> DeployResult<Self> {
        poll.validate()
            .map_err(|message| DeployError::InvalidPollConfig { message })?;
        self.poll = poll;
        Ok(self)
    }

    /// The live (non-deleted) environment with this name, if any.
    pub async fn describe(
        &self,
        environment_name: &str,
    ) -> DeployResult<Option<EnvironmentDescription>> {
        let environments = self
            .platform
            .describe_environments(EnvironmentQuery::by_name(environment_name))
            .await?;
        Ok(environments.into_iter().next())
    }

    pub async fn status(&self, environment_name: &str) -> DeployResult<Option<EnvironmentStatus>> {
        Ok(self
            .describe(environment_name)
            .await?
            .map(|environment| environment.status))
    }

    pub async fn check_dns_availability(&self, environment_name: &str) -> DeployResult<bool> {
        info!("Check {} availability", environment_name);
        Ok(self.platform.check_dns_availability(environment_name).await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        application_name: &str,
        environment_name: &str,
        version_label: &str,
        solution_stack_name: &str,
        option_settings: Vec<OptionSetting>,
        tags: Vec<Tag>,
        tier: EnvironmentTier,
    ) -> DeployResult<EnvironmentDescription> {
        if !self.check_dns_availability(environment_name).await? {
            return Err(DeployError::DnsUnavailable {
                environment: environment_name.to_string(),
            });
        }

        let mut request = CreateEnvironmentRequest::new(
            application_name,
            environment_name,
            version_label,
            solution_stack_name,
        )
        .with_option_settings(option_settings)
        .with_tags(tags)
        .with_tier(tier);

        if tier == EnvironmentTier::WebServer {
            request = request.with_cname_prefix(environment_name);
        }

        Ok(self.platform.create_environment(request).await?)
    }

    /// Rolls `version_label` out to an existing environment.
    pub async fn deploy(
        &self,
        version_label: &str,
        environment_name: &str,
        solution_stack_name: Option<&str>,
        option_settings: Vec<OptionSetting>,
    ) -> DeployResult<EnvironmentDescription> {
        let mut request = UpdateEnvironmentRequest::new(environment_name, version_label)
            .with_option_settings(option_settings);

        if let Some(stack) = solution_stack_name {
            request = request.with_solution_stack(stack);
        }

        Ok(self.platform.update_environment(request).await?)
    }

    /// Polls until the status differs from `old_status` or the status-change
    /// timeout runs out. Returns the last observed status either way.
    pub async fn wait_until_status_is_not(
        &self,
        old_status: &EnvironmentStatus,
        environment_name: &str,
    ) -> DeployResult<Option<EnvironmentStatus>> {
        info!(
            "Waiting for {} to finish {}",
            environment_name,
            old_status.as_str().to_lowercase()
        );

        let mut time_left = self.poll.status_change_timeout;
        let mut status = self.status(environment_name).await?;

        while !time_left.is_zero() && status.as_ref() == Some(old_status) {
            debug!(environment = %environment_name, status = %old_status, ?time_left, "still waiting");
            status = self.status(environment_name).await?;
            time_left = time_left.saturating_sub(self.poll.interval);
            sleep(self.poll.interval).await;
        }

        if status.as_ref() == Some(old_status) {
            warn!(
                environment = %environment_name,
                status = %old_status,
                "Status did not change within {}s",
                self.poll.status_change_timeout.as_secs()
            );
        }

        Ok(status)
    }

    /// Polls until the environment is `Ready` and `Green`.
    ///
    /// Fails immediately if the environment disappears, and with
    /// [`DeployError::Unhealthy`] once the healthy timeout runs out.
    pub async fn wait_until_healthy(
        &self,
        environment_name: &str,
    ) -> DeployResult<EnvironmentDescription> {
        info!("Waiting until {} is healthy", environment_name);

        let mut time_left = self.poll.healthy_timeout;
        let mut last_seen: Option<EnvironmentDescription> = None;

        while !time_left.is_zero() {
            let environment = self.describe(environment_name).await?.ok_or_else(|| {
                DeployError::EnvironmentVanished {
                    environment: environment_name.to_string(),
                }
            })?;

            if environment.is_healthy() {
                return Ok(environment);
            }

            debug!(
                environment = %environment_name,
                status = %environment.status,
                health = %environment.health,
                ?time_left,
                "not healthy yet"
            );
            last_seen = Some(environment);
            time_left = time_left.saturating_sub(self.poll.interval);
            sleep(self.poll.interval).await;
        }

        let (status, health) = last_seen
            .map(|environment| (environment.status, environment.health))
            .unwrap_or_else(|| {
                (
                    EnvironmentStatus::Unknown("unknown".to_string()),
                    EnvironmentHealth::Unknown("unknown".to_string()),
                )
            });

        Err(DeployError::Unhealthy {
            environment: environment_name.to_string(),
            status,
            health,
        })
    }

    pub async fn terminate(&self, environment_name: &str) -> DeployResult<EnvironmentDescription> {
        info!("Terminating Environment named {}...", environment_name);
        Ok(self.platform.terminate_environment(environment_name).await?)
    }

    pub async fn delete_application_version(
        &self,
        application_name: &str,
        version_label: &str,
        delete_source_bundle: bool,
    ) -> DeployResult<()> {
        Ok(self
            .platform
            .delete_application_version(application_name, version_label, delete_source_bundle)
            .await?)
    }

    /// Deletes every version of `application_name` that no live environment
    /// is running, source bundles included. Returns the deleted labels.
    pub async fn clean_application_versions(
        &self,
        application_name: &str,
    ) -> DeployResult<Vec<String>> {
        info!("Clean application versions of {}...", application_name);

        let versions = self
            .platform
            .describe_application_versions(application_name, &[])
            .await?;

        let in_use: HashSet<String> = self
            .platform
            .describe_environments(EnvironmentQuery::by_application(application_name))
            .await?
            .into_iter()
            .filter_map(|environment| environment.version_label)
            .collect();

        let to_delete: Vec<String> = versions
            .into_iter()
            .map(|version| version.version_label)
            .filter(|label| !in_use.contains(label))
            .collect();

        for version_label in &to_delete {
            info!("Delete version: {}", version_label);
            sleep(self.poll.cleanup_pause).await;
            self.delete_application_version(application_name, version_label, true)
                .await?;
        }

        Ok(to_delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::InMemoryPlatform;

    const ENV: &str = "tech-website-prod";

    fn manager() -> (Arc<InMemoryPlatform>, EnvironmentManager) {
        let platform = Arc::new(InMemoryPlatform::new());
        let manager = EnvironmentManager::new(platform.clone());
        (platform, manager)
    }

    fn existing(status: EnvironmentStatus, health: EnvironmentHealth) -> EnvironmentDescription {
        EnvironmentDescription::new(ENV)
            .with_application("tech-website")
            .with_version_label("foo")
            .with_state(status, health)
    }

    #[test]
    fn test_poll_config_defaults() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.status_change_timeout, Duration::from_secs(1200));
        assert_eq!(config.healthy_timeout, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_config_validation() {
        let config = PollConfig::new().with_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = PollConfig::new().with_healthy_timeout(Duration::from_secs(1));
        assert!(config.validate().is_err());

        let (_, manager) = manager();
        let result = manager.with_poll_config(PollConfig::new().with_interval(Duration::ZERO));
        assert!(matches!(result, Err(DeployError::InvalidPollConfig { .. })));
    }

    #[tokio::test]
    async fn test_describe_and_status() {
        let (platform, manager) = manager();
        assert!(manager.describe(ENV).await.unwrap().is_none());
        assert_eq!(manager.status(ENV).await.unwrap(), None);

        platform.insert_environment(existing(EnvironmentStatus::Ready, EnvironmentHealth::Green));
        let description = manager.describe(ENV).await.unwrap().unwrap();
        assert_eq!(description.environment_name, ENV);
        assert_eq!(
            manager.status(ENV).await.unwrap(),
            Some(EnvironmentStatus::Ready)
        );
    }

    #[tokio::test]
    async fn test_create_fails_when_dns_is_taken() {
        let (platform, manager) = manager();
        platform.reserve_cname(ENV);

        let result = manager
            .create(
                "tech-website",
                ENV,
                "v1",
                "Node.js 18",
                vec![],
                vec![],
                EnvironmentTier::WebServer,
            )
            .await;
        assert!(matches!(result, Err(DeployError::DnsUnavailable { .. })));
        assert_eq!(platform.call_count("CreateEnvironment"), 0);
    }

    #[tokio::test]
    async fn test_create_sets_cname_only_for_web_servers() {
        let (platform, manager) = manager();

        manager
            .create(
                "tech-website",
                ENV,
                "v1",
                "Node.js 18",
                vec![],
                vec![],
                EnvironmentTier::WebServer,
            )
            .await
            .unwrap();
        assert!(platform.environment(ENV).unwrap().cname.is_some());

        let worker = manager
            .create(
                "tech-website",
                "tech-website-jobs",
                "v1",
                "Node.js 18",
                vec![],
                vec![Tag::new("team", "web")],
                EnvironmentTier::Worker,
            )
            .await
            .unwrap();
        assert!(worker.cname.is_none());
        assert_eq!(worker.tier, Some(EnvironmentTier::Worker));
    }

    #[tokio::test]
    async fn test_deploy_keeps_stack_unless_given() {
        let (platform, manager) = manager();
        let mut environment = existing(EnvironmentStatus::Ready, EnvironmentHealth::Green);
        environment.solution_stack_name = Some("Node.js 16".to_string());
        platform.insert_environment(environment);

        manager.deploy("v2", ENV, None, vec![]).await.unwrap();
        let updated = platform.environment(ENV).unwrap();
        assert_eq!(updated.version_label.as_deref(), Some("v2"));
        assert_eq!(updated.solution_stack_name.as_deref(), Some("Node.js 16"));

        manager
            .deploy("v3", ENV, Some("Node.js 18"), vec![])
            .await
            .unwrap();
        let updated = platform.environment(ENV).unwrap();
        assert_eq!(updated.solution_stack_name.as_deref(), Some("Node.js 18"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_status_is_not() {
        let (platform, manager) = manager();
        platform.insert_environment(existing(EnvironmentStatus::Updating, EnvironmentHealth::Grey));
        platform.script_environment(
            ENV,
            [
                (EnvironmentStatus::Updating, EnvironmentHealth::Grey),
                (EnvironmentStatus::Updating, EnvironmentHealth::Grey),
                (EnvironmentStatus::Ready, EnvironmentHealth::Green),
            ],
        );

        let status = manager
            .wait_until_status_is_not(&EnvironmentStatus::Updating, ENV)
            .await
            .unwrap();

        assert_eq!(status, Some(EnvironmentStatus::Ready));
        assert_eq!(platform.call_count("DescribeEnvironments"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_status_is_not_gives_up_after_timeout() {
        let (platform, manager) = manager();
        let manager = manager
            .with_poll_config(
                PollConfig::new()
                    .with_interval(Duration::from_secs(5))
                    .with_status_change_timeout(Duration::from_secs(20)),
            )
            .unwrap();
        platform.insert_environment(existing(
            EnvironmentStatus::Launching,
            EnvironmentHealth::Grey,
        ));

        let status = manager
            .wait_until_status_is_not(&EnvironmentStatus::Launching, ENV)
            .await
            .unwrap();

        assert_eq!(status, Some(EnvironmentStatus::Launching));
        assert_eq!(platform.call_count("DescribeEnvironments"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_healthy() {
        let (platform, manager) = manager();
        platform.insert_environment(existing(EnvironmentStatus::Ready, EnvironmentHealth::Grey));
        platform.script_environment(
            ENV,
            [
                (EnvironmentStatus::Ready, EnvironmentHealth::Yellow),
                (EnvironmentStatus::Updating, EnvironmentHealth::Green),
                (EnvironmentStatus::Ready, EnvironmentHealth::Green),
            ],
        );

        let description = manager.wait_until_healthy(ENV).await.unwrap();
        assert!(description.is_healthy());
        assert_eq!(platform.call_count("DescribeEnvironments"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_healthy_times_out() {
        let (platform, manager) = manager();
        platform.insert_environment(existing(EnvironmentStatus::Ready, EnvironmentHealth::Red));

        let started = tokio::time::Instant::now();
        let result = manager.wait_until_healthy(ENV).await;

        match result {
            Err(DeployError::Unhealthy {
                environment,
                status,
                health,
            }) => {
                assert_eq!(environment, ENV);
                assert_eq!(status, EnvironmentStatus::Ready);
                assert_eq!(health, EnvironmentHealth::Red);
            }
            other => panic!("expected Unhealthy, got {:?}", other),
        }
        assert_eq!(platform.call_count("DescribeEnvironments"), 60);
        assert_eq!(started.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_healthy_fails_when_environment_vanishes() {
        let (platform, manager) = manager();
        platform.insert_environment(existing(EnvironmentStatus::Ready, EnvironmentHealth::Red));
        platform.script_environment(
            ENV,
            [
                (EnvironmentStatus::Ready, EnvironmentHealth::Red),
                (EnvironmentStatus::Terminated, EnvironmentHealth::Grey),
            ],
        );

        let result = manager.wait_until_healthy(ENV).await;
        assert!(matches!(result, Err(DeployError::EnvironmentVanished { .. })));
        assert_eq!(platform.call_count("DescribeEnvironments"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_application_versions_keeps_versions_in_use() {
        let (platform, manager) = manager();
        for label in ["foo", "bar", "baz"] {
            platform.insert_application_version("tech-website", label);
        }
        platform.insert_application_version("other-app", "bar");
        platform.insert_environment(existing(EnvironmentStatus::Ready, EnvironmentHealth::Green));

        let deleted = manager
            .clean_application_versions("tech-website")
            .await
            .unwrap();

        assert_eq!(deleted, vec!["bar", "baz"]);
        assert_eq!(platform.version_labels("tech-website"), vec!["foo"]);
        assert_eq!(platform.version_labels("other-app"), vec!["bar"]);
        assert_eq!(platform.call_count("DeleteApplicationVersion"), 2);
    }

    #[tokio::test]
    async fn test_terminate() {
        let (platform, manager) = manager();
        platform.insert_environment(existing(EnvironmentStatus::Ready, EnvironmentHealth::Green));

        let terminated = manager.terminate(ENV).await.unwrap();
        assert_eq!(terminated.status, EnvironmentStatus::Terminated);
        assert!(manager.describe(ENV).await.unwrap().is_none());
    }
}
