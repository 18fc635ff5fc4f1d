//! Deployment orchestration.
//!
//! A deploy runs through these phases:
//! 1. Uploading: parse the archive name, upload and register the version
//!    unless the platform already has it
//! 2. Inspecting: look up the target environment
//! 3. Updating (environment exists) or Creating (it does not)
//! 4. AwaitingTransition: wait while the environment is `Updating` or `Launching`
//! 5. VerifyingHealth: wait until `Ready` and `Green`
//! 6. Completed: report the deployment

use crate::archive::{ArchiveUploader, UploadStatus};
use crate::deployment_info::DeploymentInfo;
use crate::environment::{EnvironmentManager, PollConfig};
use crate::error::{DeployError, DeployResult};
use platform::{
    ArtifactStorage, DeploymentPlatform, EnvironmentDescription, EnvironmentStatus,
    EnvironmentTier, OptionSetting, Tag,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Archive to deploy, named `<application>-<version>.<ext>`.
    pub archive_path: PathBuf,
    pub environment_name: String,
    /// Required when the environment has to be created.
    pub solution_stack_name: Option<String>,
    pub option_settings: Vec<OptionSetting>,
    pub tags: Vec<Tag>,
    pub tier: EnvironmentTier,
}

impl DeployRequest {
    pub fn new(archive_path: impl Into<PathBuf>, environment_name: impl Into<String>) -> Self {
        Self {
            archive_path: archive_path.into(),
            environment_name: environment_name.into(),
            solution_stack_name: None,
            option_settings: Vec::new(),
            tags: Vec::new(),
            tier: EnvironmentTier::default(),
        }
    }

    pub fn with_solution_stack(mut self, solution_stack_name: impl Into<String>) -> Self {
        self.solution_stack_name = Some(solution_stack_name.into());
        self
    }

    pub fn with_option_settings(mut self, option_settings: Vec<OptionSetting>) -> Self {
        self.option_settings = option_settings;
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tier(mut self, tier: EnvironmentTier) -> Self {
        self.tier = tier;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPhase {
    Uploading,
    Inspecting,
    Updating,
    Creating,
    AwaitingTransition { from: EnvironmentStatus },
    VerifyingHealth,
    Completed,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploading => f.write_str("uploading"),
            Self::Inspecting => f.write_str("inspecting"),
            Self::Updating => f.write_str("updating"),
            Self::Creating => f.write_str("creating"),
            Self::AwaitingTransition { from } => write!(f, "awaiting transition from {}", from),
            Self::VerifyingHealth => f.write_str("verifying health"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

/// Outcome of a deploy, with the phases it went through.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub info: DeploymentInfo,
    pub upload: UploadStatus,
    pub phases: Vec<DeployPhase>,
}

pub struct Application {
    platform: Arc<dyn DeploymentPlatform>,
    archives: ArchiveUploader,
    environments: EnvironmentManager,
}

impl Application {
    pub fn new(platform: Arc<dyn DeploymentPlatform>, storage: Arc<dyn ArtifactStorage>) -> Self {
        Self {
            archives: ArchiveUploader::new(platform.clone(), storage),
            environments: EnvironmentManager::new(platform.clone()),
            platform,
        }
    }

    /// Builds the AWS-backed clients from one set of credentials.
    pub fn from_config(config: &platform::AwsConfig) -> DeployResult<Self> {
        let platform = platform::BeanstalkPlatform::new(config)?;
        let storage = platform::S3Storage::new(config.clone())?;
        Ok(Self::new(Arc::new(platform), Arc::new(storage)))
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> DeployResult<Self> {
        self.environments = self.environments.with_poll_config(poll)?;
        Ok(self)
    }

    pub async fn deploy(&self, request: DeployRequest) -> DeployResult<DeploymentInfo> {
        Ok(self.deploy_with_outcome(request).await?.info)
    }

    pub async fn deploy_with_outcome(&self, request: DeployRequest) -> DeployResult<DeployOutcome> {
        let mut run = DeployRun::new(&request);

        debug!(
            environment = %request.environment_name,
            phase = %DeployPhase::Uploading,
            "deploy phase"
        );
        let uploaded = self.archives.upload(&request.archive_path).await?;
        let archive = uploaded.archive;

        loop {
            debug!(environment = %request.environment_name, phase = %run.phase(), "deploy phase");

            match run.step.clone() {
                Step::Inspecting => {
                    let exists = self
                        .environments
                        .status(&request.environment_name)
                        .await?
                        .is_some();
                    if exists {
                        run.transition_to(Step::Updating);
                    } else {
                        run.transition_to(Step::Creating);
                    }
                }
                Step::Updating => {
                    info!(
                        "Deploying {} to {}...",
                        archive.version_label, request.environment_name
                    );
                    self.environments
                        .deploy(
                            &archive.version_label,
                            &request.environment_name,
                            request.solution_stack_name.as_deref(),
                            request.option_settings.clone(),
                        )
                        .await?;
                    run.transition_to(Step::AwaitingTransition {
                        from: EnvironmentStatus::Updating,
                    });
                }
                Step::Creating => {
                    let stack = request.solution_stack_name.as_deref().ok_or_else(|| {
                        DeployError::MissingSolutionStack {
                            environment: request.environment_name.clone(),
                        }
                    })?;
                    info!(
                        "Create stack {} for {} - {}",
                        stack, archive.application_name, archive.version_label
                    );
                    self.environments
                        .create(
                            &archive.application_name,
                            &request.environment_name,
                            &archive.version_label,
                            stack,
                            request.option_settings.clone(),
                            request.tags.clone(),
                            request.tier,
                        )
                        .await?;
                    run.transition_to(Step::AwaitingTransition {
                        from: EnvironmentStatus::Launching,
                    });
                }
                Step::AwaitingTransition { from } => {
                    self.environments
                        .wait_until_status_is_not(&from, &request.environment_name)
                        .await?;
                    run.transition_to(Step::VerifyingHealth);
                }
                Step::VerifyingHealth => {
                    let environment = self
                        .environments
                        .wait_until_healthy(&request.environment_name)
                        .await?;
                    run.complete();

                    info!(
                        environment = %request.environment_name,
                        "Deployment of {} completed",
                        archive.version_label
                    );
                    return Ok(DeployOutcome {
                        info: DeploymentInfo::new(&archive, &environment),
                        upload: uploaded.status,
                        phases: run.history,
                    });
                }
            }
        }
    }

    pub async fn describe_environment(
        &self,
        environment_name: &str,
    ) -> DeployResult<Option<EnvironmentDescription>> {
        self.environments.describe(environment_name).await
    }

    pub async fn terminate_environment(
        &self,
        environment_name: &str,
    ) -> DeployResult<EnvironmentDescription> {
        self.environments.terminate(environment_name).await
    }

    pub async fn clean_application_versions(
        &self,
        application_name: &str,
    ) -> DeployResult<Vec<String>> {
        self.environments
            .clean_application_versions(application_name)
            .await
    }

    pub async fn delete_application(
        &self,
        application_name: &str,
        terminate_env_by_force: bool,
    ) -> DeployResult<()> {
        info!("Deleting application {}...", application_name);
        Ok(self
            .platform
            .delete_application(application_name, terminate_env_by_force)
            .await?)
    }
}

/// Phases the deploy loop can be in once the archive is uploaded.
#[derive(Debug, Clone)]
enum Step {
    Inspecting,
    Updating,
    Creating,
    AwaitingTransition { from: EnvironmentStatus },
    VerifyingHealth,
}

impl From<&Step> for DeployPhase {
    fn from(step: &Step) -> Self {
        match step {
            Step::Inspecting => Self::Inspecting,
            Step::Updating => Self::Updating,
            Step::Creating => Self::Creating,
            Step::AwaitingTransition { from } => Self::AwaitingTransition { from: from.clone() },
            Step::VerifyingHealth => Self::VerifyingHealth,
        }
    }
}

struct DeployRun {
    environment_name: String,
    step: Step,
    history: Vec<DeployPhase>,
}

impl DeployRun {
    fn new(request: &DeployRequest) -> Self {
        Self {
            environment_name: request.environment_name.clone(),
            step: Step::Inspecting,
            history: vec![DeployPhase::Uploading, DeployPhase::Inspecting],
        }
    }

    fn phase(&self) -> DeployPhase {
        DeployPhase::from(&self.step)
    }

    fn transition_to(&mut self, next: Step) {
        self.record(DeployPhase::from(&next));
        self.step = next;
    }

    fn complete(&mut self) {
        self.record(DeployPhase::Completed);
    }

    fn record(&mut self, next: DeployPhase) {
        if let Some(previous) = self.history.last() {
            debug!(
                environment = %self.environment_name,
                "Phase transition: {} → {}",
                previous,
                next
            );
        }
        self.history.push(next);
    }
}
