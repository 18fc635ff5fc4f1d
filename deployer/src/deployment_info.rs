use crate::archive::ArchiveName;
use crate::error::DeployResult;
use chrono::{DateTime, Utc};
use platform::{EnvironmentDescription, EnvironmentHealth, EnvironmentStatus};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// What was deployed where. Written as JSON for follow-up scripting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub app_name: String,
    pub app_version: String,
    pub env_name: String,
    pub env_url: Option<String>,
    pub env_id: Option<String>,
    pub status: EnvironmentStatus,
    pub health: EnvironmentHealth,
    pub deployed_at: DateTime<Utc>,
}

impl DeploymentInfo {
    pub fn new(archive: &ArchiveName, environment: &EnvironmentDescription) -> Self {
        Self {
            app_name: environment
                .application_name
                .clone()
                .unwrap_or_else(|| archive.application_name.clone()),
            app_version: environment
                .version_label
                .clone()
                .unwrap_or_else(|| archive.version_label.clone()),
            env_name: environment.environment_name.clone(),
            env_url: environment.cname.clone(),
            env_id: environment.environment_id.clone(),
            status: environment.status.clone(),
            health: environment.health.clone(),
            deployed_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> DeployResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn write_json(&self, path: impl AsRef<Path>) -> DeployResult<()> {
        let path = path.as_ref();
        tokio::fs::write(path, self.to_json()?).await?;
        info!(path = %path.display(), "Deployment info written");
        Ok(())
    }
}
