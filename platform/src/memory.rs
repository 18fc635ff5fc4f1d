//! In-process stand-ins for the platform and storage services.
//!
//! `InMemoryPlatform` keeps application versions and environments in memory
//! and records every call it receives. Environment status and health can be
//! scripted per environment; each describe call consumes one scripted step.
//! Environments without a script settle to `Ready`/`Green` on the first
//! describe after a create or update.

use crate::provider::{ArtifactStorage, DeploymentPlatform, PlatformError, PlatformResult};
use crate::types::{
    ApplicationVersion, CreateApplicationVersionRequest, CreateEnvironmentRequest,
    EnvironmentDescription, EnvironmentHealth, EnvironmentQuery, EnvironmentStatus,
    UpdateEnvironmentRequest,
};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub type EnvironmentStep = (EnvironmentStatus, EnvironmentHealth);

#[derive(Debug, Default)]
struct MemoryState {
    versions: Vec<ApplicationVersion>,
    environments: BTreeMap<String, EnvironmentDescription>,
    scripts: HashMap<String, VecDeque<EnvironmentStep>>,
    reserved_cnames: HashSet<String>,
    calls: Vec<String>,
    create_requests: Vec<CreateEnvironmentRequest>,
    update_requests: Vec<UpdateEnvironmentRequest>,
    next_environment_id: u64,
}

impl MemoryState {
    fn record(&mut self, operation: &str) {
        self.calls.push(operation.to_string());
    }

    fn is_live(environment: &EnvironmentDescription) -> bool {
        environment.status != EnvironmentStatus::Terminated
    }

    fn settle_when_unscripted(&mut self, environment_name: &str) {
        let script = self.scripts.entry(environment_name.to_string()).or_default();
        if script.is_empty() {
            script.push_back((EnvironmentStatus::Ready, EnvironmentHealth::Green));
        }
    }

    fn advance(&mut self, environment_name: &str) {
        let step = self
            .scripts
            .get_mut(environment_name)
            .and_then(|script| script.pop_front());

        if let (Some((status, health)), Some(environment)) =
            (step, self.environments.get_mut(environment_name))
        {
            environment.status = status;
            environment.health = health;
        }
    }
}

pub struct InMemoryPlatform {
    region: String,
    storage_bucket: String,
    state: Mutex<MemoryState>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self {
            region: "us-east-1".to_string(),
            storage_bucket: "elasticbeanstalk-us-east-1-000000000000".to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = bucket.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn storage_bucket(&self) -> &str {
        &self.storage_bucket
    }

    /// Adds an existing environment. Unscripted environments keep the
    /// status and health they were inserted with.
    pub fn insert_environment(&self, environment: EnvironmentDescription) {
        let mut state = self.state();
        state
            .environments
            .insert(environment.environment_name.clone(), environment);
    }

    pub fn insert_application_version(
        &self,
        application_name: impl Into<String>,
        version_label: impl Into<String>,
    ) {
        self.state().versions.push(ApplicationVersion {
            application_name: application_name.into(),
            version_label: version_label.into(),
            source_bundle: None,
            status: Some("PROCESSED".to_string()),
        });
    }

    /// Queues status/health pairs returned by successive describe calls.
    pub fn script_environment(
        &self,
        environment_name: impl Into<String>,
        steps: impl IntoIterator<Item = EnvironmentStep>,
    ) {
        self.state()
            .scripts
            .entry(environment_name.into())
            .or_default()
            .extend(steps);
    }

    /// Marks a CNAME prefix as taken by someone else.
    pub fn reserve_cname(&self, cname_prefix: impl Into<String>) {
        self.state().reserved_cnames.insert(cname_prefix.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    /// Every create request received, in order.
    pub fn create_requests(&self) -> Vec<CreateEnvironmentRequest> {
        self.state().create_requests.clone()
    }

    /// Every update request received, in order.
    pub fn update_requests(&self) -> Vec<UpdateEnvironmentRequest> {
        self.state().update_requests.clone()
    }

    pub fn environment(&self, environment_name: &str) -> Option<EnvironmentDescription> {
        self.state().environments.get(environment_name).cloned()
    }

    pub fn version_labels(&self, application_name: &str) -> Vec<String> {
        self.state()
            .versions
            .iter()
            .filter(|version| version.application_name == application_name)
            .map(|version| version.version_label.clone())
            .collect()
    }
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeploymentPlatform for InMemoryPlatform {
    async fn describe_application_versions(
        &self,
        application_name: &str,
        version_labels: &[String],
    ) -> PlatformResult<Vec<ApplicationVersion>> {
        let mut state = self.state();
        state.record("DescribeApplicationVersions");

        Ok(state
            .versions
            .iter()
            .filter(|version| version.application_name == application_name)
            .filter(|version| {
                version_labels.is_empty() || version_labels.contains(&version.version_label)
            })
            .cloned()
            .collect())
    }

    async fn create_storage_location(&self) -> PlatformResult<String> {
        self.state().record("CreateStorageLocation");
        Ok(self.storage_bucket.clone())
    }

    async fn create_application_version(
        &self,
        request: CreateApplicationVersionRequest,
    ) -> PlatformResult<ApplicationVersion> {
        let mut state = self.state();
        state.record("CreateApplicationVersion");

        let exists = state.versions.iter().any(|version| {
            version.application_name == request.application_name
                && version.version_label == request.version_label
        });
        if exists {
            return Err(PlatformError::service(
                "CreateApplicationVersion",
                format!(
                    "Application Version {} already exists.",
                    request.version_label
                ),
            ));
        }

        let version = ApplicationVersion {
            application_name: request.application_name,
            version_label: request.version_label,
            source_bundle: Some(request.source_bundle),
            status: Some("PROCESSED".to_string()),
        };
        state.versions.push(version.clone());
        Ok(version)
    }

    async fn delete_application_version(
        &self,
        application_name: &str,
        version_label: &str,
        _delete_source_bundle: bool,
    ) -> PlatformResult<()> {
        let mut state = self.state();
        state.record("DeleteApplicationVersion");

        let before = state.versions.len();
        state.versions.retain(|version| {
            version.application_name != application_name || version.version_label != version_label
        });

        if state.versions.len() == before {
            return Err(PlatformError::service(
                "DeleteApplicationVersion",
                format!("No Application Version named '{}' found.", version_label),
            ));
        }
        Ok(())
    }

    async fn describe_environments(
        &self,
        query: EnvironmentQuery,
    ) -> PlatformResult<Vec<EnvironmentDescription>> {
        let mut state = self.state();
        state.record("DescribeEnvironments");

        for name in &query.environment_names {
            state.advance(name);
        }

        Ok(state
            .environments
            .values()
            .filter(|environment| {
                query.environment_names.is_empty()
                    || query.environment_names.contains(&environment.environment_name)
            })
            .filter(|environment| {
                query
                    .application_name
                    .as_ref()
                    .map_or(true, |name| environment.application_name.as_ref() == Some(name))
            })
            .filter(|environment| query.include_deleted || MemoryState::is_live(environment))
            .cloned()
            .collect())
    }

    async fn check_dns_availability(&self, cname_prefix: &str) -> PlatformResult<bool> {
        let mut state = self.state();
        state.record("CheckDNSAvailability");

        let taken_by_environment = state.environments.values().any(|environment| {
            MemoryState::is_live(environment)
                && environment
                    .cname
                    .as_deref()
                    .is_some_and(|cname| cname.split('.').next() == Some(cname_prefix))
        });

        Ok(!taken_by_environment && !state.reserved_cnames.contains(cname_prefix))
    }

    async fn create_environment(
        &self,
        request: CreateEnvironmentRequest,
    ) -> PlatformResult<EnvironmentDescription> {
        let mut state = self.state();
        state.record("CreateEnvironment");
        state.create_requests.push(request.clone());

        if state
            .environments
            .get(&request.environment_name)
            .is_some_and(MemoryState::is_live)
        {
            return Err(PlatformError::service(
                "CreateEnvironment",
                format!("Environment {} already exists.", request.environment_name),
            ));
        }

        state.next_environment_id += 1;
        let mut environment = EnvironmentDescription::new(&request.environment_name)
            .with_application(request.application_name)
            .with_version_label(request.version_label);
        environment.environment_id = Some(format!("e-{:010}", state.next_environment_id));
        environment.solution_stack_name = Some(request.solution_stack_name);
        environment.tier = Some(request.tier);
        environment.cname = request
            .cname_prefix
            .map(|prefix| format!("{}.{}.elasticbeanstalk.com", prefix, self.region));

        state
            .environments
            .insert(request.environment_name.clone(), environment.clone());
        state.settle_when_unscripted(&request.environment_name);
        Ok(environment)
    }

    async fn update_environment(
        &self,
        request: UpdateEnvironmentRequest,
    ) -> PlatformResult<EnvironmentDescription> {
        let mut state = self.state();
        state.record("UpdateEnvironment");
        state.update_requests.push(request.clone());

        let environment = state
            .environments
            .get_mut(&request.environment_name)
            .filter(|environment| MemoryState::is_live(environment))
            .ok_or_else(|| {
                PlatformError::service(
                    "UpdateEnvironment",
                    format!(
                        "No Environment found for EnvironmentName = '{}'.",
                        request.environment_name
                    ),
                )
            })?;

        environment.version_label = Some(request.version_label);
        if let Some(stack) = request.solution_stack_name {
            environment.solution_stack_name = Some(stack);
        }
        environment.status = EnvironmentStatus::Updating;
        environment.health = EnvironmentHealth::Grey;
        let updated = environment.clone();

        state.settle_when_unscripted(&request.environment_name);
        Ok(updated)
    }

    async fn terminate_environment(
        &self,
        environment_name: &str,
    ) -> PlatformResult<EnvironmentDescription> {
        let mut state = self.state();
        state.record("TerminateEnvironment");

        let environment = state
            .environments
            .get_mut(environment_name)
            .filter(|environment| MemoryState::is_live(environment))
            .ok_or_else(|| {
                PlatformError::service(
                    "TerminateEnvironment",
                    format!(
                        "No Environment found for EnvironmentName = '{}'.",
                        environment_name
                    ),
                )
            })?;

        environment.status = EnvironmentStatus::Terminated;
        environment.health = EnvironmentHealth::Grey;
        let terminated = environment.clone();
        state.scripts.remove(environment_name);
        Ok(terminated)
    }

    async fn delete_application(
        &self,
        application_name: &str,
        terminate_env_by_force: bool,
    ) -> PlatformResult<()> {
        let mut state = self.state();
        state.record("DeleteApplication");

        let running: Vec<String> = state
            .environments
            .values()
            .filter(|environment| MemoryState::is_live(environment))
            .filter(|environment| environment.application_name.as_deref() == Some(application_name))
            .map(|environment| environment.environment_name.clone())
            .collect();

        if !running.is_empty() && !terminate_env_by_force {
            return Err(PlatformError::service(
                "DeleteApplication",
                format!(
                    "Unable to delete application {} because it has running environments: {}",
                    application_name,
                    running.join(", ")
                ),
            ));
        }

        for name in running {
            if let Some(environment) = state.environments.get_mut(&name) {
                environment.status = EnvironmentStatus::Terminated;
            }
        }
        state
            .versions
            .retain(|version| version.application_name != application_name);
        Ok(())
    }

    fn platform_name(&self) -> &'static str {
        "memory"
    }
}

/// [`ArtifactStorage`] backed by `object_store`'s in-memory store. Objects
/// live under `<bucket>/<key>`.
pub struct InMemoryStorage {
    store: InMemory,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            store: InMemory::new(),
        }
    }

    fn object_path(bucket: &str, key: &str) -> PlatformResult<ObjectPath> {
        ObjectPath::parse(format!("{}/{}", bucket, key)).map_err(|e| {
            PlatformError::InvalidConfig {
                message: format!("invalid object key '{}': {}", key, e),
            }
        })
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> PlatformResult<Option<Bytes>> {
        let path = Self::object_path(bucket, key)?;
        match self.store.get(&path).await {
            Ok(result) => {
                let bytes = result.bytes().await.map_err(|e| PlatformError::Storage {
                    key: key.to_owned(),
                    source: e,
                })?;
                Ok(Some(bytes))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(PlatformError::Storage {
                key: key.to_owned(),
                source: e,
            }),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStorage for InMemoryStorage {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> PlatformResult<()> {
        let path = Self::object_path(bucket, key)?;
        self.store
            .put(&path, body.into())
            .await
            .map_err(|e| PlatformError::Storage {
                key: key.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    fn storage_name(&self) -> &'static str {
        "memory"
    }
}
