use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvironmentStatus {
    Launching,
    Updating,
    Ready,
    Terminating,
    Terminated,
    Aborting,
    LinkingFrom,
    LinkingTo,
    Unknown(String),
}

impl EnvironmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Launching => "Launching",
            Self::Updating => "Updating",
            Self::Ready => "Ready",
            Self::Terminating => "Terminating",
            Self::Terminated => "Terminated",
            Self::Aborting => "Aborting",
            Self::LinkingFrom => "LinkingFrom",
            Self::LinkingTo => "LinkingTo",
            Self::Unknown(value) => value,
        }
    }
}

impl From<&str> for EnvironmentStatus {
    fn from(value: &str) -> Self {
        match value {
            "Launching" => Self::Launching,
            "Updating" => Self::Updating,
            "Ready" => Self::Ready,
            "Terminating" => Self::Terminating,
            "Terminated" => Self::Terminated,
            "Aborting" => Self::Aborting,
            "LinkingFrom" => Self::LinkingFrom,
            "LinkingTo" => Self::LinkingTo,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for EnvironmentStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<EnvironmentStatus> for String {
    fn from(value: EnvironmentStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvironmentHealth {
    Green,
    Yellow,
    Red,
    Grey,
    Unknown(String),
}

impl EnvironmentHealth {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Green => "Green",
            Self::Yellow => "Yellow",
            Self::Red => "Red",
            Self::Grey => "Grey",
            Self::Unknown(value) => value,
        }
    }
}

impl From<&str> for EnvironmentHealth {
    fn from(value: &str) -> Self {
        match value {
            "Green" => Self::Green,
            "Yellow" => Self::Yellow,
            "Red" => Self::Red,
            "Grey" => Self::Grey,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for EnvironmentHealth {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<EnvironmentHealth> for String {
    fn from(value: EnvironmentHealth) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EnvironmentHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment tier. Web servers get a public CNAME, workers consume a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentTier {
    #[default]
    WebServer,
    Worker,
}

impl EnvironmentTier {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WebServer => "WebServer",
            Self::Worker => "Worker",
        }
    }

    pub fn tier_type(&self) -> &'static str {
        match self {
            Self::WebServer => "Standard",
            Self::Worker => "SQS/HTTP",
        }
    }
}

impl FromStr for EnvironmentTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "webserver" => Ok(Self::WebServer),
            "worker" => Ok(Self::Worker),
            _ => Err(format!(
                "Unknown environment tier '{}', expected WebServer or Worker",
                s
            )),
        }
    }
}

impl fmt::Display for EnvironmentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionSetting {
    #[serde(alias = "namespace")]
    pub namespace: String,
    #[serde(alias = "option_name")]
    pub option_name: String,
    #[serde(alias = "value")]
    pub value: String,
    #[serde(default, alias = "resource_name", skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
}

impl OptionSetting {
    pub fn new(
        namespace: impl Into<String>,
        option_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            option_name: option_name.into(),
            value: value.into(),
            resource_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    #[serde(alias = "key")]
    pub key: String,
    #[serde(alias = "value")]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBundle {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationVersion {
    pub application_name: String,
    pub version_label: String,
    pub source_bundle: Option<SourceBundle>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentDescription {
    pub environment_id: Option<String>,
    pub environment_name: String,
    pub application_name: Option<String>,
    pub version_label: Option<String>,
    pub solution_stack_name: Option<String>,
    pub cname: Option<String>,
    pub endpoint_url: Option<String>,
    pub status: EnvironmentStatus,
    pub health: EnvironmentHealth,
    pub tier: Option<EnvironmentTier>,
}

impl EnvironmentDescription {
    pub fn new(environment_name: impl Into<String>) -> Self {
        Self {
            environment_id: None,
            environment_name: environment_name.into(),
            application_name: None,
            version_label: None,
            solution_stack_name: None,
            cname: None,
            endpoint_url: None,
            status: EnvironmentStatus::Launching,
            health: EnvironmentHealth::Grey,
            tier: None,
        }
    }

    pub fn with_application(mut self, application_name: impl Into<String>) -> Self {
        self.application_name = Some(application_name.into());
        self
    }

    pub fn with_version_label(mut self, version_label: impl Into<String>) -> Self {
        self.version_label = Some(version_label.into());
        self
    }

    pub fn with_cname(mut self, cname: impl Into<String>) -> Self {
        self.cname = Some(cname.into());
        self
    }

    pub fn with_state(mut self, status: EnvironmentStatus, health: EnvironmentHealth) -> Self {
        self.status = status;
        self.health = health;
        self
    }

    /// Ready and reporting green health.
    pub fn is_healthy(&self) -> bool {
        self.status == EnvironmentStatus::Ready && self.health == EnvironmentHealth::Green
    }
}

/// Filter for describing environments.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentQuery {
    pub application_name: Option<String>,
    pub environment_names: Vec<String>,
    pub include_deleted: bool,
}

impl EnvironmentQuery {
    pub fn by_name(environment_name: impl Into<String>) -> Self {
        Self {
            application_name: None,
            environment_names: vec![environment_name.into()],
            include_deleted: false,
        }
    }

    pub fn by_application(application_name: impl Into<String>) -> Self {
        Self {
            application_name: Some(application_name.into()),
            environment_names: Vec::new(),
            include_deleted: false,
        }
    }

    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CreateApplicationVersionRequest {
    pub application_name: String,
    pub version_label: String,
    pub source_bundle: SourceBundle,
    pub auto_create_application: bool,
}

impl CreateApplicationVersionRequest {
    pub fn new(
        application_name: impl Into<String>,
        version_label: impl Into<String>,
        source_bundle: SourceBundle,
    ) -> Self {
        Self {
            application_name: application_name.into(),
            version_label: version_label.into(),
            source_bundle,
            auto_create_application: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateEnvironmentRequest {
    pub application_name: String,
    pub environment_name: String,
    pub version_label: String,
    pub solution_stack_name: String,
    pub option_settings: Vec<OptionSetting>,
    pub tags: Vec<Tag>,
    pub tier: EnvironmentTier,
    pub cname_prefix: Option<String>,
}

impl CreateEnvironmentRequest {
    pub fn new(
        application_name: impl Into<String>,
        environment_name: impl Into<String>,
        version_label: impl Into<String>,
        solution_stack_name: impl Into<String>,
    ) -> Self {
        Self {
            application_name: application_name.into(),
            environment_name: environment_name.into(),
            version_label: version_label.into(),
            solution_stack_name: solution_stack_name.into(),
            option_settings: Vec::new(),
            tags: Vec::new(),
            tier: EnvironmentTier::default(),
            cname_prefix: None,
        }
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

    pub fn with_cname_prefix(mut self, cname_prefix: impl Into<String>) -> Self {
        self.cname_prefix = Some(cname_prefix.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct UpdateEnvironmentRequest {
    pub environment_name: String,
    pub version_label: String,
    pub solution_stack_name: Option<String>,
    pub option_settings: Vec<OptionSetting>,
}

impl UpdateEnvironmentRequest {
    pub fn new(environment_name: impl Into<String>, version_label: impl Into<String>) -> Self {
        Self {
            environment_name: environment_name.into(),
            version_label: version_label.into(),
            solution_stack_name: None,
            option_settings: Vec::new(),
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
}
