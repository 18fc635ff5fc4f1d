use crate::provider::PlatformResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Credentials and endpoint settings shared by the platform and storage clients.
///
/// Usually loaded from a YAML key file:
///
/// ```yaml
/// access_key_id: AKIA...
/// secret_access_key: ...
/// region: eu-west-1
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(alias = "accessKeyId")]
    pub access_key_id: String,
    #[serde(alias = "secretAccessKey")]
    pub secret_access_key: String,
    /// May be left out of the key file and supplied with [`AwsConfig::with_region`].
    #[serde(default)]
    pub region: String,
    #[serde(default, alias = "sessionToken")]
    pub session_token: Option<String>,
    #[serde(default, alias = "endpointUrl")]
    pub endpoint_url: Option<String>,
}

impl fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl AwsConfig {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            session_token: None,
            endpoint_url: None,
        }
    }

    /// Parses a key file. Call [`AwsConfig::validate`] once overrides are applied;
    /// the clients validate again on construction.
    pub fn from_yaml_str(contents: &str) -> PlatformResult<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> PlatformResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.access_key_id.is_empty() {
            return Err("Access key id cannot be empty".to_string());
        }

        if self.secret_access_key.is_empty() {
            return Err("Secret access key cannot be empty".to_string());
        }

        if self.region.is_empty() {
            return Err("Region cannot be empty".to_string());
        }

        if let Some(endpoint_url) = &self.endpoint_url {
            if !endpoint_url.starts_with("http://") && !endpoint_url.starts_with("https://") {
                return Err("Endpoint URL must start with http:// or https://".to_string());
            }
        }

        Ok(())
    }
}
