pub mod config;
pub mod memory;
pub mod provider;
pub mod types;

#[cfg(feature = "aws")]
pub mod beanstalk;
#[cfg(feature = "aws")]
pub mod s3;

pub use config::AwsConfig;
pub use memory::{EnvironmentStep, InMemoryPlatform, InMemoryStorage};
pub use provider::{ArtifactStorage, DeploymentPlatform, PlatformError, PlatformResult};
pub use types::{
    ApplicationVersion, CreateApplicationVersionRequest, CreateEnvironmentRequest,
    EnvironmentDescription, EnvironmentHealth, EnvironmentQuery, EnvironmentStatus,
    EnvironmentTier, OptionSetting, SourceBundle, Tag, UpdateEnvironmentRequest,
};

#[cfg(feature = "aws")]
pub use beanstalk::BeanstalkPlatform;
#[cfg(feature = "aws")]
pub use s3::S3Storage;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::memory::*;
    pub use crate::provider::*;
    pub use crate::types::*;

    #[cfg(feature = "aws")]
    pub use crate::beanstalk::*;
    #[cfg(feature = "aws")]
    pub use crate::s3::*;
}
