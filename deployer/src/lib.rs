pub mod application;
pub mod archive;
pub mod deployment_info;
pub mod environment;
pub mod error;
pub mod settings;
pub mod verify;

pub use application::{Application, DeployOutcome, DeployPhase, DeployRequest};
pub use archive::{ArchiveName, ArchiveUploader, UploadStatus, UploadedArchive};
pub use deployment_info::DeploymentInfo;
pub use environment::{EnvironmentManager, PollConfig};
pub use error::{DeployError, DeployResult};
pub use settings::{load_option_settings, parse_option_settings, parse_tag};
pub use verify::{endpoint_url, verify_endpoint};
