use platform::{EnvironmentHealth, EnvironmentStatus, PlatformError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error(
        "Invalid archive name '{file_name}'. Please make sure file name includes application name and version label separated by '-'. e.g. tech-website-1d595d3.zip"
    )]
    InvalidArchiveName { file_name: String },

    #[error("Failed to read archive '{path}': {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("DNS {environment} is not available")]
    DnsUnavailable { environment: String },

    #[error("A solution stack is required to create environment {environment}")]
    MissingSolutionStack { environment: String },

    #[error(
        "Failed to health check environment: {environment}. Maybe the environment is terminated."
    )]
    EnvironmentVanished { environment: String },

    #[error("{environment} is not healthy (status: {status}, health: {health})")]
    Unhealthy {
        environment: String,
        status: EnvironmentStatus,
        health: EnvironmentHealth,
    },

    #[error("Endpoint verification failed for {url}: {reason}")]
    VerificationFailed { url: String, reason: String },

    #[error("Invalid poll configuration: {message}")]
    InvalidPollConfig { message: String },

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings file error: {0}")]
    Settings(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DeployResult<T> = Result<T, DeployError>;
