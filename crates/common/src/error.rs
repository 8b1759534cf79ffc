//! Error types for payara-harness

use std::path::PathBuf;

use thiserror::Error;

use crate::types::LifecyclePhase;

/// Result type alias using the payara-harness Error
pub type Result<T> = std::result::Result<T, Error>;

/// payara-harness error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Required setting missing: {0}")]
    MissingSetting(String),

    #[error("Invalid value for setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Could not locate the runtime artifact {}", .0.display())]
    InvalidArtifactPath(PathBuf),

    #[error(
        "Invalid runtime artifact {}: {reason}. Please check the file is a valid Payara Micro jar (properties resource: {resource})",
        .path.display()
    )]
    InvalidArtifact {
        path: PathBuf,
        resource: String,
        reason: String,
    },

    #[error("Unable to detect the runtime version of {}", .0.display())]
    VersionUndetectable(PathBuf),

    #[error("A configuration is required")]
    ConfigurationRequired,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Lifecycle failure during {phase}: {source}")]
    Lifecycle {
        phase: LifecyclePhase,
        #[source]
        source: Box<Error>,
    },

    #[error("Deployment failure during {phase} of {unit}: {source}")]
    Deployment {
        phase: LifecyclePhase,
        unit: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Not implemented: {0}")]
    Unsupported(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Operation timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Management API error: {0}")]
    Management(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a collaborator failure with the lifecycle phase it happened in
    pub fn lifecycle(phase: LifecyclePhase, source: Error) -> Self {
        Error::Lifecycle {
            phase,
            source: Box::new(source),
        }
    }

    /// Wrap a collaborator failure with the deployment phase and unit name
    pub fn deployment(phase: LifecyclePhase, unit: impl Into<String>, source: Error) -> Self {
        Error::Deployment {
            phase,
            unit: unit.into(),
            source: Box::new(source),
        }
    }

    /// True for errors raised while checking or loading configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingSetting(_)
                | Error::InvalidSetting { .. }
                | Error::InvalidArtifactPath(_)
                | Error::InvalidArtifact { .. }
                | Error::VersionUndetectable(_)
                | Error::ConfigurationRequired
        )
    }
}
