//! Core types for payara-harness

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the runtime is reached during a test session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerMode {
    /// Launch Payara Micro as a child process owned by the session
    Micro,
    /// Attach to an already running server through its admin REST API
    Remote,
}

impl Default for ContainerMode {
    fn default() -> Self {
        Self::Micro
    }
}

impl ContainerMode {
    /// Whether the session owns the runtime process and must terminate it
    pub fn owns_process(&self) -> bool {
        matches!(self, ContainerMode::Micro)
    }
}

impl std::fmt::Display for ContainerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerMode::Micro => write!(f, "micro"),
            ContainerMode::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for ContainerMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "micro" | "managed" => Ok(ContainerMode::Micro),
            "remote" => Ok(ContainerMode::Remote),
            other => Err(format!("unknown container mode '{}'", other)),
        }
    }
}

/// Lifecycle session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unconfigured,
    Configured,
    Started,
    Stopped,
    Failed,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Unconfigured
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unconfigured => write!(f, "unconfigured"),
            SessionState::Configured => write!(f, "configured"),
            SessionState::Started => write!(f, "started"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle operation, used to decorate delegated failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Setup,
    Start,
    Deploy,
    Undeploy,
    Stop,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecyclePhase::Setup => write!(f, "setup"),
            LifecyclePhase::Start => write!(f, "start"),
            LifecyclePhase::Deploy => write!(f, "deploy"),
            LifecyclePhase::Undeploy => write!(f, "undeploy"),
            LifecyclePhase::Stop => write!(f, "stop"),
        }
    }
}

/// An archive submitted for deployment.
///
/// The contents are never inspected; the archive file is handed to the
/// runtime manager as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    /// Archive file name, e.g. `test.war`
    pub name: String,
    /// Location of the archive on disk
    pub archive: PathBuf,
}

impl DeploymentUnit {
    pub fn new(name: impl Into<String>, archive: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            archive: archive.into(),
        }
    }

    /// Build a unit named after the archive file
    pub fn from_path(archive: impl AsRef<Path>) -> Self {
        let archive = archive.as_ref();
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| archive.display().to_string());
        Self::new(name, archive)
    }

    /// Application name: the archive name without its extension
    pub fn application_name(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    /// Context root the application is published under
    pub fn context_root(&self) -> String {
        format!("/{}", self.application_name())
    }
}

/// A deployment descriptor submitted without an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    pub content: String,
}

/// Protocol a deployed unit is reached with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDescription(pub String);

impl ProtocolDescription {
    pub fn servlet_3_0() -> Self {
        Self("Servlet 3.0".to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// One HTTP endpoint serving a deployed application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpContext {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub context_root: String,
}

impl HttpContext {
    /// Base URL of the application, with a trailing slash
    pub fn url(&self) -> String {
        format!(
            "http://{}:{}{}/",
            self.host,
            self.port,
            self.context_root.trim_end_matches('/')
        )
    }
}

/// Metadata describing how a deployed unit can be reached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    pub contexts: Vec<HttpContext>,
}

impl ProtocolMetadata {
    pub fn with_context(mut self, context: HttpContext) -> Self {
        self.contexts.push(context);
        self
    }
}
