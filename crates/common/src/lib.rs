//! payara-harness common library
//!
//! Settings resolution, configuration validation, runtime version detection
//! and the types shared by the lifecycle controller and the CLI.

pub mod config;
pub mod error;
pub mod escape;
pub mod properties;
pub mod settings;
pub mod types;
pub mod version;

// Re-export commonly used types
pub use config::{ContainerConfiguration, RemoteSettings, ValidatedConfiguration};
pub use error::{Error, Result};
pub use escape::{escape_paths, split_options};
pub use settings::{keys, EnvSource, MapSource, SettingKey, Settings, SettingsSource};
pub use types::*;
pub use version::{VersionDescriptor, VersionResolver, BRANDING_RESOURCE};

/// payara-harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
