//! Container configuration
//!
//! A [`ContainerConfiguration`] is resolved from [`Settings`] once, may be
//! adjusted by the caller, and is then turned into an immutable
//! [`ValidatedConfiguration`] by [`ContainerConfiguration::validate`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::escape::escape_paths;
use crate::settings::{keys, Settings};
use crate::types::ContainerMode;
use crate::version::{VersionDescriptor, VersionResolver};
use crate::{Error, Result};

/// Startup timeout used when nothing is configured
pub const DEFAULT_STARTUP_TIMEOUT_SECONDS: i64 = 180;

/// Startup timeout value meaning "wait forever"
pub const UNBOUNDED_STARTUP_TIMEOUT: i64 = -1;

/// Settings for attaching to a running server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    pub admin_host: String,
    pub admin_port: u16,
    pub admin_https: bool,
    pub http_port: u16,
    pub admin_user: Option<String>,
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
    pub target: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            admin_host: "localhost".to_string(),
            admin_port: 4848,
            admin_https: false,
            http_port: 8080,
            admin_user: None,
            admin_password: None,
            target: "server".to_string(),
        }
    }
}

impl RemoteSettings {
    /// Base URL of the admin REST API
    pub fn admin_url(&self) -> String {
        let scheme = if self.admin_https { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.admin_host, self.admin_port)
    }
}

/// Raw, caller-adjustable configuration
#[derive(Debug, Clone)]
pub struct ContainerConfiguration {
    pub mode: ContainerMode,
    micro_jar: Option<PathBuf>,
    classpath: Option<String>,
    discovered: OnceCell<Option<PathBuf>>,
    /// Maximum time allowed for startup; `-1` waits forever
    pub startup_timeout_seconds: i64,
    pub cluster_enabled: bool,
    /// Use a random HTTP port between 8080 and 9080
    pub random_http_port: bool,
    pub auto_bind_http: bool,
    pub output_to_console: bool,
    /// JVM options, placed between `java` and `-jar`
    pub cmd_options: Option<String>,
    /// Runtime options appended at the end of the command
    pub extra_micro_options: Option<String>,
    pub debug: bool,
    pub java_home: Option<PathBuf>,
    pub remote: RemoteSettings,
}

impl Default for ContainerConfiguration {
    fn default() -> Self {
        Self {
            mode: ContainerMode::default(),
            micro_jar: None,
            classpath: None,
            discovered: OnceCell::new(),
            startup_timeout_seconds: DEFAULT_STARTUP_TIMEOUT_SECONDS,
            cluster_enabled: false,
            random_http_port: true,
            auto_bind_http: true,
            output_to_console: true,
            cmd_options: None,
            extra_micro_options: None,
            debug: false,
            java_home: None,
            remote: RemoteSettings::default(),
        }
    }
}

impl ContainerConfiguration {
    /// Resolve every setting from its override, environment and default
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mode = match settings.get(&keys::CONTAINER_MODE) {
            Some(value) => value.parse().map_err(|reason| Error::InvalidSetting {
                key: keys::CONTAINER_MODE.property.to_string(),
                reason,
            })?,
            None => ContainerMode::default(),
        };

        let remote = RemoteSettings {
            admin_host: settings
                .get(&keys::ADMIN_HOST)
                .unwrap_or_else(|| RemoteSettings::default().admin_host),
            admin_port: port(settings, &keys::ADMIN_PORT)?.unwrap_or(4848),
            admin_https: settings.get_bool(&keys::ADMIN_HTTPS),
            http_port: port(settings, &keys::HTTP_PORT)?.unwrap_or(8080),
            admin_user: settings.get(&keys::ADMIN_USER),
            admin_password: settings.get(&keys::ADMIN_PASSWORD),
            target: settings
                .get(&keys::TARGET)
                .unwrap_or_else(|| RemoteSettings::default().target),
        };

        Ok(Self {
            mode,
            micro_jar: settings.get(&keys::MICRO_JAR).map(PathBuf::from),
            classpath: settings.env("CLASSPATH"),
            discovered: OnceCell::new(),
            startup_timeout_seconds: settings
                .get_i64(&keys::STARTUP_TIMEOUT)?
                .unwrap_or(DEFAULT_STARTUP_TIMEOUT_SECONDS),
            cluster_enabled: settings.get_bool(&keys::CLUSTER_ENABLED),
            random_http_port: settings.get_bool(&keys::RANDOM_HTTP_PORT),
            auto_bind_http: settings.get_bool(&keys::AUTO_BIND_HTTP),
            output_to_console: settings.get_bool(&keys::CONSOLE_OUTPUT),
            cmd_options: settings.get(&keys::CMD_OPTIONS),
            extra_micro_options: settings.get(&keys::EXTRA_MICRO_OPTIONS),
            debug: settings.get_bool(&keys::DEBUG),
            java_home: settings.get(&keys::JAVA_HOME).map(PathBuf::from),
            remote,
        })
    }

    /// Set the location of the Payara Micro jar
    pub fn set_micro_jar(&mut self, path: impl Into<PathBuf>) {
        self.micro_jar = Some(path.into());
    }

    pub fn with_micro_jar(mut self, path: impl Into<PathBuf>) -> Self {
        self.set_micro_jar(path);
        self
    }

    /// Class path searched when no jar is configured
    pub fn set_classpath(&mut self, classpath: impl Into<String>) {
        self.classpath = Some(classpath.into());
        self.discovered = OnceCell::new();
    }

    /// The configured jar, or one discovered on the class path.
    ///
    /// Discovery runs at most once per configuration.
    pub fn micro_jar(&self) -> Option<PathBuf> {
        if let Some(jar) = &self.micro_jar {
            return Some(jar.clone());
        }
        self.discovered
            .get_or_init(|| self.classpath.as_deref().and_then(discover_on_classpath))
            .clone()
    }

    /// Whether the jar was found on the class path rather than configured
    pub fn is_micro_on_classpath(&self) -> bool {
        self.micro_jar.is_none() && self.micro_jar().is_some()
    }

    /// Check the configuration and produce its validated form.
    ///
    /// In micro mode the artifact is mandatory. In remote mode it is only
    /// inspected when one is configured. Option strings come out with their
    /// path spaces escaped; validating the result again changes nothing.
    pub fn validate(&self) -> Result<ValidatedConfiguration> {
        let startup_timeout = match self.startup_timeout_seconds {
            UNBOUNDED_STARTUP_TIMEOUT => None,
            s if s >= 0 => Some(Duration::from_secs(s as u64)),
            s => {
                return Err(Error::InvalidSetting {
                    key: keys::STARTUP_TIMEOUT.property.to_string(),
                    reason: format!("{} is neither a number of seconds nor -1", s),
                })
            }
        };

        let micro_jar = self.micro_jar();
        let version = match (&micro_jar, self.mode) {
            (None, ContainerMode::Micro) => {
                return Err(Error::MissingSetting(format!(
                    "The property {} must be specified or the {} environment variable must be set",
                    keys::MICRO_JAR.property,
                    keys::MICRO_JAR.env
                )))
            }
            (None, ContainerMode::Remote) => None,
            (Some(jar), _) => Some(inspect_artifact(jar)?),
        };

        let validated = ValidatedConfiguration {
            mode: self.mode,
            micro_jar,
            micro_on_classpath: self.is_micro_on_classpath(),
            version,
            startup_timeout,
            cluster_enabled: self.cluster_enabled,
            random_http_port: self.random_http_port,
            auto_bind_http: self.auto_bind_http,
            output_to_console: self.output_to_console,
            cmd_options: self.cmd_options.as_deref().map(escape_paths),
            extra_micro_options: self.extra_micro_options.as_deref().map(escape_paths),
            debug: self.debug,
            java_home: self.java_home.clone(),
            remote: self.remote.clone(),
        };

        info!(
            "Configuration valid: mode={}, runtime={}",
            validated.mode,
            validated
                .version
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
        Ok(validated)
    }
}

/// Checked, immutable configuration handed to the lifecycle controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedConfiguration {
    pub mode: ContainerMode,
    pub micro_jar: Option<PathBuf>,
    pub micro_on_classpath: bool,
    pub version: Option<VersionDescriptor>,
    pub startup_timeout: Option<Duration>,
    pub cluster_enabled: bool,
    pub random_http_port: bool,
    pub auto_bind_http: bool,
    pub output_to_console: bool,
    pub cmd_options: Option<String>,
    pub extra_micro_options: Option<String>,
    pub debug: bool,
    pub java_home: Option<PathBuf>,
    pub remote: RemoteSettings,
}

impl ValidatedConfiguration {
    pub fn is_enterprise(&self) -> bool {
        self.version.as_ref().map(|v| v.enterprise).unwrap_or(false)
    }

    /// Turn back into an adjustable configuration, keeping escaped options
    pub fn to_configuration(&self) -> ContainerConfiguration {
        ContainerConfiguration {
            mode: self.mode,
            micro_jar: if self.micro_on_classpath {
                None
            } else {
                self.micro_jar.clone()
            },
            classpath: if self.micro_on_classpath {
                self.micro_jar.as_ref().map(|p| p.display().to_string())
            } else {
                None
            },
            discovered: OnceCell::new(),
            startup_timeout_seconds: self
                .startup_timeout
                .map(|d| d.as_secs() as i64)
                .unwrap_or(UNBOUNDED_STARTUP_TIMEOUT),
            cluster_enabled: self.cluster_enabled,
            random_http_port: self.random_http_port,
            auto_bind_http: self.auto_bind_http,
            output_to_console: self.output_to_console,
            cmd_options: self.cmd_options.clone(),
            extra_micro_options: self.extra_micro_options.clone(),
            debug: self.debug,
            java_home: self.java_home.clone(),
            remote: self.remote.clone(),
        }
    }
}

fn inspect_artifact(jar: &Path) -> Result<VersionDescriptor> {
    if !jar.is_file() {
        return Err(Error::InvalidArtifactPath(jar.to_path_buf()));
    }

    let version = VersionResolver::resolve(jar)?;
    // Branding present but without a usable major version counts as no
    // version at all: nothing can be compared or reported from it.
    if version.major.parse::<u32>().is_err() {
        return Err(Error::VersionUndetectable(jar.to_path_buf()));
    }
    Ok(version)
}

fn discover_on_classpath(classpath: &str) -> Option<PathBuf> {
    let found = std::env::split_paths(classpath).find(|entry| {
        entry
            .file_name()
            .map(|name| {
                let name = name.to_string_lossy();
                name.starts_with("payara-micro") && name.ends_with(".jar")
            })
            .unwrap_or(false)
    });
    if let Some(jar) = &found {
        debug!("Found Payara Micro on the class path: {}", jar.display());
    }
    found
}

fn port(settings: &Settings, key: &crate::settings::SettingKey) -> Result<Option<u16>> {
    settings
        .get_i64(key)?
        .map(|value| {
            u16::try_from(value).map_err(|_| Error::InvalidSetting {
                key: key.property.to_string(),
                reason: format!("{} is not a valid port", value),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MapSource;
    use crate::version::test_support::*;

    fn from(overrides: MapSource, env: MapSource) -> ContainerConfiguration {
        ContainerConfiguration::from_settings(&Settings::new(overrides, env)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from(MapSource::new(), MapSource::new());
        assert_eq!(config.mode, ContainerMode::Micro);
        assert_eq!(config.startup_timeout_seconds, 180);
        assert!(!config.cluster_enabled);
        assert!(config.random_http_port);
        assert!(config.auto_bind_http);
        assert!(config.output_to_console);
        assert!(!config.debug);
        assert!(config.cmd_options.is_none());
        assert!(config.micro_jar().is_none());
        assert_eq!(config.remote.admin_url(), "http://localhost:4848");
    }

    #[test]
    fn test_environment_and_overrides() {
        let config = from(
            MapSource::new().with("payara.startupTimeoutInSeconds", "30"),
            MapSource::new()
                .with("MICRO_STARTUP_TIMEOUT_IN_SECONDS", "60")
                .with("MICRO_CLUSTER_ENABLED", "true")
                .with("MICRO_JAR", "/opt/payara-micro.jar"),
        );
        assert_eq!(config.startup_timeout_seconds, 30);
        assert!(config.cluster_enabled);
        assert_eq!(config.micro_jar(), Some(PathBuf::from("/opt/payara-micro.jar")));
    }

    #[test]
    fn test_invalid_mode() {
        let err = ContainerConfiguration::from_settings(&Settings::new(
            MapSource::new().with("payara.containerMode", "embedded"),
            MapSource::new(),
        ))
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_artifact() {
        let config = ContainerConfiguration::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::MissingSetting(_)));
        assert!(err.to_string().contains("MICRO_JAR"));
    }

    #[test]
    fn test_nonexistent_artifact() {
        let config = ContainerConfiguration::default().with_micro_jar("/nonexistent/payara-micro.jar");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidArtifactPath(_)));
    }

    #[test]
    fn test_directory_is_not_an_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = ContainerConfiguration::default().with_micro_jar(dir.path());
        assert!(matches!(config.validate().unwrap_err(), Error::InvalidArtifactPath(_)));
    }

    #[test]
    fn test_invalid_artifact_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_jar(dir.path(), "payara-micro.jar", &[("META-INF/MANIFEST.MF", "")]);
        let config = ContainerConfiguration::default().with_micro_jar(jar);
        assert!(matches!(config.validate().unwrap_err(), Error::InvalidArtifact { .. }));
    }

    #[test]
    fn test_non_numeric_major_is_undetectable() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_micro_jar(dir.path(), &COMMUNITY_BRANDING.replace("major_version=5", "major_version=five"));
        let config = ContainerConfiguration::default().with_micro_jar(jar);
        assert!(matches!(config.validate().unwrap_err(), Error::VersionUndetectable(_)));
    }

    #[test]
    fn test_validate_escapes_options() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_micro_jar(dir.path(), ENTERPRISE_BRANDING);
        let mut config = ContainerConfiguration::default().with_micro_jar(jar);
        config.cmd_options = Some("-Dlog=/var/my logs/app.log -Xmx512m".to_string());
        config.extra_micro_options = Some(r"--rootDir C:\Payara Root\dir".to_string());

        let validated = config.validate().unwrap();
        assert_eq!(validated.cmd_options.as_deref(), Some(r"-Dlog=/var/my\ logs/app.log -Xmx512m"));
        assert_eq!(validated.extra_micro_options.as_deref(), Some(r"--rootDir C:\Payara\ Root\dir"));
        assert!(validated.is_enterprise());
        assert_eq!(validated.startup_timeout, Some(Duration::from_secs(180)));

        // The input configuration is untouched
        assert_eq!(config.cmd_options.as_deref(), Some("-Dlog=/var/my logs/app.log -Xmx512m"));
    }

    #[test]
    fn test_revalidation_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_micro_jar(dir.path(), COMMUNITY_BRANDING);
        let mut config = ContainerConfiguration::default().with_micro_jar(jar);
        config.cmd_options = Some("-Dpath=/opt/a b c/d -Xss1m".to_string());

        let first = config.validate().unwrap();
        let second = first.to_configuration().validate().unwrap();
        assert_eq!(first, second);
        assert_eq!(config.validate().unwrap(), first);
    }

    #[test]
    fn test_unbounded_and_invalid_timeouts() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_micro_jar(dir.path(), COMMUNITY_BRANDING);
        let mut config = ContainerConfiguration::default().with_micro_jar(jar);

        config.startup_timeout_seconds = -1;
        assert_eq!(config.validate().unwrap().startup_timeout, None);

        config.startup_timeout_seconds = -5;
        assert!(matches!(config.validate().unwrap_err(), Error::InvalidSetting { .. }));
    }

    #[test]
    fn test_classpath_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_micro_jar(dir.path(), COMMUNITY_BRANDING);
        let lib = dir.path().join("junit.jar");
        let classpath = std::env::join_paths([lib.as_path(), jar.as_path()]).unwrap();

        let config = from(
            MapSource::new(),
            MapSource::new().with("CLASSPATH", classpath.to_string_lossy()),
        );
        assert_eq!(config.micro_jar(), Some(jar.clone()));
        assert!(config.is_micro_on_classpath());

        let validated = config.validate().unwrap();
        assert!(validated.micro_on_classpath);
        assert_eq!(validated.micro_jar, Some(jar));
    }

    #[test]
    fn test_remote_mode_without_artifact() {
        let config = from(
            MapSource::new()
                .with("payara.containerMode", "remote")
                .with("payara.adminPort", "14848")
                .with("payara.adminHttps", "true"),
            MapSource::new(),
        );
        let validated = config.validate().unwrap();
        assert_eq!(validated.mode, ContainerMode::Remote);
        assert!(validated.version.is_none());
        assert_eq!(validated.remote.admin_url(), "https://localhost:14848");
    }

    #[test]
    fn test_invalid_port() {
        let err = ContainerConfiguration::from_settings(&Settings::new(
            MapSource::new().with("payara.adminPort", "70000"),
            MapSource::new(),
        ))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidSetting { .. }));
    }
}
