//! Ranked settings resolution
//!
//! A setting is looked up in three tiers: an explicit override keyed by its
//! property name, the process environment keyed by its environment name,
//! and finally a static default. Empty strings count as absent at every tier.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// A named source of raw setting values
pub trait SettingsSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl SettingsSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory key/value source
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn extend(&mut self, other: MapSource) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Load overrides from a TOML file with a `[properties]` table.
    ///
    /// Scalar values are stringified, so `"payara.startupTimeoutInSeconds" = 60`
    /// and `= "60"` are equivalent. A missing file yields an empty source.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let file: OverridesFile = toml::from_str(&content).map_err(|e| Error::InvalidSetting {
            key: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut source = Self::default();
        for (key, value) in file.properties {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Float(f) => f.to_string(),
                other => {
                    return Err(Error::InvalidSetting {
                        key,
                        reason: format!("expected a scalar value, found {}", other.type_str()),
                    })
                }
            };
            source.insert(key, value);
        }

        debug!("Loaded {} override(s) from {}", source.len(), path.display());
        Ok(source)
    }

    /// Parse a `key=value` pair as given on a command line
    pub fn parse_pair(pair: &str) -> Result<(String, String)> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(Error::InvalidSetting {
                key: pair.to_string(),
                reason: "expected KEY=VALUE".to_string(),
            }),
        }
    }
}

impl SettingsSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct OverridesFile {
    #[serde(default)]
    properties: toml::Table,
}

/// Declaration of one setting: its override key, environment name and default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingKey {
    pub property: &'static str,
    pub env: &'static str,
    pub default: Option<&'static str>,
}

impl SettingKey {
    pub const fn new(property: &'static str, env: &'static str, default: Option<&'static str>) -> Self {
        Self {
            property,
            env,
            default,
        }
    }
}

/// Every setting understood by payara-harness
pub mod keys {
    use super::SettingKey;

    pub const CONTAINER_MODE: SettingKey =
        SettingKey::new("payara.containerMode", "PAYARA_CONTAINER_MODE", Some("micro"));
    pub const MICRO_JAR: SettingKey = SettingKey::new("payara.microJar", "MICRO_JAR", None);
    pub const STARTUP_TIMEOUT: SettingKey = SettingKey::new(
        "payara.startupTimeoutInSeconds",
        "MICRO_STARTUP_TIMEOUT_IN_SECONDS",
        Some("180"),
    );
    pub const CLUSTER_ENABLED: SettingKey =
        SettingKey::new("payara.clusterEnabled", "MICRO_CLUSTER_ENABLED", Some("false"));
    pub const RANDOM_HTTP_PORT: SettingKey =
        SettingKey::new("payara.randomHttpPort", "MICRO_RANDOM_HTTP_PORT", Some("true"));
    pub const AUTO_BIND_HTTP: SettingKey =
        SettingKey::new("payara.autoBindHttp", "MICRO_AUTOBIND_HTTP", Some("true"));
    pub const CONSOLE_OUTPUT: SettingKey =
        SettingKey::new("payara.consoleOutput", "MICRO_CONSOLE_OUTPUT", Some("true"));
    pub const CMD_OPTIONS: SettingKey = SettingKey::new("payara.cmdOptions", "MICRO_CMD_OPTIONS", None);
    pub const EXTRA_MICRO_OPTIONS: SettingKey =
        SettingKey::new("payara.extraMicroOptions", "EXTRA_MICRO_OPTIONS", None);
    pub const DEBUG: SettingKey = SettingKey::new("payara.debug", "MICRO_DEBUG", Some("false"));
    pub const JAVA_HOME: SettingKey = SettingKey::new("payara.javaHome", "JAVA_HOME", None);

    pub const ADMIN_HOST: SettingKey =
        SettingKey::new("payara.adminHost", "PAYARA_ADMIN_HOST", Some("localhost"));
    pub const ADMIN_PORT: SettingKey = SettingKey::new("payara.adminPort", "PAYARA_ADMIN_PORT", Some("4848"));
    pub const ADMIN_HTTPS: SettingKey =
        SettingKey::new("payara.adminHttps", "PAYARA_ADMIN_HTTPS", Some("false"));
    pub const HTTP_PORT: SettingKey = SettingKey::new("payara.httpPort", "PAYARA_HTTP_PORT", Some("8080"));
    pub const ADMIN_USER: SettingKey = SettingKey::new("payara.adminUser", "PAYARA_ADMIN_USER", None);
    pub const ADMIN_PASSWORD: SettingKey =
        SettingKey::new("payara.adminPassword", "PAYARA_ADMIN_PASSWORD", None);
    pub const TARGET: SettingKey = SettingKey::new("payara.target", "PAYARA_TARGET", Some("server"));

    /// All declared settings, in display order
    pub const ALL: &[SettingKey] = &[
        CONTAINER_MODE,
        MICRO_JAR,
        STARTUP_TIMEOUT,
        CLUSTER_ENABLED,
        RANDOM_HTTP_PORT,
        AUTO_BIND_HTTP,
        CONSOLE_OUTPUT,
        CMD_OPTIONS,
        EXTRA_MICRO_OPTIONS,
        DEBUG,
        JAVA_HOME,
        ADMIN_HOST,
        ADMIN_PORT,
        ADMIN_HTTPS,
        HTTP_PORT,
        ADMIN_USER,
        ADMIN_PASSWORD,
        TARGET,
    ];
}

/// Three-tier resolver over an override source and an environment source
pub struct Settings {
    overrides: Box<dyn SettingsSource>,
    environment: Box<dyn SettingsSource>,
}

impl Settings {
    pub fn new(overrides: impl SettingsSource + 'static, environment: impl SettingsSource + 'static) -> Self {
        Self {
            overrides: Box::new(overrides),
            environment: Box::new(environment),
        }
    }

    /// Overrides on top of the real process environment
    pub fn from_env(overrides: MapSource) -> Self {
        Self::new(overrides, EnvSource)
    }

    /// Resolve a setting: override, then environment, then default.
    ///
    /// Each tier only shadows the next one when it holds a non-empty value.
    /// An empty or missing default resolves to `None`.
    pub fn resolve(&self, property_key: &str, env_key: &str, default: Option<&str>) -> Option<String> {
        if let Some(value) = non_empty(self.overrides.get(property_key)) {
            return Some(value);
        }
        if let Some(value) = non_empty(self.environment.get(env_key)) {
            return Some(value);
        }
        non_empty(default.map(str::to_string))
    }

    /// Resolve a declared setting
    pub fn get(&self, key: &SettingKey) -> Option<String> {
        self.resolve(key.property, key.env, key.default)
    }

    /// Resolve a boolean setting. Only `true` (any case) is true.
    pub fn get_bool(&self, key: &SettingKey) -> bool {
        self.get(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Resolve an integer setting; unparsable values are a configuration error
    pub fn get_i64(&self, key: &SettingKey) -> Result<Option<i64>> {
        self.get(key)
            .map(|v| {
                v.trim().parse::<i64>().map_err(|e| Error::InvalidSetting {
                    key: key.property.to_string(),
                    reason: format!("'{}' is not an integer: {}", v, e),
                })
            })
            .transpose()
    }

    /// Read a raw value from the environment source only
    pub fn env(&self, key: &str) -> Option<String> {
        non_empty(self.environment.get(key))
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings").finish_non_exhaustive()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
