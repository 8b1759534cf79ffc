//! Runtime version detection
//!
//! A Payara Micro jar carries its branding properties at a fixed path inside
//! the archive. The version descriptor is built from five keys of that
//! resource, and the edition is derived from the product name.

use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::properties::Properties;
use crate::{Error, Result};

/// Location of the branding properties inside the runtime artifact
pub const BRANDING_RESOURCE: &str = "MICRO-INF/domain/branding/glassfish-version.properties";

const MAJOR_VERSION: &str = "major_version";
const MINOR_VERSION: &str = "minor_version";
const UPDATE_VERSION: &str = "update_version";
const PAYARA_VERSION: &str = "payara_version";
const PAYARA_UPDATE_VERSION: &str = "payara_update_version";
const PRODUCT_NAME: &str = "product_name";

/// Structured runtime version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub major: String,
    pub minor: String,
    pub update: String,
    pub product_version: String,
    pub product_update_version: String,
    pub product_name: String,
    pub enterprise: bool,
}

impl VersionDescriptor {
    /// Build a descriptor from branding properties
    pub fn from_properties(props: &Properties) -> std::result::Result<Self, String> {
        let required = |key: &str| -> std::result::Result<String, String> {
            props
                .get(key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().to_string())
                .ok_or_else(|| format!("missing property '{}'", key))
        };

        let product_name = required(PRODUCT_NAME)?;
        Ok(Self {
            major: required(MAJOR_VERSION)?,
            minor: required(MINOR_VERSION)?,
            update: required(UPDATE_VERSION)?,
            product_version: required(PAYARA_VERSION)?,
            product_update_version: required(PAYARA_UPDATE_VERSION)?,
            enterprise: product_name.contains("Enterprise"),
            product_name,
        })
    }

    /// Human readable edition name
    pub fn edition(&self) -> &'static str {
        if self.enterprise {
            "enterprise"
        } else {
            "community"
        }
    }

    fn components(&self) -> [&str; 5] {
        [
            &self.major,
            &self.minor,
            &self.update,
            &self.product_version,
            &self.product_update_version,
        ]
    }

    /// Component-wise comparison, numeric where both sides are numbers
    pub fn compare(&self, other: &Self) -> Ordering {
        for (a, b) in self.components().iter().zip(other.components().iter()) {
            let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    pub fn is_more_recent_than(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

impl std::fmt::Display for VersionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.components().join("."))
    }
}

/// Reads version information out of a runtime artifact
pub struct VersionResolver;

impl VersionResolver {
    /// Open the artifact and build its version descriptor.
    ///
    /// Every failure (unreadable file, not a zip, missing resource, missing
    /// key) is reported as [`Error::InvalidArtifact`].
    pub fn resolve(artifact: &Path) -> Result<VersionDescriptor> {
        debug!("Reading branding properties from {}", artifact.display());

        let content = read_branding(artifact).map_err(|reason| invalid(artifact, reason))?;
        let props = Properties::parse(&content);
        let version = VersionDescriptor::from_properties(&props).map_err(|reason| invalid(artifact, reason))?;

        debug!(
            "Detected {} {} ({})",
            version.product_name,
            version,
            version.edition()
        );
        Ok(version)
    }
}

fn read_branding(artifact: &Path) -> std::result::Result<String, String> {
    let file = File::open(artifact).map_err(|e| format!("unable to open: {}", e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| format!("not a readable archive: {}", e))?;

    let mut entry = archive.by_name(BRANDING_RESOURCE).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => "branding properties not found".to_string(),
        other => format!("unable to read branding properties: {}", other),
    })?;

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| format!("unable to read branding properties: {}", e))?;
    Ok(content)
}

fn invalid(artifact: &Path, reason: String) -> Error {
    Error::InvalidArtifact {
        path: PathBuf::from(artifact),
        resource: BRANDING_RESOURCE.to_string(),
        reason,
    }
}
