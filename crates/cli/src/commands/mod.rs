//! CLI Commands

pub mod run;
pub mod validate;
pub mod version;

use std::path::Path;

use payara_harness_common::{ContainerConfiguration, MapSource, Settings};

/// Build the configuration from the overrides file, `--set` pairs and the
/// environment. Pairs given on the command line win over the file.
pub fn load_configuration(
    config_file: &Path,
    pairs: &[String],
) -> anyhow::Result<ContainerConfiguration> {
    let mut overrides = MapSource::load(config_file)?;
    for pair in pairs {
        let (key, value) = MapSource::parse_pair(pair)?;
        overrides.insert(key, value);
    }

    let settings = Settings::from_env(overrides);
    tracing::debug!("Resolving configuration from {:?}", settings);
    Ok(ContainerConfiguration::from_settings(&settings)?)
}
