//! Runtime artifact version command

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use payara_harness_common::{ContainerConfiguration, VersionDescriptor, VersionResolver};

use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct VersionArgs {
    /// Artifact to inspect instead of the configured one
    #[arg(long)]
    pub jar: Option<PathBuf>,
}

impl TableDisplay for VersionDescriptor {
    fn headers() -> Vec<&'static str> {
        vec!["Product", "Version", "Edition"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.product_name.clone(),
            self.to_string(),
            self.edition().to_string(),
        ]
    }
}

pub fn execute(
    args: VersionArgs,
    config: ContainerConfiguration,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let jar = args
        .jar
        .or_else(|| config.micro_jar())
        .context("No Payara Micro jar configured; pass --jar or set MICRO_JAR")?;

    let version = VersionResolver::resolve(&jar)?;
    output::print_item(&version, format);
    Ok(())
}
