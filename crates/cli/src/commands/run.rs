//! One-shot deployment session

use std::future::Future;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracing::warn;

use payara_harness_common::{
    ContainerConfiguration, DeploymentUnit, Error, ValidatedConfiguration,
};
use payara_harness_container::DeployableContainer;

use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Archives to deploy, in order
    #[arg(required = true)]
    pub archives: Vec<PathBuf>,

    /// Keep the applications deployed until Ctrl-C is pressed
    #[arg(long)]
    pub wait: bool,
}

/// One deployed application
#[derive(Debug, Serialize)]
pub struct DeployedApplication {
    pub archive: String,
    pub application: String,
    pub url: String,
}

impl TableDisplay for DeployedApplication {
    fn headers() -> Vec<&'static str> {
        vec!["Archive", "Application", "URL"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.archive.clone(),
            self.application.clone(),
            self.url.clone(),
        ]
    }
}

pub async fn execute(
    args: RunArgs,
    config: ContainerConfiguration,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let validated = config.validate()?;
    let mut container = DeployableContainer::new();
    let hold = args.wait.then(tokio::signal::ctrl_c);
    run_session(&mut container, validated, &args.archives, hold, format).await?;

    if matches!(format, OutputFormat::Table) {
        output::print_success("Session completed");
    }
    Ok(())
}

/// Set up and start the container, deploy the archives, then tear down.
///
/// When `hold` is given, the applications stay deployed until it resolves.
/// The runtime is stopped even when a deployment fails; that failure is
/// the one reported.
pub async fn run_session<H>(
    container: &mut DeployableContainer,
    config: ValidatedConfiguration,
    archives: &[PathBuf],
    hold: Option<H>,
    format: OutputFormat,
) -> anyhow::Result<()>
where
    H: Future<Output = std::io::Result<()>>,
{
    container.setup(Some(config))?;
    container.start().await?;

    let session = deploy_all(container, archives, hold, format).await;
    let stopped = container.stop().await;

    session?;
    stopped?;
    Ok(())
}

/// Deploy every archive, then undeploy them in reverse order. Whatever was
/// deployed is undeployed again when a later deployment fails.
async fn deploy_all<H>(
    container: &mut DeployableContainer,
    archives: &[PathBuf],
    hold: Option<H>,
    format: OutputFormat,
) -> anyhow::Result<()>
where
    H: Future<Output = std::io::Result<()>>,
{
    let mut deployed: Vec<DeploymentUnit> = Vec::new();
    let mut applications = Vec::new();
    let mut failure = None;

    for archive in archives {
        let unit = DeploymentUnit::from_path(archive);
        match container.deploy(&unit).await {
            Ok(metadata) => {
                for context in &metadata.contexts {
                    applications.push(DeployedApplication {
                        archive: unit.name.clone(),
                        application: context.name.clone(),
                        url: context.url(),
                    });
                }
                deployed.push(unit);
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    if failure.is_none() {
        output::print_list(&applications, format);

        if let Some(hold) = hold {
            output::print_warning("Applications stay deployed until Ctrl-C");
            if let Err(e) = hold.await {
                failure = Some(Error::from(e));
            }
        }
    }

    for unit in deployed.iter().rev() {
        if let Err(e) = container.undeploy(unit).await {
            warn!("{}", e);
            failure.get_or_insert(e);
        }
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
