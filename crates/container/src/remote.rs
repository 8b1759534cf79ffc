//! Remote runtime manager
//!
//! Talks to an already running Payara Server through the admin REST API
//! (`/management/domain/...`). The instance outlives the test session, so
//! stopping is a no-op.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Method, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use payara_harness_common::{
    ContainerMode, DeploymentUnit, Error, HttpContext, ProtocolMetadata, RemoteSettings, Result,
};

use crate::manager::RuntimeManager;

const APPLICATIONS_PATH: &str = "/management/domain/applications/application";
const DOMAIN_PATH: &str = "/management/domain";

/// Header the admin REST API requires on modifying requests
const REQUESTED_BY: (&str, &str) = ("X-Requested-By", "payara-harness");

/// Per-request timeout for admin calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Reply body of admin commands
#[derive(Debug, Deserialize)]
struct ActionReport {
    exit_code: String,
    #[serde(default)]
    message: Option<String>,
}

/// Drives a running server through its admin REST API
pub struct RemoteManager {
    settings: RemoteSettings,
    client: reqwest::Client,
}

impl RemoteManager {
    pub fn new(settings: RemoteSettings) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { settings, client })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.settings.admin_url(), path);
        debug!("{} {}", method, url);

        let builder = self
            .client
            .request(method, url)
            .header(REQUESTED_BY.0, REQUESTED_BY.1)
            .header(reqwest::header::ACCEPT, "application/json");

        match &self.settings.admin_user {
            Some(user) => builder.basic_auth(user, self.settings.admin_password.as_deref()),
            None => builder,
        }
    }

    async fn run_command(&self, builder: RequestBuilder, action: &str) -> Result<()> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let report: Option<ActionReport> = serde_json::from_str(&body).ok();
        match report {
            Some(report) if status.is_success() && report.exit_code == "SUCCESS" => Ok(()),
            Some(report) => Err(Error::Management(format!(
                "{} failed ({}): {}",
                action,
                report.exit_code,
                report.message.unwrap_or_default()
            ))),
            None if status.is_success() => Ok(()),
            None => Err(Error::Management(format!(
                "{} failed with HTTP {}: {}",
                action,
                status,
                body.trim()
            ))),
        }
    }
}

#[async_trait]
impl RuntimeManager for RemoteManager {
    fn mode(&self) -> ContainerMode {
        ContainerMode::Remote
    }

    async fn start(&mut self) -> Result<()> {
        let response = self
            .request(Method::GET, DOMAIN_PATH)
            .send()
            .await
            .map_err(|e| {
                Error::Management(format!(
                    "Could not connect to DAS on {}: {}",
                    self.settings.admin_url(),
                    e
                ))
            })?;

        if !response.status().is_success() {
            return Err(Error::Management(format!(
                "DAS on {} answered HTTP {}",
                self.settings.admin_url(),
                response.status()
            )));
        }

        info!("Attached to Payara Server at {}", self.settings.admin_url());
        Ok(())
    }

    async fn deploy(&mut self, unit: &DeploymentUnit) -> Result<ProtocolMetadata> {
        let archive = tokio::fs::read(&unit.archive).await?;
        let app = unit.application_name().to_string();

        let form = multipart::Form::new()
            .part(
                "id",
                multipart::Part::bytes(archive).file_name(unit.name.clone()),
            )
            .text("name", app.clone())
            .text("contextroot", app.clone())
            .text("target", self.settings.target.clone())
            .text("force", "true");

        let request = self.request(Method::POST, APPLICATIONS_PATH).multipart(form);
        self.run_command(request, &format!("Deploying {}", unit.name))
            .await?;
        info!("Deployed {} to {}", unit.name, self.settings.target);

        Ok(ProtocolMetadata::default().with_context(HttpContext {
            name: app,
            host: self.settings.admin_host.clone(),
            port: self.settings.http_port,
            context_root: unit.context_root(),
        }))
    }

    async fn undeploy(&mut self, unit: &DeploymentUnit) -> Result<()> {
        let path = format!("{}/{}", APPLICATIONS_PATH, unit.application_name());
        let request = self
            .request(Method::DELETE, &path)
            .query(&[("target", self.settings.target.as_str())]);

        self.run_command(request, &format!("Undeploying {}", unit.name))
            .await?;
        info!("Undeployed {} from {}", unit.name, self.settings.target);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        debug!(
            "Leaving remote instance at {} running",
            self.settings.admin_url()
        );
        Ok(())
    }
}
