//! Payara Micro runtime manager
//!
//! Launches Payara Micro as a child process with an empty, hot-deployed
//! deployment directory. Deploying copies the archive into that directory and
//! waits for the runtime to report the application; undeploying removes it.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, info, warn};

use payara_harness_common::{
    split_options, ContainerMode, DeploymentUnit, Error, HttpContext, ProtocolMetadata, Result,
    ValidatedConfiguration,
};

use crate::manager::RuntimeManager;
use crate::process::{is_ready_line, parse_endpoint, MicroProcess};

/// Main class used when the jar is taken from the class path
const MAIN_CLASS: &str = "fish.payara.micro.PayaraMicro";

/// Range random HTTP ports are drawn from
const RANDOM_PORT_RANGE: std::ops::RangeInclusive<u16> = 8080..=9080;

/// JDWP agent added in debug mode
const DEBUG_AGENT: &str = "-agentlib:jdwp=transport=dt_socket,server=y,suspend=n,address=9009";

/// Upper bound for a single hot deployment
const DEPLOY_TIMEOUT: Duration = Duration::from_secs(120);

/// Launches and drives a local Payara Micro instance
pub struct MicroManager {
    config: ValidatedConfiguration,
    deployment_dir: TempDir,
    process: Option<MicroProcess>,
    endpoint: Option<(String, u16)>,
}

impl MicroManager {
    /// Create a manager; nothing is launched until [`RuntimeManager::start`]
    pub fn new(config: ValidatedConfiguration) -> Result<Self> {
        let deployment_dir = tempfile::Builder::new()
            .prefix("payara-harness-deployments-")
            .tempdir()?;

        Ok(Self {
            config,
            deployment_dir,
            process: None,
            endpoint: None,
        })
    }

    pub fn deployment_dir(&self) -> &Path {
        self.deployment_dir.path()
    }

    /// PID of the running process, if any
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(MicroProcess::pid)
    }

    /// Host and port the runtime announced, once started
    pub fn endpoint(&self) -> Option<(&str, u16)> {
        self.endpoint.as_ref().map(|(h, p)| (h.as_str(), *p))
    }

    /// Path of the java executable
    pub fn java_path(&self) -> PathBuf {
        match &self.config.java_home {
            Some(home) => home.join("bin").join("java"),
            None => PathBuf::from("java"),
        }
    }

    /// Build the command line arguments passed to java
    pub fn build_args(&self, http_port: Option<u16>) -> Result<Vec<String>> {
        let jar = self
            .config
            .micro_jar
            .as_ref()
            .ok_or_else(|| Error::MissingSetting("Payara Micro jar".to_string()))?;

        let mut args = Vec::new();

        if self.config.debug {
            args.push(DEBUG_AGENT.to_string());
        }

        // JVM options
        if let Some(options) = &self.config.cmd_options {
            args.extend(split_options(options));
        }

        if self.config.micro_on_classpath {
            args.extend([
                "-cp".to_string(),
                jar.display().to_string(),
                MAIN_CLASS.to_string(),
            ]);
        } else {
            args.extend(["-jar".to_string(), jar.display().to_string()]);
        }

        args.extend([
            "--deploymentDir".to_string(),
            self.deployment_dir.path().display().to_string(),
            "--hotdeploy".to_string(),
        ]);

        if !self.config.cluster_enabled {
            args.push("--nocluster".to_string());
        }

        if self.config.auto_bind_http {
            args.push("--autoBindHttp".to_string());
        }

        if let Some(port) = http_port {
            args.extend(["--port".to_string(), port.to_string()]);
        }

        // Runtime options go last
        if let Some(options) = &self.config.extra_micro_options {
            args.extend(split_options(options));
        }

        Ok(args)
    }

    fn pick_http_port(&self) -> Option<u16> {
        if self.config.random_http_port {
            Some(rand::thread_rng().gen_range(RANDOM_PORT_RANGE))
        } else {
            None
        }
    }

    fn running(&mut self) -> Result<&mut MicroProcess> {
        self.process
            .as_mut()
            .ok_or_else(|| Error::Process("Payara Micro is not running".to_string()))
    }
}

#[async_trait]
impl RuntimeManager for MicroManager {
    fn mode(&self) -> ContainerMode {
        ContainerMode::Micro
    }

    async fn start(&mut self) -> Result<()> {
        let http_port = self.pick_http_port();
        let args = self.build_args(http_port)?;

        if let Some(version) = &self.config.version {
            info!(
                "Starting {} {} ({})",
                version.product_name,
                version,
                version.edition()
            );
        }
        debug!("Payara Micro command: {} {}", self.java_path().display(), args.join(" "));

        let mut command = Command::new(self.java_path());
        command.args(&args);
        let mut process = MicroProcess::spawn(command, self.config.output_to_console)?;

        let mut announced: Option<(String, u16)> = None;
        let ready = process
            .wait_for(self.config.startup_timeout, |line| {
                if announced.is_none() {
                    announced = parse_endpoint(line);
                }
                is_ready_line(line).then_some(Ok(()))
            })
            .await;

        if let Err(e) = ready {
            // Dropping the handle terminates a half-started process
            drop(process);
            return Err(e);
        }

        let endpoint = announced.unwrap_or_else(|| {
            (
                "localhost".to_string(),
                http_port.unwrap_or(*RANDOM_PORT_RANGE.start()),
            )
        });
        info!("Payara Micro is ready at http://{}:{}/", endpoint.0, endpoint.1);

        self.endpoint = Some(endpoint);
        self.process = Some(process);
        Ok(())
    }

    async fn deploy(&mut self, unit: &DeploymentUnit) -> Result<ProtocolMetadata> {
        let target = self.deployment_dir.path().join(&unit.name);
        let app = unit.application_name().to_string();
        let staging = self.deployment_dir.path().join(format!(".{}.part", unit.name));

        let process = self.running()?;
        let stale = process.discard_output();
        if stale > 0 {
            debug!("Discarded {} earlier output lines", stale);
        }

        // The hot deploy scanner must only ever see a complete archive
        fs::copy(&unit.archive, &staging).await?;
        fs::rename(&staging, &target).await?;
        info!("Deploying {} via {}", unit.name, target.display());

        let deployed_marker = format!("{} was successfully deployed", app);
        let failure_marker = format!("the app [{}]", app);
        process
            .wait_for(Some(DEPLOY_TIMEOUT), |line| {
                if line.contains(&deployed_marker) {
                    Some(Ok(()))
                } else if line.contains("Exception while") && line.contains(&failure_marker) {
                    Some(Err(Error::Process(line.trim().to_string())))
                } else {
                    None
                }
            })
            .await?;

        let (host, port) = self
            .endpoint
            .clone()
            .ok_or_else(|| Error::Process("Payara Micro endpoint unknown".to_string()))?;

        Ok(ProtocolMetadata::default().with_context(HttpContext {
            name: app,
            host,
            port,
            context_root: unit.context_root(),
        }))
    }

    async fn undeploy(&mut self, unit: &DeploymentUnit) -> Result<()> {
        self.running()?;
        let target = self.deployment_dir.path().join(&unit.name);
        match fs::remove_file(&target).await {
            Ok(()) => {
                info!("Undeployed {}", unit.name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} was not deployed", unit.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        match self.process.take() {
            Some(mut process) => process.stop().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payara_harness_common::RemoteSettings;

    fn config() -> ValidatedConfiguration {
        ValidatedConfiguration {
            mode: ContainerMode::Micro,
            micro_jar: Some(PathBuf::from("/opt/payara/payara-micro.jar")),
            micro_on_classpath: false,
            version: None,
            startup_timeout: Some(Duration::from_secs(180)),
            cluster_enabled: false,
            random_http_port: true,
            auto_bind_http: true,
            output_to_console: true,
            cmd_options: Some(r"-Xmx512m -Dlog=/var/my\ logs/a.log".to_string()),
            extra_micro_options: Some("--contextroot /".to_string()),
            debug: false,
            java_home: Some(PathBuf::from("/usr/lib/jvm/17")),
            remote: RemoteSettings::default(),
        }
    }

    #[test]
    fn test_build_args_default() {
        let manager = MicroManager::new(config()).unwrap();
        let args = manager.build_args(Some(8500)).unwrap();
        let dir = manager.deployment_dir().display().to_string();

        assert_eq!(
            args,
            vec![
                "-Xmx512m",
                "-Dlog=/var/my logs/a.log",
                "-jar",
                "/opt/payara/payara-micro.jar",
                "--deploymentDir",
                dir.as_str(),
                "--hotdeploy",
                "--nocluster",
                "--autoBindHttp",
                "--port",
                "8500",
                "--contextroot",
                "/",
            ]
        );
        assert_eq!(manager.java_path(), PathBuf::from("/usr/lib/jvm/17/bin/java"));
    }

    #[test]
    fn test_build_args_classpath_debug_cluster() {
        let mut cfg = config();
        cfg.micro_on_classpath = true;
        cfg.debug = true;
        cfg.cluster_enabled = true;
        cfg.auto_bind_http = false;
        cfg.cmd_options = None;
        cfg.extra_micro_options = None;

        let manager = MicroManager::new(cfg).unwrap();
        let args = manager.build_args(None).unwrap();

        assert_eq!(args[0], DEBUG_AGENT);
        assert_eq!(&args[1..4], ["-cp", "/opt/payara/payara-micro.jar", MAIN_CLASS]);
        assert!(!args.contains(&"--nocluster".to_string()));
        assert!(!args.contains(&"--autoBindHttp".to_string()));
        assert!(!args.contains(&"--port".to_string()));
    }

    #[test]
    fn test_random_port_range() {
        let manager = MicroManager::new(config()).unwrap();
        for _ in 0..50 {
            let port = manager.pick_http_port().unwrap();
            assert!(RANDOM_PORT_RANGE.contains(&port));
        }

        let mut cfg = config();
        cfg.random_http_port = false;
        assert_eq!(MicroManager::new(cfg).unwrap().pick_http_port(), None);
    }

    #[tokio::test]
    async fn test_deploy_requires_running_process() {
        let mut manager = MicroManager::new(config()).unwrap();
        let unit = DeploymentUnit::new("app.war", "/tmp/app.war");
        assert!(matches!(manager.deploy(&unit).await.unwrap_err(), Error::Process(_)));
        assert!(manager.stop().await.is_ok());
    }
}
