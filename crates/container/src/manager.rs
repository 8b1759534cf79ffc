//! Runtime manager capability
//!
//! A runtime manager performs the actual process or network work for one
//! session. Each container flavour implements it; the controller only
//! sequences the calls.

use async_trait::async_trait;
use payara_harness_common::{
    ContainerMode, DeploymentUnit, ProtocolMetadata, Result, ValidatedConfiguration,
};

use crate::micro::MicroManager;
use crate::remote::RemoteManager;

/// Performs start/deploy/undeploy/stop against one runtime instance
#[async_trait]
pub trait RuntimeManager: Send {
    /// Which flavour this manager implements
    fn mode(&self) -> ContainerMode;

    /// Bring the runtime to a state where it accepts deployments
    async fn start(&mut self) -> Result<()>;

    /// Deploy an archive and describe how to reach it
    async fn deploy(&mut self, unit: &DeploymentUnit) -> Result<ProtocolMetadata>;

    /// Remove a previously deployed archive
    async fn undeploy(&mut self, unit: &DeploymentUnit) -> Result<()>;

    /// Release the runtime. Managers that do not own a process do nothing.
    async fn stop(&mut self) -> Result<()>;
}

/// Builds the runtime manager for a validated configuration
pub trait RuntimeManagerFactory: Send + Sync {
    fn create(&self, config: &ValidatedConfiguration) -> Result<Box<dyn RuntimeManager>>;
}

impl<F> RuntimeManagerFactory for F
where
    F: Fn(&ValidatedConfiguration) -> Result<Box<dyn RuntimeManager>> + Send + Sync,
{
    fn create(&self, config: &ValidatedConfiguration) -> Result<Box<dyn RuntimeManager>> {
        self(config)
    }
}

/// Selects the manager from the configured container mode
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultManagerFactory;

impl RuntimeManagerFactory for DefaultManagerFactory {
    fn create(&self, config: &ValidatedConfiguration) -> Result<Box<dyn RuntimeManager>> {
        match config.mode {
            ContainerMode::Micro => Ok(Box::new(MicroManager::new(config.clone())?)),
            ContainerMode::Remote => Ok(Box::new(RemoteManager::new(config.remote.clone())?)),
        }
    }
}
