//! Deployable container
//!
//! Sequences `setup -> start -> {deploy | undeploy}* -> stop` against the
//! runtime manager selected for the configuration. Out-of-order calls are
//! rejected before anything is delegated, and delegated failures come back
//! decorated with the phase they happened in.

use tracing::{error, info, warn};

use payara_harness_common::{
    Descriptor, DeploymentUnit, Error, LifecyclePhase, ProtocolDescription, ProtocolMetadata,
    Result, SessionState, ValidatedConfiguration,
};

use crate::manager::{DefaultManagerFactory, RuntimeManager, RuntimeManagerFactory};

/// Drives one test session against a Payara runtime
pub struct DeployableContainer {
    state: SessionState,
    config: Option<ValidatedConfiguration>,
    manager: Option<Box<dyn RuntimeManager>>,
    factory: Box<dyn RuntimeManagerFactory>,
}

impl Default for DeployableContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployableContainer {
    /// Container whose manager is chosen from the configured mode
    pub fn new() -> Self {
        Self::with_factory(DefaultManagerFactory)
    }

    /// Container using a custom manager factory
    pub fn with_factory(factory: impl RuntimeManagerFactory + 'static) -> Self {
        Self {
            state: SessionState::Unconfigured,
            config: None,
            manager: None,
            factory: Box::new(factory),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configuration accepted by the last successful `setup`
    pub fn configuration(&self) -> Option<&ValidatedConfiguration> {
        self.config.as_ref()
    }

    pub fn default_protocol(&self) -> ProtocolDescription {
        ProtocolDescription::servlet_3_0()
    }

    /// Accept a validated configuration and prepare its runtime manager
    pub fn setup(&mut self, config: Option<ValidatedConfiguration>) -> Result<()> {
        if matches!(self.state, SessionState::Started | SessionState::Stopped) {
            return Err(self.transition_error(SessionState::Configured));
        }
        let config = config.ok_or(Error::ConfigurationRequired)?;

        let manager = self
            .factory
            .create(&config)
            .map_err(|e| Error::lifecycle(LifecyclePhase::Setup, e))?;

        info!("Configured {} container", manager.mode());
        self.manager = Some(manager);
        self.config = Some(config);
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Start the runtime. A failure leaves the session in `Failed`.
    pub async fn start(&mut self) -> Result<()> {
        self.expect_state(SessionState::Configured, SessionState::Started)?;
        let result = self.manager_mut()?.start().await;

        match result {
            Ok(()) => {
                self.state = SessionState::Started;
                info!("Container started");
                Ok(())
            }
            Err(e) => {
                error!("Container failed to start: {}", e);
                self.manager = None;
                self.state = SessionState::Failed;
                Err(Error::lifecycle(LifecyclePhase::Start, e))
            }
        }
    }

    /// Deploy an archive, returning how to reach it
    pub async fn deploy(&mut self, unit: &DeploymentUnit) -> Result<ProtocolMetadata> {
        self.expect_state(SessionState::Started, SessionState::Started)?;
        self.manager_mut()?
            .deploy(unit)
            .await
            .map_err(|e| Error::deployment(LifecyclePhase::Deploy, &unit.name, e))
    }

    pub async fn undeploy(&mut self, unit: &DeploymentUnit) -> Result<()> {
        self.expect_state(SessionState::Started, SessionState::Started)?;
        self.manager_mut()?
            .undeploy(unit)
            .await
            .map_err(|e| Error::deployment(LifecyclePhase::Undeploy, &unit.name, e))
    }

    /// Release the runtime. The session ends in `Stopped` even when the
    /// manager reports a failure.
    pub async fn stop(&mut self) -> Result<()> {
        self.expect_state(SessionState::Started, SessionState::Stopped)?;
        let mut manager = self
            .manager
            .take()
            .ok_or_else(|| self.transition_error(SessionState::Stopped))?;

        let result = manager.stop().await;
        self.state = SessionState::Stopped;

        match result {
            Ok(()) => {
                info!("Container stopped");
                Ok(())
            }
            Err(e) => {
                warn!("Container stop reported: {}", e);
                Err(Error::lifecycle(LifecyclePhase::Stop, e))
            }
        }
    }

    /// Descriptor-only deployments are not supported
    pub fn deploy_descriptor(&mut self, descriptor: &Descriptor) -> Result<()> {
        Err(Error::Unsupported(format!(
            "deployment of descriptor {}",
            descriptor.name
        )))
    }

    pub fn undeploy_descriptor(&mut self, descriptor: &Descriptor) -> Result<()> {
        Err(Error::Unsupported(format!(
            "undeployment of descriptor {}",
            descriptor.name
        )))
    }

    fn expect_state(&self, expected: SessionState, to: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.transition_error(to))
        }
    }

    fn transition_error(&self, to: SessionState) -> Error {
        Error::InvalidStateTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }

    fn manager_mut(&mut self) -> Result<&mut Box<dyn RuntimeManager>> {
        let from = self.state;
        self.manager
            .as_mut()
            .ok_or_else(|| Error::InvalidStateTransition {
                from: from.to_string(),
                to: "no runtime manager".to_string(),
            })
    }
}
