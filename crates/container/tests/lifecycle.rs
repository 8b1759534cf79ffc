//! Lifecycle ordering and error decoration, driven by a scripted manager

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use payara_harness_common::{
    ContainerConfiguration, ContainerMode, DeploymentUnit, Error, HttpContext, LifecyclePhase,
    ProtocolMetadata, Result, SessionState, ValidatedConfiguration,
};
use payara_harness_container::{DeployableContainer, RuntimeManager, RuntimeManagerFactory};

/// What the scripted manager should do on each call
#[derive(Clone, Default)]
struct Script {
    fail_start: bool,
    fail_deploy: bool,
    fail_stop: bool,
}

struct ScriptedManager {
    script: Script,
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl RuntimeManager for ScriptedManager {
    fn mode(&self) -> ContainerMode {
        ContainerMode::Remote
    }

    async fn start(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push("start".to_string());
        if self.script.fail_start {
            return Err(Error::Timeout { seconds: 1 });
        }
        Ok(())
    }

    async fn deploy(&mut self, unit: &DeploymentUnit) -> Result<ProtocolMetadata> {
        self.calls.lock().unwrap().push(format!("deploy {}", unit.name));
        if self.script.fail_deploy {
            return Err(Error::Management("application already exists".to_string()));
        }
        Ok(ProtocolMetadata::default().with_context(HttpContext {
            name: unit.application_name().to_string(),
            host: "localhost".to_string(),
            port: 8080,
            context_root: unit.context_root(),
        }))
    }

    async fn undeploy(&mut self, unit: &DeploymentUnit) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("undeploy {}", unit.name));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push("stop".to_string());
        if self.script.fail_stop {
            return Err(Error::Process("already gone".to_string()));
        }
        Ok(())
    }
}

struct ScriptedFactory {
    script: Mutex<Script>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RuntimeManagerFactory for ScriptedFactory {
    fn create(&self, _config: &ValidatedConfiguration) -> Result<Box<dyn RuntimeManager>> {
        Ok(Box::new(ScriptedManager {
            script: self.script.lock().unwrap().clone(),
            calls: self.calls.clone(),
        }))
    }
}

fn container(script: Script) -> (DeployableContainer, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let factory = ScriptedFactory {
        script: Mutex::new(script),
        calls: calls.clone(),
    };
    (DeployableContainer::with_factory(factory), calls)
}

fn remote_config() -> ValidatedConfiguration {
    let mut config = ContainerConfiguration::default();
    config.mode = ContainerMode::Remote;
    config.validate().unwrap()
}

fn unit() -> DeploymentUnit {
    DeploymentUnit::new("test.war", "/tmp/test.war")
}

#[tokio::test]
async fn test_full_session() {
    let (mut container, calls) = container(Script::default());
    assert_eq!(container.state(), SessionState::Unconfigured);

    container.setup(Some(remote_config())).unwrap();
    assert_eq!(container.state(), SessionState::Configured);

    container.start().await.unwrap();
    assert_eq!(container.state(), SessionState::Started);

    let metadata = container.deploy(&unit()).await.unwrap();
    assert_eq!(metadata.contexts[0].url(), "http://localhost:8080/test/");
    container.undeploy(&unit()).await.unwrap();
    container.deploy(&unit()).await.unwrap();

    container.stop().await.unwrap();
    assert_eq!(container.state(), SessionState::Stopped);

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "start",
            "deploy test.war",
            "undeploy test.war",
            "deploy test.war",
            "stop"
        ]
    );
}

#[tokio::test]
async fn test_operations_before_start_are_rejected() {
    let (mut container, calls) = container(Script::default());

    let err = container.deploy(&unit()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition { .. }));

    container.setup(Some(remote_config())).unwrap();
    assert!(matches!(
        container.deploy(&unit()).await.unwrap_err(),
        Error::InvalidStateTransition { .. }
    ));
    assert!(matches!(
        container.undeploy(&unit()).await.unwrap_err(),
        Error::InvalidStateTransition { .. }
    ));
    assert!(matches!(
        container.stop().await.unwrap_err(),
        Error::InvalidStateTransition { .. }
    ));

    assert_eq!(container.state(), SessionState::Configured);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let (mut container, calls) = container(Script::default());
    container.setup(Some(remote_config())).unwrap();
    container.start().await.unwrap();

    let err = container.start().await.unwrap_err();
    match err {
        Error::InvalidStateTransition { from, to } => {
            assert_eq!(from, "started");
            assert_eq!(to, "started");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_start_without_setup_is_rejected() {
    let (mut container, _) = container(Script::default());
    assert!(matches!(
        container.start().await.unwrap_err(),
        Error::InvalidStateTransition { .. }
    ));
    assert_eq!(container.state(), SessionState::Unconfigured);
}

#[tokio::test]
async fn test_failed_start_requires_new_setup() {
    let (mut container, calls) = container(Script {
        fail_start: true,
        ..Script::default()
    });
    container.setup(Some(remote_config())).unwrap();

    let err = container.start().await.unwrap_err();
    match &err {
        Error::Lifecycle { phase, source } => {
            assert_eq!(*phase, LifecyclePhase::Start);
            assert!(matches!(**source, Error::Timeout { seconds: 1 }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(container.state(), SessionState::Failed);

    // No silent retry
    assert!(matches!(
        container.start().await.unwrap_err(),
        Error::InvalidStateTransition { .. }
    ));
    assert_eq!(*calls.lock().unwrap(), vec!["start"]);

    container.setup(Some(remote_config())).unwrap();
    assert_eq!(container.state(), SessionState::Configured);
}

#[tokio::test]
async fn test_deploy_failure_keeps_cause() {
    let (mut container, _) = container(Script {
        fail_deploy: true,
        ..Script::default()
    });
    container.setup(Some(remote_config())).unwrap();
    container.start().await.unwrap();

    let err = container.deploy(&unit()).await.unwrap_err();
    match &err {
        Error::Deployment {
            phase,
            unit,
            source,
        } => {
            assert_eq!(*phase, LifecyclePhase::Deploy);
            assert_eq!(unit, "test.war");
            assert!(source.to_string().contains("application already exists"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(container.state(), SessionState::Started);
}

#[tokio::test]
async fn test_stop_failure_still_ends_session() {
    let (mut container, _) = container(Script {
        fail_stop: true,
        ..Script::default()
    });
    container.setup(Some(remote_config())).unwrap();
    container.start().await.unwrap();

    let err = container.stop().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Lifecycle {
            phase: LifecyclePhase::Stop,
            ..
        }
    ));
    assert_eq!(container.state(), SessionState::Stopped);

    assert!(matches!(
        container.setup(Some(remote_config())).unwrap_err(),
        Error::InvalidStateTransition { .. }
    ));
}

#[tokio::test]
async fn test_setup_failure_is_decorated() {
    let factory = |_config: &ValidatedConfiguration| -> Result<Box<dyn RuntimeManager>> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "no temp dir",
        )))
    };
    let mut container = DeployableContainer::with_factory(factory);

    let err = container.setup(Some(remote_config())).unwrap_err();
    assert!(matches!(
        err,
        Error::Lifecycle {
            phase: LifecyclePhase::Setup,
            ..
        }
    ));
    assert_eq!(container.state(), SessionState::Unconfigured);
}

#[test]
fn test_micro_mode_needs_artifact_before_setup() {
    let err = ContainerConfiguration::default().validate().unwrap_err();
    assert!(matches!(err, Error::MissingSetting(_)));
    assert!(err.is_configuration());
}
