//! payara-harness container
//!
//! The lifecycle controller and the runtime managers it delegates to:
//! a spawned Payara Micro process or a remote server reached over the
//! admin REST API.

pub mod controller;
pub mod manager;
pub mod micro;
pub mod process;
pub mod remote;

pub use controller::DeployableContainer;
pub use manager::{DefaultManagerFactory, RuntimeManager, RuntimeManagerFactory};
pub use micro::MicroManager;
pub use process::MicroProcess;
pub use remote::RemoteManager;
