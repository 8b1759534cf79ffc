//! payara-harness CLI
//!
//! Validates runtime configuration, inspects Payara Micro artifacts and
//! runs one-shot deployment sessions from the command line.

pub mod commands;
pub mod logging;
pub mod output;
