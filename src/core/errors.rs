/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::Pid;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by host reclamation primitives
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HostError {
    #[error("Process {0} no longer exists")]
    #[diagnostic(
        code(host::process_gone),
        help("The process died before the request reached it. It is dropped from tracking.")
    )]
    ProcessGone(Pid),

    #[error("Host rejected request for process {pid}: {reason}")]
    #[diagnostic(code(host::rejected))]
    Rejected { pid: Pid, reason: String },

    #[error("Host primitive unavailable: {0}")]
    #[diagnostic(
        code(host::unavailable),
        help("The adapter could not reach the host service. The request is retried on the next cycle.")
    )]
    Unavailable(String),
}

impl HostError {
    /// Whether the target process is gone for good
    #[inline]
    #[must_use]
    pub const fn is_process_gone(&self) -> bool {
        matches!(self, HostError::ProcessGone(_))
    }
}

/// Policy store read failures
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PolicyError {
    #[error("Policy store unavailable: {0}")]
    #[diagnostic(
        code(policy::unavailable),
        help("Features depending on per-app policy fall back to disabled.")
    )]
    Unavailable(String),

    #[error("Malformed policy for {package}: {reason}")]
    #[diagnostic(code(policy::malformed))]
    Malformed { package: String, reason: String },
}

/// Configuration loading and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    #[diagnostic(code(config::io), help("Check the path in RECLAIM_CONFIG."))]
    Io(String),

    #[error("Failed to parse configuration: {0}")]
    #[diagnostic(code(config::parse))]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(config::invalid),
        help("Intervals, delays and throttle windows must be non-zero.")
    )]
    Invalid(String),
}

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Host error: {0}")]
    #[diagnostic(transparent)]
    Host(#[from] HostError),

    #[error("Policy error: {0}")]
    #[diagnostic(transparent)]
    Policy(#[from] PolicyError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Missing component: {0}")]
    #[diagnostic(
        code(kernel::missing_component),
        help("Provide the component through Kernel::builder() before calling build().")
    )]
    MissingComponent(&'static str),

    #[error("Runtime unavailable: {0}")]
    #[diagnostic(
        code(kernel::runtime_unavailable),
        help("Build the kernel from inside a tokio runtime or pass a runtime handle.")
    )]
    Runtime(String),
}
