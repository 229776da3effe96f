//! Error types for the agent.
//!
//! `RegistryError` covers every failure at the registry RPC boundary;
//! `AgentError` is what `startup`, `on_event` and the CLI surface to callers.

use std::time::Duration;
use thiserror::Error;

/// Failures talking to the distributed registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry write failed for key {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("registry read failed for prefix {prefix}: {reason}")]
    Read { prefix: String, reason: String },

    #[error("registry delete failed for key {key}: {reason}")]
    Delete { key: String, reason: String },

    #[error("registry {operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("registry backend error: {0}")]
    Backend(String),
}

impl RegistryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RegistryError::Timeout { .. })
    }
}

/// Top-level agent error.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("hardware probe failed: {0}")]
    HardwareProbe(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The registry assigns a device this host does not have.
    #[error("assignment to unknown device {device} on host {hostname}")]
    UnknownDeviceAssignment { hostname: String, device: String },

    #[error("invalid {kind} '{value}': must be non-empty and must not contain '/'")]
    InvalidKeySegment { kind: &'static str, value: String },

    #[error("failed to decode watch event: {0}")]
    EventDecode(String),

    #[error("reconciliation loop has not been started")]
    NotStarted,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("failed to render output: {0}")]
    Output(String),
}

impl From<config::ConfigError> for AgentError {
    fn from(err: config::ConfigError) -> Self {
        AgentError::ConfigError(err.to_string())
    }
}
