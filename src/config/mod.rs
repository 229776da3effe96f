//! Agent configuration.
//!
//! Loaded in layers by [`ConfigLoader`]: built-in defaults, the global config
//! file, an optional explicit file, then `BURSTBUFFER_*` environment variables.

pub mod facade;
pub mod merge;
pub mod sources;
pub mod xdg;

pub use facade::ConfigLoader;

use crate::error::AgentError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 1.5 TiB, the nominal size of one burst-buffer NVMe device
pub const DEFAULT_DEVICE_SIZE_BYTES: u64 = 3 * (1 << 39);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name this host publishes under; falls back to the system hostname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub hardware: HardwareConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgentConfig {
    /// Configured hostname, else `HOSTNAME`, else the kernel hostname.
    pub fn resolve_hostname(&self) -> Result<String, AgentError> {
        if let Some(name) = self.hostname.as_deref().map(str::trim) {
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
        if let Ok(name) = std::env::var("HOSTNAME") {
            if !name.trim().is_empty() {
                return Ok(name.trim().to_string());
            }
        }
        let name = std::fs::read_to_string("/proc/sys/kernel/hostname").map_err(|e| {
            AgentError::ConfigError(format!("Could not determine hostname: {}", e))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AgentError::ConfigError(
                "Kernel reported an empty hostname".to_string(),
            ));
        }
        Ok(name.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    Memory,
    Sled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_backend")]
    pub backend: RegistryBackend,

    /// Database path for the sled backend; None means the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Deadline for a single registry call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_backend() -> RegistryBackend {
    RegistryBackend::Sled
}

fn default_timeout_ms() -> u64 {
    5000
}

impl RegistryConfig {
    /// Resolve the sled database location.
    pub fn resolve_path(&self) -> Result<PathBuf, AgentError> {
        match &self.path {
            Some(path) if !path.as_os_str().is_empty() => Ok(path.clone()),
            _ => xdg::default_registry_path(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            timeout_ms: default_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call; 1 disables retries
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    200
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareSource {
    Fixed,
    Sysfs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default = "default_source")]
    pub source: HardwareSource,

    /// Fixed source: number of devices
    #[serde(default = "default_device_count")]
    pub device_count: usize,

    /// Fixed source: device name, `{}` is replaced by the index
    #[serde(default = "default_device_pattern")]
    pub device_pattern: String,

    /// Fixed source: capacity reported for every device
    #[serde(default = "default_device_size_bytes")]
    pub device_size_bytes: u64,

    /// Sysfs source: block device directory
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Sysfs source: only devices whose name starts with this are reported
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

fn default_source() -> HardwareSource {
    HardwareSource::Fixed
}

fn default_device_count() -> usize {
    12
}

fn default_device_pattern() -> String {
    "nvme{}n1".to_string()
}

fn default_device_size_bytes() -> u64 {
    DEFAULT_DEVICE_SIZE_BYTES
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/block")
}

fn default_name_prefix() -> String {
    "nvme".to_string()
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            device_count: default_device_count(),
            device_pattern: default_device_pattern(),
            device_size_bytes: default_device_size_bytes(),
            sysfs_root: default_sysfs_root(),
            name_prefix: default_name_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Delete slice records of devices that disappeared since the last run
    #[serde(default)]
    pub prune_stale_slices: bool,
}
