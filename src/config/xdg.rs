//! Platform directories used by the agent.
//!
//! Resolved through `directories::ProjectDirs`, which follows the XDG base
//! directory layout on Linux (`$XDG_CONFIG_HOME/bb-agent`,
//! `$XDG_DATA_HOME/bb-agent`, `$XDG_STATE_HOME/bb-agent`).

use crate::error::AgentError;
use directories::ProjectDirs;
use std::path::PathBuf;

const QUALIFIER: &str = "";
const ORGANIZATION: &str = "burstbuffer";
const APPLICATION: &str = "bb-agent";

/// None when no home directory can be determined.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// `<config dir>/agent.toml`
pub fn global_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("agent.toml"))
}

/// `<data dir>/registry`
pub fn default_registry_path() -> Result<PathBuf, AgentError> {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("registry"))
        .ok_or_else(|| {
            AgentError::ConfigError(
                "Could not determine platform data directory (HOME not set)".to_string(),
            )
        })
}

/// `<state dir>/bb-agent.log`
pub fn default_log_path() -> Result<PathBuf, AgentError> {
    let dirs = project_dirs().ok_or_else(|| {
        AgentError::ConfigError(
            "Could not determine platform state directory for log file".to_string(),
        )
    })?;
    let state_dir = dirs.state_dir().ok_or_else(|| {
        AgentError::ConfigError("Platform state directory not available for log file".to_string())
    })?;
    Ok(state_dir.join("bb-agent.log"))
}
