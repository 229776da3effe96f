//! CLI Tooling
//!
//! `bb-agent` subcommands. Each command builds its collaborators from the
//! effective configuration, runs one reconciliation entry point and renders the
//! resulting assignment map.

use crate::config::{AgentConfig, ConfigLoader, RegistryBackend};
use crate::error::AgentError;
use crate::hardware::{self, HardwareInventory};
use crate::keys;
use crate::reconcile::ReconciliationLoop;
use crate::registry::{self, MemoryRegistry, RegistryClient, SledRegistry};
use crate::types::{Assignments, WatchEvent};
use crate::watch::{ChannelEventSource, EnvEventSource, EventSource};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Burst-buffer host agent
#[derive(Parser)]
#[command(name = "bb-agent")]
#[command(about = "Publishes burst-buffer devices and reconciles slice assignments")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered over the global config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Hostname to publish under (overrides config)
    #[arg(long)]
    pub hostname: Option<String>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Publish the device inventory and print the resolved assignments
    Startup {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Handle one watch event passed in ETCD_WATCH_* environment variables
    Event {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Start up, then re-resolve on every assignment change
    Watch {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Resolve assignments without publishing anything
    Resolve {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Opened registry backend; keeps the concrete handle around for watching.
enum Backend {
    Memory(Arc<MemoryRegistry>),
    Sled(SledRegistry),
}

impl Backend {
    fn watch(&self, prefix: &str) -> Result<ChannelEventSource, AgentError> {
        match self {
            Backend::Memory(registry) => Ok(registry.watch_prefix(prefix)),
            Backend::Sled(registry) => Ok(registry.watch_prefix(prefix)?),
        }
    }
}

/// CLI execution context
pub struct CliContext {
    config: AgentConfig,
    hostname: String,
    event_env: Option<HashMap<String, String>>,
}

impl CliContext {
    /// Load configuration and apply command-line overrides.
    pub fn new(cli: &Cli) -> Result<Self, AgentError> {
        let mut config = match &cli.config {
            Some(path) => ConfigLoader::load_with_file(path)?,
            None => ConfigLoader::load()?,
        };
        if let Some(hostname) = &cli.hostname {
            config.hostname = Some(hostname.clone());
        }
        if let Some(level) = &cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &cli.log_file {
            config.logging.file = Some(file.clone());
        }
        Self::from_config(config)
    }

    pub fn from_config(config: AgentConfig) -> Result<Self, AgentError> {
        let hostname = config.resolve_hostname()?;
        keys::validate_segment("hostname", &hostname)?;
        Ok(Self {
            config,
            hostname,
            event_env: None,
        })
    }

    /// Decode `event` input from this map instead of the process environment.
    pub fn with_event_env(mut self, vars: HashMap<String, String>) -> Self {
        self.event_env = Some(vars);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    fn open_backend(&self) -> Result<Backend, AgentError> {
        match self.config.registry.backend {
            RegistryBackend::Memory => Ok(Backend::Memory(Arc::new(MemoryRegistry::new()))),
            RegistryBackend::Sled => {
                let path = self.config.registry.resolve_path()?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AgentError::ConfigError(format!(
                            "Failed to create registry directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
                info!(path = ?path, "Opening sled registry");
                Ok(Backend::Sled(SledRegistry::open(&path)?))
            }
        }
    }

    fn client(&self, backend: &Backend) -> Arc<dyn RegistryClient> {
        match backend {
            Backend::Memory(registry) => {
                registry::with_policies(Arc::clone(registry), &self.config.registry)
            }
            Backend::Sled(registry) => registry::with_policies(registry.clone(), &self.config.registry),
        }
    }

    fn reconciler(&self, backend: &Backend) -> Result<ReconciliationLoop, AgentError> {
        let hardware: Arc<dyn HardwareInventory> =
            Arc::from(hardware::from_config(&self.config.hardware));
        ReconciliationLoop::new(
            self.hostname.clone(),
            hardware,
            self.client(backend),
            self.config.reconcile.clone(),
        )
    }

    /// Execute a CLI command and return its rendered output.
    ///
    /// Long-running commands hand intermediate output to `emit` as it is
    /// produced; the returned string is the final summary.
    pub async fn execute<F>(&self, command: &Commands, emit: F) -> Result<String, AgentError>
    where
        F: FnMut(String) + Send,
    {
        match command {
            Commands::Startup { format } => {
                let backend = self.open_backend()?;
                let mut reconciler = self.reconciler(&backend)?;
                let assignments = reconciler.startup().await?;
                render_assignments(&assignments, format)
            }
            Commands::Event { format } => {
                let mut source = match &self.event_env {
                    Some(vars) => EnvEventSource::new(vars.clone()),
                    None => EnvEventSource::from_process_env(),
                };
                let event = source.next_event().await?.ok_or_else(|| {
                    AgentError::EventDecode("no watch event available".to_string())
                })?;

                // The long-running agent owns publication; a hook process only resolves.
                let backend = self.open_backend()?;
                let mut reconciler = self.reconciler(&backend)?;
                reconciler.resume();
                let assignments = reconciler.on_event(&event).await?;
                render_assignments(&assignments, format)
            }
            Commands::Watch { format } => {
                let backend = self.open_backend()?;
                let mut reconciler = self.reconciler(&backend)?;
                let prefix = keys::scan_prefix(&keys::assigned_slices(&self.hostname)?);
                let mut source = backend.watch(&prefix)?;
                let processed = follow(&mut reconciler, &mut source, format, emit).await?;
                Ok(format!("Watch ended after {} events", processed))
            }
            Commands::Resolve { format } => {
                let backend = self.open_backend()?;
                let hardware: Arc<dyn HardwareInventory> =
                    Arc::from(hardware::from_config(&self.config.hardware));
                let resolver =
                    crate::assignment::AssignmentResolver::new(self.client(&backend), hardware);
                let assignments = resolver.resolve(&self.hostname).await?;
                render_assignments(&assignments, format)
            }
            Commands::Config => toml::to_string_pretty(&self.config).map_err(|e| {
                AgentError::Output(format!("Failed to serialize configuration: {}", e))
            }),
        }
    }
}

/// Start up, then emit the assignment map after every event from `source`.
///
/// `source` must already be subscribed so that changes landing while startup
/// runs are still delivered.
async fn follow<S, F>(
    reconciler: &mut ReconciliationLoop,
    source: &mut S,
    format: &str,
    mut emit: F,
) -> Result<u64, AgentError>
where
    S: EventSource + ?Sized,
    F: FnMut(String) + Send,
{
    let initial = reconciler.startup().await?;
    emit(render_assignments(&initial, format)?);
    reconciler
        .run(source, |event: &WatchEvent, assignments: &Assignments| {
            match render_assignments(assignments, format) {
                Ok(rendered) => emit(format!("# revision {}\n{}", event.revision, rendered)),
                Err(e) => tracing::error!("Failed to render assignments: {}", e),
            }
        })
        .await
}

/// Render assignments as a table (`text`) or a JSON object (`json`).
pub fn render_assignments(assignments: &Assignments, format: &str) -> Result<String, AgentError> {
    match format {
        "json" => serde_json::to_string_pretty(assignments).map_err(|e| {
            AgentError::Output(format!("Failed to serialize assignments: {}", e))
        }),
        "text" => {
            if assignments.is_empty() {
                return Ok("No assignments".to_string());
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Device", "Assignment"]);
            for (device, value) in assignments {
                table.add_row(vec![device.as_str(), value.as_str()]);
            }
            Ok(table.to_string())
        }
        other => Err(AgentError::Output(format!(
            "Invalid output format: {} (must be 'text' or 'json')",
            other
        ))),
    }
}
