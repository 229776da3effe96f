//! Burst-buffer host agent
//!
//! Discovers the host's burst-buffer devices, publishes their capacity into the
//! shared registry, and reconciles the slices the orchestrator assigns to this
//! host against what physically exists.

pub mod assignment;
pub mod config;
pub mod error;
pub mod hardware;
pub mod inventory;
pub mod keys;
pub mod logging;
pub mod reconcile;
pub mod registry;
pub mod tooling;
pub mod types;
pub mod watch;

pub use assignment::AssignmentResolver;
pub use error::{AgentError, RegistryError};
pub use inventory::InventoryPublisher;
pub use reconcile::{LoopState, ReconciliationLoop};
pub use types::{Assignments, Device, WatchEvent};
