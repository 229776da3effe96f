//! Assignment resolution.
//!
//! Reads the orchestrator's slice assignments for a host and validates every
//! one against freshly probed hardware. Validation is all-or-nothing: a single
//! assignment to a device the host does not have fails the whole resolution.

use crate::error::{AgentError, RegistryError};
use crate::hardware::HardwareInventory;
use crate::keys;
use crate::registry::RegistryClient;
use crate::types::Assignments;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct AssignmentResolver {
    registry: Arc<dyn RegistryClient>,
    hardware: Arc<dyn HardwareInventory>,
}

impl AssignmentResolver {
    pub fn new(registry: Arc<dyn RegistryClient>, hardware: Arc<dyn HardwareInventory>) -> Self {
        Self { registry, hardware }
    }

    /// Resolve the validated device -> assignment mapping for `hostname`.
    ///
    /// Never writes to the registry.
    pub async fn resolve(&self, hostname: &str) -> Result<Assignments, AgentError> {
        let prefix = keys::assigned_slices(hostname)?;
        let scan = keys::scan_prefix(&prefix);
        let raw = self.registry.get_all_with_prefix(&scan).await?;

        let devices = self.hardware.list_devices()?;
        let known: HashSet<&str> = devices.iter().map(|d| d.id.as_str()).collect();

        let mut assignments = Assignments::new();
        for (key, value) in raw {
            let device = keys::device_from_key(&prefix, &key).ok_or_else(|| {
                RegistryError::Read {
                    prefix: scan.clone(),
                    reason: format!("scan returned key {} outside the prefix", key),
                }
            })?;
            if !known.contains(device) {
                return Err(AgentError::UnknownDeviceAssignment {
                    hostname: hostname.to_string(),
                    device: device.to_string(),
                });
            }
            assignments.insert(device.to_string(), value);
        }

        debug!(hostname, count = assignments.len(), "Resolved assignments");
        Ok(assignments)
    }
}
