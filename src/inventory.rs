//! Inventory publication: mirrors this host's device set into the slice
//! namespace of the registry.

use crate::error::AgentError;
use crate::keys;
use crate::registry::RegistryClient;
use crate::types::Device;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct InventoryPublisher {
    registry: Arc<dyn RegistryClient>,
}

impl InventoryPublisher {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    /// Write one slice record per device, value = capacity in bytes.
    ///
    /// Keys are validated before the first write. Writes are independent and
    /// the first failure is returned as-is; records written before it stay.
    pub async fn publish(&self, hostname: &str, devices: &[Device]) -> Result<(), AgentError> {
        let records = devices
            .iter()
            .map(|device| {
                keys::all_slices(hostname, &device.id)
                    .map(|key| (key, device.capacity_bytes.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (key, capacity) in &records {
            self.registry.put(key, capacity).await?;
            debug!(key = %key, capacity = %capacity, "Published slice record");
        }
        info!(hostname, count = records.len(), "Published slice inventory");
        Ok(())
    }

    /// Delete slice records of devices that are no longer present.
    ///
    /// Returns the device names whose records were removed.
    pub async fn prune_stale(
        &self,
        hostname: &str,
        devices: &[Device],
    ) -> Result<Vec<String>, AgentError> {
        let scan = keys::all_slices_scan(hostname)?;
        let current: HashSet<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        let published = self.registry.get_all_with_prefix(&scan).await?;

        let mut removed = Vec::new();
        for key in published.keys() {
            let device = match key.strip_prefix(&scan) {
                Some(device) => device,
                None => continue,
            };
            if current.contains(device) {
                continue;
            }
            self.registry.delete(key).await?;
            info!(hostname, device, "Pruned stale slice record");
            removed.push(device.to_string());
        }
        Ok(removed)
    }
}
