use crate::error::AgentError;
use crate::hardware::HardwareInventory;
use crate::types::Device;
use std::path::{Path, PathBuf};

/// Linux block layer reports sizes in 512-byte sectors regardless of device.
const SECTOR_BYTES: u64 = 512;

/// Reads block devices from a sysfs-style tree: `<root>/<name>/size`.
#[derive(Debug, Clone)]
pub struct SysfsInventory {
    root: PathBuf,
    name_prefix: String,
}

impl SysfsInventory {
    pub fn new(root: PathBuf, name_prefix: String) -> Self {
        Self { root, name_prefix }
    }

    fn read_size(&self, dir: &Path, name: &str) -> Result<u64, AgentError> {
        let size_path = dir.join("size");
        let raw = std::fs::read_to_string(&size_path).map_err(|e| {
            AgentError::HardwareProbe(format!(
                "Failed to read size of {} from {}: {}",
                name,
                size_path.display(),
                e
            ))
        })?;
        let sectors: u64 = raw.trim().parse().map_err(|e| {
            AgentError::HardwareProbe(format!(
                "Invalid sector count '{}' for {}: {}",
                raw.trim(),
                name,
                e
            ))
        })?;
        sectors.checked_mul(SECTOR_BYTES).ok_or_else(|| {
            AgentError::HardwareProbe(format!("Size of {} overflows u64", name))
        })
    }
}

impl HardwareInventory for SysfsInventory {
    fn list_devices(&self) -> Result<Vec<Device>, AgentError> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            AgentError::HardwareProbe(format!(
                "Failed to read block device directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                AgentError::HardwareProbe(format!(
                    "Failed to read entry in {}: {}",
                    self.root.display(),
                    e
                ))
            })?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("Skipping non UTF8 block device name: {:?}", raw);
                    continue;
                }
            };
            if name.starts_with(&self.name_prefix) {
                names.push((name, entry.path()));
            }
        }
        names.sort_by(|a, b| a.0.cmp(&b.0));

        let mut devices = Vec::with_capacity(names.len());
        for (name, path) in names {
            let capacity_bytes = self.read_size(&path, &name)?;
            devices.push(Device::new(name, capacity_bytes));
        }
        tracing::debug!(root = ?self.root, count = devices.len(), "Probed block devices");
        Ok(devices)
    }
}
