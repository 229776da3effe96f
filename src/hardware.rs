//! Hardware inventory: enumerates local burst-buffer devices.
//!
//! Probing never touches the registry and never partially fails: a source
//! returns the complete device list or a `HardwareProbe` error.

mod fixed;
mod sysfs;

pub use fixed::FixedInventory;
pub use sysfs::SysfsInventory;

use crate::config::{HardwareConfig, HardwareSource};
use crate::error::AgentError;
use crate::types::Device;

pub trait HardwareInventory: Send + Sync {
    /// List devices in deterministic discovery order.
    fn list_devices(&self) -> Result<Vec<Device>, AgentError>;
}

/// Build the inventory source selected by configuration.
pub fn from_config(config: &HardwareConfig) -> Box<dyn HardwareInventory> {
    match config.source {
        HardwareSource::Fixed => Box::new(FixedInventory::from_config(config)),
        HardwareSource::Sysfs => Box::new(SysfsInventory::new(
            config.sysfs_root.clone(),
            config.name_prefix.clone(),
        )),
    }
}
