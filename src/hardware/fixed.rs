use crate::config::HardwareConfig;
use crate::error::AgentError;
use crate::hardware::HardwareInventory;
use crate::types::Device;

/// Statically configured device set, used on hosts without a probe and in tests.
#[derive(Debug, Clone)]
pub struct FixedInventory {
    devices: Vec<Device>,
}

impl FixedInventory {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    /// `count` devices named by substituting the index into `pattern` at `{}`.
    pub fn uniform(count: usize, pattern: &str, size_bytes: u64) -> Self {
        let devices = (0..count)
            .map(|i| Device::new(pattern.replacen("{}", &i.to_string(), 1), size_bytes))
            .collect();
        Self { devices }
    }

    pub fn from_config(config: &HardwareConfig) -> Self {
        Self::uniform(
            config.device_count,
            &config.device_pattern,
            config.device_size_bytes,
        )
    }
}

impl HardwareInventory for FixedInventory {
    fn list_devices(&self) -> Result<Vec<Device>, AgentError> {
        Ok(self.devices.clone())
    }
}
