use burstbuffer_agent::config::ReconcileConfig;
use burstbuffer_agent::hardware::FixedInventory;
use burstbuffer_agent::registry::MemoryRegistry;
use burstbuffer_agent::{Device, ReconciliationLoop};
use std::sync::Arc;

pub fn devices(ids: &[&str]) -> Vec<Device> {
    ids.iter().map(|id| Device::new(*id, 1 << 30)).collect()
}

pub fn reconciler(
    hostname: &str,
    registry: Arc<MemoryRegistry>,
    ids: &[&str],
    options: ReconcileConfig,
) -> ReconciliationLoop {
    let hardware = Arc::new(FixedInventory::new(devices(ids)));
    ReconciliationLoop::new(hostname, hardware, registry, options).unwrap()
}

pub fn assignment_key(hostname: &str, device: &str) -> String {
    format!("bufferhosts/assigned_slices/{}/{}", hostname, device)
}

pub fn slice_key(hostname: &str, device: &str) -> String {
    format!("bufferhosts/all_slices/{}/{}", hostname, device)
}
