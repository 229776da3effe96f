//! Core types shared across the agent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A physical storage device discovered on this host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Host-local device name, e.g. `nvme0n1`
    pub id: String,
    /// Raw capacity in bytes
    pub capacity_bytes: u64,
}

impl Device {
    pub fn new(id: impl Into<String>, capacity_bytes: u64) -> Self {
        Self {
            id: id.into(),
            capacity_bytes,
        }
    }
}

/// Validated assignments for one host: device -> opaque assignment payload.
pub type Assignments = BTreeMap<String, String>;

/// A single ordered change notification from the registry watch stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub event_type: String,
    pub revision: u64,
    pub key: String,
    pub value: String,
}

impl WatchEvent {
    pub const PUT: &'static str = "PUT";
    pub const DELETE: &'static str = "DELETE";
}
