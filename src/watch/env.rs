//! One-shot transport for `etcdctl watch ... -- <command>` style hooks, where
//! the watcher runs a process per change and passes the event in environment
//! variables.

use crate::error::AgentError;
use crate::types::WatchEvent;
use crate::watch::EventSource;
use async_trait::async_trait;
use std::collections::HashMap;

pub const EVENT_TYPE_VAR: &str = "ETCD_WATCH_EVENT_TYPE";
pub const REVISION_VAR: &str = "ETCD_WATCH_REVISION";
pub const KEY_VAR: &str = "ETCD_WATCH_KEY";
pub const VALUE_VAR: &str = "ETCD_WATCH_VALUE";

/// Yields exactly one event decoded from a captured variable map, then ends.
pub struct EnvEventSource {
    vars: HashMap<String, String>,
    consumed: bool,
}

impl EnvEventSource {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self {
            vars,
            consumed: false,
        }
    }

    /// Capture the current process environment.
    pub fn from_process_env() -> Self {
        Self::new(std::env::vars().collect())
    }

    /// Decode the event fields. The value may be absent (deletes carry none).
    pub fn decode(vars: &HashMap<String, String>) -> Result<WatchEvent, AgentError> {
        let required = |name: &str| {
            vars.get(name)
                .cloned()
                .ok_or_else(|| AgentError::EventDecode(format!("{} is not set", name)))
        };

        let event_type = required(EVENT_TYPE_VAR)?;
        let raw_revision = required(REVISION_VAR)?;
        let revision = raw_revision.trim().parse::<u64>().map_err(|e| {
            AgentError::EventDecode(format!(
                "{} '{}' is not a revision number: {}",
                REVISION_VAR, raw_revision, e
            ))
        })?;
        let key = required(KEY_VAR)?;
        let value = vars.get(VALUE_VAR).cloned().unwrap_or_default();

        Ok(WatchEvent {
            event_type,
            revision,
            key,
            value,
        })
    }
}

#[async_trait]
impl EventSource for EnvEventSource {
    async fn next_event(&mut self) -> Result<Option<WatchEvent>, AgentError> {
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;
        Self::decode(&self.vars).map(Some)
    }
}
