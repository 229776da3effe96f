//! In-process registry with an ordered keyspace, a revision counter and
//! prefix watchers.

use crate::error::RegistryError;
use crate::registry::RegistryClient;
use crate::types::WatchEvent;
use crate::watch::{ChannelEventSource, EventSender};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

struct Watcher {
    prefix: String,
    tx: EventSender,
}

#[derive(Default)]
struct State {
    entries: BTreeMap<String, String>,
    revision: u64,
    watchers: Vec<Watcher>,
}

impl State {
    fn notify(&mut self, event: WatchEvent) {
        self.watchers.retain(|watcher| {
            if !event.key.starts_with(&watcher.prefix) {
                return !watcher.tx.is_closed();
            }
            watcher.tx.send(Ok(event.clone())).is_ok()
        });
    }
}

#[derive(Default)]
pub struct MemoryRegistry {
    state: RwLock<State>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision of the most recent change, 0 when nothing has been written.
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Copy of every entry, for inspection.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.state.read().entries.clone()
    }

    /// Deliver every future change under `prefix` to the returned source.
    pub fn watch_prefix(&self, prefix: &str) -> ChannelEventSource {
        let (tx, source) = ChannelEventSource::channel();
        self.state.write().watchers.push(Watcher {
            prefix: prefix.to_string(),
            tx,
        });
        source
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        state.revision += 1;
        state.entries.insert(key.to_string(), value.to_string());
        let event = WatchEvent {
            event_type: WatchEvent::PUT.to_string(),
            revision: state.revision,
            key: key.to_string(),
            value: value.to_string(),
        };
        state.notify(event);
        Ok(())
    }

    async fn get_all_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        let state = self.state.read();
        Ok(state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        if state.entries.remove(key).is_some() {
            state.revision += 1;
            let event = WatchEvent {
                event_type: WatchEvent::DELETE.to_string(),
                revision: state.revision,
                key: key.to_string(),
                value: String::new(),
            };
            state.notify(event);
        }
        Ok(())
    }
}
