//! Persistent registry backed by a local sled database.
//!
//! Used for single-node deployments and for replaying a registry snapshot
//! locally. sled keeps no per-change revision, so watch events are stamped with
//! `Db::generate_id`, which is strictly increasing for the lifetime of the db.
//!
//! sled calls block (flush waits on disk), so every operation runs on the
//! blocking pool and the async caller, including a `WithTimeout` wrapper, stays
//! responsive.

use crate::error::{AgentError, RegistryError};
use crate::registry::RegistryClient;
use crate::types::WatchEvent;
use crate::watch::ChannelEventSource;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::Utf8Error;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SledRegistry {
    db: sled::Db,
}

fn decode(bytes: &[u8]) -> Result<String, Utf8Error> {
    std::str::from_utf8(bytes).map(str::to_owned)
}

/// Run a blocking sled operation off the async runtime.
async fn offload<T, F>(op: F) -> Result<T, RegistryError>
where
    F: FnOnce() -> Result<T, RegistryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| RegistryError::Backend(format!("sled task failed: {}", e)))?
}

impl SledRegistry {
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        let db = sled::open(path).map_err(|e| {
            RegistryError::Backend(format!(
                "Failed to open sled registry at {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { db })
    }

    /// Throwaway database removed on drop.
    pub fn temporary() -> Result<Self, RegistryError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| RegistryError::Backend(format!("Failed to open temporary sled db: {}", e)))?;
        Ok(Self { db })
    }

    /// Stream every future change under `prefix`.
    ///
    /// A dedicated thread drains the sled subscriber and exits once the
    /// returned source is dropped and the next change arrives. A change whose
    /// key or value is not UTF-8 ends the stream with `EventDecode`.
    pub fn watch_prefix(&self, prefix: &str) -> Result<ChannelEventSource, RegistryError> {
        let subscriber = self.db.watch_prefix(prefix.as_bytes());
        let db = self.db.clone();
        let (tx, source) = ChannelEventSource::channel();
        let watched = prefix.to_string();

        std::thread::Builder::new()
            .name("sled-watch".to_string())
            .spawn(move || {
                for event in subscriber {
                    let revision = match db.generate_id() {
                        Ok(id) => id,
                        Err(e) => {
                            warn!(prefix = %watched, "Failed to stamp watch revision: {}", e);
                            break;
                        }
                    };
                    let decoded = match event {
                        sled::Event::Insert { key, value } => {
                            decode(&key).and_then(|key| {
                                Ok(WatchEvent {
                                    event_type: WatchEvent::PUT.to_string(),
                                    revision,
                                    key,
                                    value: decode(&value)?,
                                })
                            })
                        }
                        sled::Event::Remove { key } => decode(&key).map(|key| WatchEvent {
                            event_type: WatchEvent::DELETE.to_string(),
                            revision,
                            key,
                            value: String::new(),
                        }),
                    };
                    match decoded {
                        Ok(event) => {
                            if tx.send(Ok(event)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(prefix = %watched, revision, "Undecodable change: {}", e);
                            let _ = tx.send(Err(AgentError::EventDecode(format!(
                                "change under {} at revision {} is not UTF-8: {}",
                                watched, revision, e
                            ))));
                            break;
                        }
                    }
                }
                debug!(prefix = %watched, "Sled watch thread exiting");
            })
            .map_err(|e| RegistryError::Backend(format!("Failed to spawn watch thread: {}", e)))?;

        Ok(source)
    }
}

#[async_trait]
impl RegistryClient for SledRegistry {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        let db = self.db.clone();
        let key = key.to_string();
        let value = value.to_string();
        offload(move || {
            let write_err = |e: sled::Error| RegistryError::Write {
                key: key.clone(),
                reason: e.to_string(),
            };
            db.insert(key.as_bytes(), value.as_bytes())
                .map_err(write_err)?;
            db.flush().map_err(write_err)?;
            Ok(())
        })
        .await
    }

    async fn get_all_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        let db = self.db.clone();
        let prefix = prefix.to_string();
        offload(move || {
            let read_err = |reason: String| RegistryError::Read {
                prefix: prefix.clone(),
                reason,
            };
            let mut found = BTreeMap::new();
            for item in db.scan_prefix(prefix.as_bytes()) {
                let (key, value) = item.map_err(|e| read_err(e.to_string()))?;
                let key = decode(&key).map_err(|e| read_err(format!("key is not UTF-8: {}", e)))?;
                let value = decode(&value)
                    .map_err(|e| read_err(format!("value of {} is not UTF-8: {}", key, e)))?;
                found.insert(key, value);
            }
            Ok(found)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        let db = self.db.clone();
        let key = key.to_string();
        offload(move || {
            let delete_err = |e: sled::Error| RegistryError::Delete {
                key: key.clone(),
                reason: e.to_string(),
            };
            db.remove(key.as_bytes()).map_err(delete_err)?;
            db.flush().map_err(delete_err)?;
            Ok(())
        })
        .await
    }
}
