//! Reconciliation loop
//!
//! Binds hardware probing, inventory publication and assignment resolution into
//! the agent's two entry points. `startup` (or `resume`) moves the loop from
//! `Uninitialized` to `Steady`; every watch event afterwards re-resolves the
//! full assignment set rather than patching state from the event payload.

use crate::assignment::AssignmentResolver;
use crate::config::ReconcileConfig;
use crate::error::AgentError;
use crate::hardware::HardwareInventory;
use crate::inventory::InventoryPublisher;
use crate::keys;
use crate::registry::RegistryClient;
use crate::types::{Assignments, WatchEvent};
use crate::watch::EventSource;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    /// Started; tracks the highest event revision seen so far
    Steady { last_revision: Option<u64> },
}

pub struct ReconciliationLoop {
    hostname: String,
    hardware: Arc<dyn HardwareInventory>,
    publisher: InventoryPublisher,
    resolver: AssignmentResolver,
    options: ReconcileConfig,
    state: LoopState,
}

impl ReconciliationLoop {
    pub fn new(
        hostname: impl Into<String>,
        hardware: Arc<dyn HardwareInventory>,
        registry: Arc<dyn RegistryClient>,
        options: ReconcileConfig,
    ) -> Result<Self, AgentError> {
        let hostname = hostname.into();
        keys::validate_segment("hostname", &hostname)?;
        Ok(Self {
            publisher: InventoryPublisher::new(Arc::clone(&registry)),
            resolver: AssignmentResolver::new(registry, Arc::clone(&hardware)),
            hostname,
            hardware,
            options,
            state: LoopState::Uninitialized,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Probe hardware, publish the full inventory, then resolve assignments.
    ///
    /// The loop only becomes `Steady` if every step succeeds. Calling it again
    /// re-publishes and keeps the revision watermark.
    pub async fn startup(&mut self) -> Result<Assignments, AgentError> {
        let devices = self.hardware.list_devices()?;
        info!(
            hostname = %self.hostname,
            devices = devices.len(),
            "Starting reconciliation"
        );

        self.publisher.publish(&self.hostname, &devices).await?;
        if self.options.prune_stale_slices {
            let removed = self.publisher.prune_stale(&self.hostname, &devices).await?;
            if !removed.is_empty() {
                info!(hostname = %self.hostname, removed = ?removed, "Pruned stale slices");
            }
        }

        let assignments = self.resolver.resolve(&self.hostname).await?;
        if self.state == LoopState::Uninitialized {
            self.state = LoopState::Steady {
                last_revision: None,
            };
        }
        info!(
            hostname = %self.hostname,
            assignments = assignments.len(),
            "Startup reconciliation complete"
        );
        Ok(assignments)
    }

    /// Enter `Steady` without probing or publishing.
    ///
    /// For processes that only handle events, such as a watch hook spawned per
    /// change, where a long-running instance already published the inventory.
    /// Has no effect once the loop is steady.
    pub fn resume(&mut self) {
        if self.state == LoopState::Uninitialized {
            info!(hostname = %self.hostname, "Resuming without publication");
            self.state = LoopState::Steady {
                last_revision: None,
            };
        }
    }

    /// Record a watch event and re-resolve every assignment for this host.
    ///
    /// A revision at or below the watermark is logged as stale; the full
    /// re-read still runs because it does not depend on event order.
    pub async fn on_event(&mut self, event: &WatchEvent) -> Result<Assignments, AgentError> {
        let last_revision = match self.state {
            LoopState::Uninitialized => return Err(AgentError::NotStarted),
            LoopState::Steady { last_revision } => last_revision,
        };

        info!(
            hostname = %self.hostname,
            event_type = %event.event_type,
            revision = event.revision,
            key = %event.key,
            "Received watch event"
        );
        match last_revision {
            Some(seen) if event.revision <= seen => {
                warn!(
                    revision = event.revision,
                    last_revision = seen,
                    "Watch event revision is not newer than the last one seen"
                );
            }
            _ => {
                self.state = LoopState::Steady {
                    last_revision: Some(event.revision),
                };
            }
        }

        self.resolver.resolve(&self.hostname).await
    }

    /// Process events one at a time until the source ends.
    ///
    /// Each refreshed mapping is handed to `sink` before the next event is
    /// pulled. The first error stops the loop and is returned. Returns the
    /// number of events processed.
    pub async fn run<S, F>(&mut self, source: &mut S, mut sink: F) -> Result<u64, AgentError>
    where
        S: EventSource + ?Sized,
        F: FnMut(&WatchEvent, &Assignments) + Send,
    {
        let mut processed = 0;
        while let Some(event) = source.next_event().await? {
            let assignments = self.on_event(&event).await?;
            sink(&event, &assignments);
            processed += 1;
        }
        info!(hostname = %self.hostname, processed, "Watch stream ended");
        Ok(processed)
    }
}
