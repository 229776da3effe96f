use burstbuffer_agent::config::ReconcileConfig;
use burstbuffer_agent::registry::{MemoryRegistry, RegistryClient, WithTimeout};
use burstbuffer_agent::watch::{ChannelEventSource, EnvEventSource, EventSource};
use burstbuffer_agent::{AgentError, Assignments, LoopState, RegistryError, WatchEvent};
use burstbuffer_agent::hardware::FixedInventory;
use burstbuffer_agent::ReconciliationLoop;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use super::support::{assignment_key, devices, reconciler};

#[tokio::test]
async fn registry_watch_drives_full_re_resolution() {
    let registry = Arc::new(MemoryRegistry::new());
    let mut reconciler = reconciler(
        "h1",
        registry.clone(),
        &["nvme0n1", "nvme1n1"],
        ReconcileConfig::default(),
    );
    reconciler.startup().await.unwrap();
    let mut source = registry.watch_prefix("bufferhosts/assigned_slices/h1/");

    registry
        .put(&assignment_key("h1", "nvme1n1"), "tenantB")
        .await
        .unwrap();
    let event = source.next_event().await.unwrap().unwrap();
    let assignments = reconciler.on_event(&event).await.unwrap();
    assert_eq!(assignments.get("nvme1n1").map(String::as_str), Some("tenantB"));

    registry.delete(&assignment_key("h1", "nvme1n1")).await.unwrap();
    let event = source.next_event().await.unwrap().unwrap();
    assert_eq!(event.event_type, WatchEvent::DELETE);
    let assignments = reconciler.on_event(&event).await.unwrap();
    assert!(assignments.is_empty());

    assert_eq!(
        reconciler.state(),
        LoopState::Steady {
            last_revision: Some(event.revision)
        }
    );
}

#[tokio::test]
async fn run_processes_events_in_order_until_stream_ends() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .put(&assignment_key("h1", "nvme0n1"), "tenantA")
        .await
        .unwrap();
    let mut reconciler = reconciler("h1", registry, &["nvme0n1"], ReconcileConfig::default());
    reconciler.startup().await.unwrap();

    let (tx, mut source) = ChannelEventSource::channel();
    for revision in [10, 11, 12] {
        tx.send(Ok(WatchEvent {
            event_type: WatchEvent::PUT.to_string(),
            revision,
            key: assignment_key("h1", "nvme0n1"),
            value: "tenantA".to_string(),
        }))
        .unwrap();
    }
    drop(tx);

    let mut seen = Vec::new();
    let processed = reconciler
        .run(&mut source, |event: &WatchEvent, assignments: &Assignments| {
            assert_eq!(assignments.len(), 1);
            seen.push(event.revision);
        })
        .await
        .unwrap();

    assert_eq!(processed, 3);
    assert_eq!(seen, vec![10, 11, 12]);
}

#[tokio::test]
async fn run_stops_on_divergence() {
    let registry = Arc::new(MemoryRegistry::new());
    let mut reconciler = reconciler(
        "h1",
        registry.clone(),
        &["nvme0n1"],
        ReconcileConfig::default(),
    );
    reconciler.startup().await.unwrap();

    registry
        .put(&assignment_key("h1", "nvme4n1"), "tenantX")
        .await
        .unwrap();

    let (tx, mut source) = ChannelEventSource::channel();
    tx.send(Ok(WatchEvent {
        event_type: WatchEvent::PUT.to_string(),
        revision: 2,
        key: assignment_key("h1", "nvme4n1"),
        value: "tenantX".to_string(),
    }))
    .unwrap();

    let mut calls = 0;
    let result = reconciler
        .run(&mut source, |_: &WatchEvent, _: &Assignments| calls += 1)
        .await;

    assert!(matches!(
        result,
        Err(AgentError::UnknownDeviceAssignment { ref device, .. }) if device == "nvme4n1"
    ));
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn environment_transport_feeds_on_event() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .put(&assignment_key("h1", "nvme0n1"), "tenantA")
        .await
        .unwrap();
    let mut reconciler = reconciler(
        "h1",
        registry,
        &["nvme0n1", "nvme1n1"],
        ReconcileConfig::default(),
    );
    reconciler.startup().await.unwrap();

    let vars: HashMap<String, String> = [
        ("ETCD_WATCH_EVENT_TYPE", "PUT"),
        ("ETCD_WATCH_REVISION", "42"),
        ("ETCD_WATCH_KEY", "bufferhosts/assigned_slices/h1/nvme0n1"),
        ("ETCD_WATCH_VALUE", "tenantA"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let mut source = EnvEventSource::new(vars);

    let processed = reconciler
        .run(&mut source, |event: &WatchEvent, assignments: &Assignments| {
            assert_eq!(event.revision, 42);
            assert_eq!(assignments.get("nvme0n1").map(String::as_str), Some("tenantA"));
        })
        .await
        .unwrap();
    assert_eq!(processed, 1);
}

/// Answers writes immediately but never answers reads.
struct StalledReads {
    inner: MemoryRegistry,
}

#[async_trait::async_trait]
impl RegistryClient for StalledReads {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        self.inner.put(key, value).await
    }

    async fn get_all_with_prefix(
        &self,
        _prefix: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        std::future::pending().await
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        self.inner.delete(key).await
    }
}

#[tokio::test]
async fn registry_timeout_is_surfaced_to_the_caller() {
    let registry = WithTimeout::new(
        StalledReads {
            inner: MemoryRegistry::new(),
        },
        Duration::from_millis(20),
    );
    let mut reconciler = ReconciliationLoop::new(
        "h1",
        Arc::new(FixedInventory::new(devices(&["nvme0n1"]))),
        Arc::new(registry),
        ReconcileConfig::default(),
    )
    .unwrap();

    match reconciler.startup().await {
        Err(AgentError::Registry(err)) => assert!(err.is_timeout()),
        other => panic!("unexpected result: {:?}", other),
    }
}
