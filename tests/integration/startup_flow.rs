use burstbuffer_agent::config::{HardwareConfig, ReconcileConfig};
use burstbuffer_agent::hardware::{FixedInventory, HardwareInventory};
use burstbuffer_agent::registry::{MemoryRegistry, RegistryClient};
use burstbuffer_agent::{AgentError, LoopState, ReconciliationLoop};
use std::sync::Arc;

use super::support::{assignment_key, reconciler, slice_key};

#[tokio::test]
async fn startup_publishes_twelve_default_slices() {
    let registry = Arc::new(MemoryRegistry::new());
    let hardware = Arc::new(FixedInventory::from_config(&HardwareConfig::default()));
    let mut reconciler =
        ReconciliationLoop::new("h1", hardware, registry.clone(), ReconcileConfig::default())
            .unwrap();

    let assignments = reconciler.startup().await.unwrap();
    assert!(assignments.is_empty());

    let slices = registry
        .get_all_with_prefix("bufferhosts/all_slices/h1/")
        .await
        .unwrap();
    assert_eq!(slices.len(), 12);
    for i in 0..12 {
        let key = slice_key("h1", &format!("nvme{}n1", i));
        assert_eq!(slices.get(&key).map(String::as_str), Some("1649267441664"));
    }
}

#[tokio::test]
async fn startup_returns_validated_assignments() {
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

    let assignments = reconciler.startup().await.unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments.get("nvme0n1").map(String::as_str), Some("tenantA"));
}

#[tokio::test]
async fn startup_fails_on_assignment_to_missing_device() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .put(&assignment_key("h1", "nvme0n1"), "tenantA")
        .await
        .unwrap();
    registry
        .put(&assignment_key("h1", "nvme9n1"), "tenantB")
        .await
        .unwrap();
    let mut reconciler = reconciler(
        "h1",
        registry,
        &["nvme0n1", "nvme1n1"],
        ReconcileConfig::default(),
    );

    match reconciler.startup().await {
        Err(AgentError::UnknownDeviceAssignment { device, .. }) => assert_eq!(device, "nvme9n1"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(reconciler.state(), LoopState::Uninitialized);
}

#[tokio::test]
async fn repeated_startup_leaves_identical_slice_namespace() {
    let registry = Arc::new(MemoryRegistry::new());
    let mut reconciler = reconciler(
        "h1",
        registry.clone(),
        &["nvme0n1", "nvme1n1", "nvme2n1"],
        ReconcileConfig::default(),
    );

    reconciler.startup().await.unwrap();
    let first = registry.snapshot();
    reconciler.startup().await.unwrap();
    assert_eq!(registry.snapshot(), first);
}

#[tokio::test]
async fn stale_slices_are_kept_unless_pruning_is_enabled() {
    let registry = Arc::new(MemoryRegistry::new());
    reconciler(
        "h1",
        registry.clone(),
        &["nvme0n1", "nvme1n1"],
        ReconcileConfig::default(),
    )
    .startup()
    .await
    .unwrap();

    // nvme1n1 disappears; default startup leaves its record behind
    reconciler("h1", registry.clone(), &["nvme0n1"], ReconcileConfig::default())
        .startup()
        .await
        .unwrap();
    assert!(registry.snapshot().contains_key(&slice_key("h1", "nvme1n1")));

    let pruning = ReconcileConfig {
        prune_stale_slices: true,
    };
    reconciler("h1", registry.clone(), &["nvme0n1"], pruning)
        .startup()
        .await
        .unwrap();
    let snapshot = registry.snapshot();
    assert!(!snapshot.contains_key(&slice_key("h1", "nvme1n1")));
    assert!(snapshot.contains_key(&slice_key("h1", "nvme0n1")));
}

#[tokio::test]
async fn hosts_with_similar_names_do_not_see_each_other() {
    let registry = Arc::new(MemoryRegistry::new());
    registry
        .put(&assignment_key("host1", "nvme0n1"), "tenantA")
        .await
        .unwrap();
    registry
        .put(&assignment_key("host10", "nvme5n1"), "tenantB")
        .await
        .unwrap();

    let mut host1 = reconciler("host1", registry.clone(), &["nvme0n1"], ReconcileConfig::default());
    let mut host10 =
        reconciler("host10", registry.clone(), &["nvme5n1"], ReconcileConfig::default());

    let assigned1 = host1.startup().await.unwrap();
    let assigned10 = host10.startup().await.unwrap();
    assert_eq!(assigned1.keys().collect::<Vec<_>>(), vec!["nvme0n1"]);
    assert_eq!(assigned10.keys().collect::<Vec<_>>(), vec!["nvme5n1"]);

    let host1_slices = registry
        .get_all_with_prefix("bufferhosts/all_slices/host1/")
        .await
        .unwrap();
    assert_eq!(host1_slices.len(), 1);
}

struct BrokenProbe;

impl HardwareInventory for BrokenProbe {
    fn list_devices(&self) -> Result<Vec<burstbuffer_agent::Device>, AgentError> {
        Err(AgentError::HardwareProbe("nvme driver not loaded".to_string()))
    }
}

#[tokio::test]
async fn probe_failure_aborts_before_any_write() {
    let registry = Arc::new(MemoryRegistry::new());
    let mut reconciler = ReconciliationLoop::new(
        "h1",
        Arc::new(BrokenProbe),
        registry.clone(),
        ReconcileConfig::default(),
    )
    .unwrap();

    assert!(matches!(
        reconciler.startup().await,
        Err(AgentError::HardwareProbe(_))
    ));
    assert_eq!(registry.revision(), 0);
}
