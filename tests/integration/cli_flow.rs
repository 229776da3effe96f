use burstbuffer_agent::config::{AgentConfig, RegistryBackend};
use burstbuffer_agent::registry::{RegistryClient, SledRegistry};
use burstbuffer_agent::tooling::cli::{CliContext, Commands};
use burstbuffer_agent::{AgentError, RegistryError};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tempfile::TempDir;

use super::support::assignment_key;

fn sled_config(path: &Path) -> AgentConfig {
    let mut config = AgentConfig {
        hostname: Some("buffer01".to_string()),
        ..AgentConfig::default()
    };
    config.registry.backend = RegistryBackend::Sled;
    config.registry.path = Some(path.to_path_buf());
    config.hardware.device_count = 2;
    config
}

fn hook_env(revision: u64, device: &str, value: &str) -> HashMap<String, String> {
    [
        ("ETCD_WATCH_EVENT_TYPE", "PUT".to_string()),
        ("ETCD_WATCH_REVISION", revision.to_string()),
        ("ETCD_WATCH_KEY", assignment_key("buffer01", device)),
        ("ETCD_WATCH_VALUE", value.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

async fn seed(path: &Path, entries: &[(String, &str)]) {
    let registry = SledRegistry::open(path).unwrap();
    for (key, value) in entries {
        registry.put(key, value).await.unwrap();
    }
}

#[tokio::test]
async fn startup_command_publishes_and_prints_json() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry");
    seed(&path, &[(assignment_key("buffer01", "nvme1n1"), "tenantA")]).await;

    let context = CliContext::from_config(sled_config(&path)).unwrap();
    let output = context
        .execute(
            &Commands::Startup {
                format: "json".to_string(),
            },
            |_| {},
        )
        .await
        .unwrap();
    drop(context);

    let parsed: BTreeMap<String, String> = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.get("nvme1n1").map(String::as_str), Some("tenantA"));

    let registry = SledRegistry::open(&path).unwrap();
    let slices = registry
        .get_all_with_prefix("bufferhosts/all_slices/buffer01/")
        .await
        .unwrap();
    assert_eq!(slices.len(), 2);
}

#[tokio::test]
async fn event_command_decodes_hook_environment() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry");
    seed(&path, &[(assignment_key("buffer01", "nvme0n1"), "tenantB")]).await;

    let context = CliContext::from_config(sled_config(&path))
        .unwrap()
        .with_event_env(hook_env(7, "nvme0n1", "tenantB"));
    let output = context
        .execute(
            &Commands::Event {
                format: "text".to_string(),
            },
            |_| {},
        )
        .await
        .unwrap();
    assert!(output.contains("nvme0n1"));
    assert!(output.contains("tenantB"));
}

#[tokio::test]
async fn event_command_does_not_publish_inventory() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry");
    seed(&path, &[(assignment_key("buffer01", "nvme1n1"), "tenantA")]).await;

    let context = CliContext::from_config(sled_config(&path))
        .unwrap()
        .with_event_env(hook_env(9, "nvme1n1", "tenantA"));
    let output = context
        .execute(
            &Commands::Event {
                format: "json".to_string(),
            },
            |_| {},
        )
        .await
        .unwrap();
    drop(context);

    let parsed: BTreeMap<String, String> = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.get("nvme1n1").map(String::as_str), Some("tenantA"));

    let registry = SledRegistry::open(&path).unwrap();
    let slices = registry
        .get_all_with_prefix("bufferhosts/all_slices/buffer01/")
        .await
        .unwrap();
    assert!(slices.is_empty());
}

#[tokio::test]
async fn resolve_command_rejects_non_utf8_assignment() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry");
    {
        let db = sled::open(&path).unwrap();
        db.insert(assignment_key("buffer01", "nvme0n1"), &[0xff, 0xfe, b'A'][..])
            .unwrap();
        db.flush().unwrap();
    }

    let context = CliContext::from_config(sled_config(&path)).unwrap();
    let result = context
        .execute(
            &Commands::Resolve {
                format: "text".to_string(),
            },
            |_| {},
        )
        .await;
    assert!(matches!(
        result,
        Err(AgentError::Registry(RegistryError::Read { .. }))
    ));
}

#[tokio::test]
async fn event_command_without_event_fails() {
    let temp = TempDir::new().unwrap();
    let context = CliContext::from_config(sled_config(&temp.path().join("registry")))
        .unwrap()
        .with_event_env(HashMap::new());
    let result = context
        .execute(
            &Commands::Event {
                format: "text".to_string(),
            },
            |_| {},
        )
        .await;
    assert!(matches!(result, Err(AgentError::EventDecode(_))));
}

#[tokio::test]
async fn resolve_command_reports_unknown_device() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry");
    seed(&path, &[(assignment_key("buffer01", "nvme9n1"), "tenantC")]).await;

    let context = CliContext::from_config(sled_config(&path)).unwrap();
    let result = context
        .execute(
            &Commands::Resolve {
                format: "text".to_string(),
            },
            |_| {},
        )
        .await;
    match result {
        Err(AgentError::UnknownDeviceAssignment { hostname, device }) => {
            assert_eq!(hostname, "buffer01");
            assert_eq!(device, "nvme9n1");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn invalid_configured_hostname_is_rejected() {
    let config = AgentConfig {
        hostname: Some("rack1/buffer01".to_string()),
        ..AgentConfig::default()
    };
    assert!(matches!(
        CliContext::from_config(config),
        Err(AgentError::InvalidKeySegment { .. })
    ));
}
