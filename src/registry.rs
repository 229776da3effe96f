//! Registry client port.
//!
//! The agent consumes three operations from the distributed key-value registry:
//! single-key writes, ordered prefix scans, and single-key deletes (used only by
//! stale-slice pruning). Every call is one attempt; retry and timeout behavior is
//! layered on by the decorators in [`policy`].

mod memory;
pub mod policy;
mod sled_backend;

pub use self::memory::MemoryRegistry;
pub use self::policy::{RetryPolicy, Retrying, WithTimeout};
pub use self::sled_backend::SledRegistry;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError>;

    /// All entries whose key starts with `prefix`, in lexicographic key order.
    async fn get_all_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError>;

    /// Remove a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), RegistryError>;
}

#[async_trait]
impl<R: RegistryClient + ?Sized> RegistryClient for Arc<R> {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        (**self).put(key, value).await
    }

    async fn get_all_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        (**self).get_all_with_prefix(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        (**self).delete(key).await
    }
}

#[async_trait]
impl<R: RegistryClient + ?Sized> RegistryClient for Box<R> {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        (**self).put(key, value).await
    }

    async fn get_all_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        (**self).get_all_with_prefix(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        (**self).delete(key).await
    }
}

/// Wrap a backend with the configured timeout and retry policies.
///
/// Retry is the outer layer, so every attempt gets its own timeout budget.
pub fn with_policies<R>(inner: R, config: &RegistryConfig) -> Arc<dyn RegistryClient>
where
    R: RegistryClient + 'static,
{
    let timed = WithTimeout::new(inner, Duration::from_millis(config.timeout_ms));
    let policy = RetryPolicy {
        max_attempts: config.retry.max_attempts,
        backoff: Duration::from_millis(config.retry.backoff_ms),
    };
    Arc::new(Retrying::new(timed, policy))
}
