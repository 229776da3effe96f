//! Caller-injected policies for the registry RPC boundary.
//!
//! Both decorators implement [`RegistryClient`] themselves, so the publisher and
//! resolver never know whether they talk to a bare backend or a wrapped one.

use crate::error::RegistryError;
use crate::registry::RegistryClient;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounds every call with a deadline; expiry becomes `RegistryError::Timeout`.
pub struct WithTimeout<R> {
    inner: R,
    timeout: Duration,
}

impl<R> WithTimeout<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, operation: String, call: F) -> Result<T, RegistryError>
    where
        F: Future<Output = Result<T, RegistryError>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Timeout {
                operation,
                timeout: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl<R: RegistryClient> RegistryClient for WithTimeout<R> {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        self.bounded(format!("put {}", key), self.inner.put(key, value))
            .await
    }

    async fn get_all_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        self.bounded(
            format!("get_all_with_prefix {}", prefix),
            self.inner.get_all_with_prefix(prefix),
        )
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        self.bounded(format!("delete {}", key), self.inner.delete(key))
            .await
    }
}

/// Retry configuration. `max_attempts == 1` is the fail-fast default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Re-issues failed calls up to `max_attempts` times with a fixed backoff.
pub struct Retrying<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R: RegistryClient> Retrying<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn attempt<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RegistryError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, RegistryError>> + Send,
        T: Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        "Registry call failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl<R: RegistryClient> RegistryClient for Retrying<R> {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        self.attempt("put", || self.inner.put(key, value)).await
    }

    async fn get_all_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        self.attempt("get_all_with_prefix", || {
            self.inner.get_all_with_prefix(prefix)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        self.attempt("delete", || self.inner.delete(key)).await
    }
}
