//! The increment-and-get operation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, instrument};

use crate::config::Config;
use crate::error::StoreError;
use crate::metrics;
use crate::store::CounterStore;

/// Every increment adds exactly one visit.
const INCREMENT_BY: u64 = 1;
/// An absent counter starts from zero.
const DEFAULT_IF_ABSENT: u64 = 0;

/// Increments the configured counter through a shared store handle.
///
/// Built once at startup and cloned into every request; cloning shares the
/// underlying store connection.
#[derive(Clone)]
pub struct CounterService {
    store: Arc<dyn CounterStore>,
    key: Arc<str>,
    timeout: Duration,
}

impl std::fmt::Debug for CounterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterService")
            .field("backend", &self.store.backend())
            .field("key", &self.key)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CounterService {
    /// Create a service incrementing `key` in `store`.
    pub fn new(store: Arc<dyn CounterStore>, key: impl Into<Arc<str>>, timeout: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            timeout,
        }
    }

    /// Create a service from configuration around an opened store.
    pub fn from_config(store: Arc<dyn CounterStore>, config: &Config) -> Self {
        Self::new(store, config.counter_name.as_str(), config.store_timeout())
    }

    /// Counter key this service increments.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Backend name of the underlying store.
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Add one to the counter and return the new value.
    ///
    /// Issues exactly one store call; there is no retry. The returned value
    /// comes from the store's own result, never from a second read. A
    /// timeout is reported only when the counter was left untouched.
    #[instrument(skip(self), fields(key = %self.key, backend = self.store.backend()))]
    pub async fn increment_and_get(&self) -> Result<u64, StoreError> {
        let start = Instant::now();
        let backend = self.store.backend();

        let result = self
            .store
            .atomic_increment_within(&self.key, INCREMENT_BY, DEFAULT_IF_ABSENT, self.timeout)
            .await;

        match &result {
            Ok(count) => {
                metrics::record_store_latency(start, backend, "ok");
                metrics::inc_increments();
                debug!(count, "Counter incremented");
            }
            Err(err) => {
                metrics::record_store_latency(start, backend, "error");
                metrics::inc_store_errors(error_kind(err));
                error!(error = %err, "Counter increment failed");
            }
        }

        result
    }
}

fn error_kind(err: &StoreError) -> &'static str {
    match err {
        StoreError::Unavailable(_) => "unavailable",
        StoreError::Timeout { .. } => "timeout",
        StoreError::Overflow { .. } => "overflow",
        StoreError::Corrupt { .. } => "corrupt",
        StoreError::Backend(_) => "backend",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockConfig;
    use crate::store::MockCounterStore;

    fn service(store: &MockCounterStore) -> CounterService {
        CounterService::new(Arc::new(store.clone()), "site_visits", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn absent_counter_yields_one() {
        let store = MockCounterStore::new();
        assert_eq!(service(&store).increment_and_get().await.unwrap(), 1);
        assert_eq!(store.value("site_visits"), Some(1));
    }

    #[tokio::test]
    async fn forty_one_becomes_forty_two() {
        let store = MockCounterStore::new();
        store.set_value("site_visits", 41);
        assert_eq!(service(&store).increment_and_get().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn failure_is_not_retried() {
        let store = MockCounterStore::new();
        store.set_failure(Some("access denied"));

        let err = service(&store).increment_and_get().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.calls(), 1);
        assert_eq!(store.value("site_visits"), None);
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let store = MockCounterStore::with_config(MockConfig {
            fail_with: None,
            latency_ms: 200,
        });
        let service = CounterService::new(
            Arc::new(store.clone()),
            "site_visits",
            Duration::from_millis(20),
        );

        let err = service.increment_and_get().await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { timeout_ms: 20 }));
        assert_eq!(store.calls(), 1);
        assert_eq!(store.value("site_visits"), None);
    }
}
