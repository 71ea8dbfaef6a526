//! Mock counter store for unit testing.
//!
//! Counts calls, can be told to fail or to stall, and never mutates a value
//! on a failed call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

use super::CounterStore;

/// Configuration for mock store behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// When set, every call fails with `StoreError::Unavailable(message)`.
    pub fail_with: Option<String>,
    /// Simulated latency before the call is applied.
    pub latency_ms: u64,
}

/// Mock counter store for testing.
#[derive(Debug, Clone, Default)]
pub struct MockCounterStore {
    config: Arc<Mutex<MockConfig>>,
    values: Arc<Mutex<HashMap<String, u64>>>,
    calls: Arc<AtomicU64>,
}

impl MockCounterStore {
    /// Create a new mock store with no counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            ..Self::default()
        }
    }

    /// Seed `key` with `value`.
    pub fn set_value(&self, key: &str, value: u64) {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
    }

    /// Current value of `key`, if any.
    pub fn value(&self, key: &str) -> Option<u64> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .copied()
    }

    /// Make subsequent calls fail (or succeed again with `None`).
    pub fn set_failure(&self, message: Option<&str>) {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .fail_with = message.map(str::to_string);
    }

    /// Number of `atomic_increment` calls received.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn snapshot_config(&self) -> MockConfig {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CounterStore for MockCounterStore {
    async fn atomic_increment(
        &self,
        key: &str,
        increment_by: u64,
        default_if_absent: u64,
    ) -> Result<u64, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let config = self.snapshot_config();

        if config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.latency_ms)).await;
        }

        if let Some(message) = config.fail_with {
            return Err(StoreError::Unavailable(message));
        }

        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = values.get(key).copied().unwrap_or(default_if_absent);
        let next = current
            .checked_add(increment_by)
            .ok_or_else(|| StoreError::Overflow {
                key: key.to_string(),
            })?;
        values.insert(key.to_string(), next);
        Ok(next)
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}
