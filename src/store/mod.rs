//! Counter storage.
//!
//! The endpoint depends on a single primitive: an atomic
//! increment-with-default that returns the post-increment value in the same
//! call. Any backend that can do that without a read-then-write is
//! substitutable:
//!
//! - [`SqliteStore`]: durable, one UPSERT statement per increment
//! - [`MemoryStore`]: process-local sharded map
//! - [`MockCounterStore`]: scripted store for tests

pub mod memory;
pub mod mock;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Config, StoreBackend};
use crate::error::StoreError;

pub use memory::MemoryStore;
pub use mock::MockCounterStore;
pub use sqlite::SqliteStore;

/// A key-value table supporting atomic numeric updates.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Add `increment_by` to the counter at `key` and return the new value.
    ///
    /// An absent key is initialized to `default_if_absent` before the
    /// increment is applied. The whole operation is indivisible with respect
    /// to every other caller on the same key. On error the stored value is
    /// left as it was.
    async fn atomic_increment(
        &self,
        key: &str,
        increment_by: u64,
        default_if_absent: u64,
    ) -> Result<u64, StoreError>;

    /// `atomic_increment` bounded by `timeout`.
    ///
    /// A call that reports `StoreError::Timeout` must not have changed the
    /// counter. The default cancels the future, which is only sound for
    /// stores that apply the update without yielding after their last await.
    /// Stores that hand the update to another thread override this and check
    /// the deadline on that thread.
    async fn atomic_increment_within(
        &self,
        key: &str,
        increment_by: u64,
        default_if_absent: u64,
        timeout: Duration,
    ) -> Result<u64, StoreError> {
        match tokio::time::timeout(
            timeout,
            self.atomic_increment(key, increment_by, default_if_absent),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                timeout_ms: timeout_ms(timeout),
            }),
        }
    }

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Whole milliseconds in `timeout`, saturating.
pub fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Open the store selected by the configuration.
pub fn open_store(config: &Config) -> crate::Result<Arc<dyn CounterStore>> {
    match config.store_backend {
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.database_path)?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
