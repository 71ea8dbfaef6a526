//! In-process counter store.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::StoreError;

use super::CounterStore;

/// Counter store backed by a sharded concurrent map.
///
/// The shard lock held by `entry` covers both the initialization of an
/// absent key and the add, so concurrent increments serialize per key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: DashMap<String, u64>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with `key` already holding `value`.
    pub fn with_value(key: impl Into<String>, value: u64) -> Self {
        let store = Self::new();
        store.counters.insert(key.into(), value);
        store
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn atomic_increment(
        &self,
        key: &str,
        increment_by: u64,
        default_if_absent: u64,
    ) -> Result<u64, StoreError> {
        let overflow = || StoreError::Overflow {
            key: key.to_string(),
        };

        match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = entry.get().checked_add(increment_by).ok_or_else(overflow)?;
                *entry.get_mut() = next;
                Ok(next)
            }
            Entry::Vacant(entry) => {
                let next = default_if_absent
                    .checked_add(increment_by)
                    .ok_or_else(overflow)?;
                entry.insert(next);
                Ok(next)
            }
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
