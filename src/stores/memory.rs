//! In-process counter store.
//!
//! A per-key log of request timestamps behind one mutex. Both halves of
//! an admission check take the same lock, so a single instance gets
//! exact enforcement. Entries never outlive the window: every mutating
//! call prunes before it reads.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::admission::{CounterStore, StoreError};

#[derive(Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, Vec<i64>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<i64>>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError("counter mutex poisoned".to_string()))
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn prune_and_count(&self, key: &str, window_start: i64) -> Result<u64, StoreError> {
        let mut entries = self.lock()?;
        match entries.get_mut(key) {
            Some(stamps) => {
                stamps.retain(|&at| at >= window_start);
                let count = stamps.len() as u64;
                if stamps.is_empty() {
                    entries.remove(key);
                }
                Ok(count)
            }
            None => Ok(0),
        }
    }

    async fn record(
        &self,
        key: &str,
        now: i64,
        _member: String,
        _expiry: Duration,
    ) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.entry(key.to_string()).or_default().push(now);
        Ok(())
    }

    async fn count_since(&self, key: &str, window_start: i64) -> Result<u64, StoreError> {
        let entries = self.lock()?;
        Ok(entries
            .get(key)
            .map(|stamps| stamps.iter().filter(|&&at| at >= window_start).count() as u64)
            .unwrap_or(0))
    }
}
