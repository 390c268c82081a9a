//! Counter store backends for the admission gate.
//!
//! The gate only needs an atomic windowed counter; which one backs it is
//! a deployment decision. With a Redis URL configured the window is
//! shared across every service instance. Without one the counters are
//! process-local, which is exact for a single instance and good enough
//! for development and tests.

pub mod memory;
pub mod redis;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::RateLimitConfig;
use crate::core::admission::CounterStore;

pub use memory::MemoryCounterStore;
pub use redis::RedisCounterStore;

pub async fn from_config(config: &RateLimitConfig) -> Result<Arc<dyn CounterStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisCounterStore::connect(url)
                .await
                .context("failed to connect to redis counter store")?;
            tracing::info!("admission counters shared via redis");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("admission counters are process-local");
            Ok(Arc::new(MemoryCounterStore::new()))
        }
    }
}
