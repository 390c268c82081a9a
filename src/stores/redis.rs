//! Redis-backed counter store.
//!
//! One sorted set per identifier, scored by request time in unix
//! milliseconds. Prune-and-count runs ZREMRANGEBYSCORE + ZCARD in one
//! atomic pipeline, the insert runs ZADD + EXPIRE in another, matching
//! the admission gate's two-step contract. The read-only path is a
//! single ZCOUNT.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::core::admission::{CounterStore, StoreError};

pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("redis connection failed")?;
        Ok(Self { conn })
    }
}

fn store_err(err: redis::RedisError) -> StoreError {
    StoreError(err.to_string())
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn prune_and_count(&self, key: &str, window_start: i64) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .zrembyscore(key, 0, window_start)
            .ignore()
            .zcard(key)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(count)
    }

    async fn record(
        &self,
        key: &str,
        now: i64,
        member: String,
        expiry: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .zadd(key, member, now)
            .ignore()
            .expire(key, expiry.as_secs().max(1) as i64)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(store_err)
    }

    async fn count_since(&self, key: &str, window_start: i64) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        conn.zcount(key, window_start.to_string(), "+inf")
            .await
            .map_err(store_err)
    }
}
