//! Sliding-window admission control over a shared counter store.
//!
//! The gate answers one question per request: has this identifier already
//! used its quota inside the trailing window? Counting happens in an
//! injected store so every service instance can share one window. When
//! the store is unreachable the gate fails open: availability of the
//! scanning service outranks strict quota enforcement.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("counter store unavailable: {0}")]
pub struct StoreError(pub String);

/// Atomic windowed counter shared by all service instances.
///
/// Implementations must make each method a single atomic operation
/// against the backing store; the gate never does read-modify-write of
/// its own.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Drop entries older than `window_start` and count what remains.
    async fn prune_and_count(&self, key: &str, window_start: i64) -> Result<u64, StoreError>;

    /// Record one admitted request at `now` (unix milliseconds) and
    /// refresh the key's expiry. `member` is unique per call so
    /// same-millisecond requests never collide.
    async fn record(
        &self,
        key: &str,
        now: i64,
        member: String,
        expiry: Duration,
    ) -> Result<(), StoreError>;

    /// Count entries at or after `window_start` without mutating state.
    async fn count_since(&self, key: &str, window_start: i64) -> Result<u64, StoreError>;
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// True when the counter store failed and the request was admitted
    /// without being counted.
    pub degraded: bool,
}

/// Remaining quota for one identifier.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

pub struct AdmissionGate {
    store: Arc<dyn CounterStore>,
    key_prefix: String,
}

impl AdmissionGate {
    pub fn new(store: Arc<dyn CounterStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    fn key(&self, identifier: &str) -> String {
        format!("{}:{}", self.key_prefix, identifier)
    }

    /// Sliding-window check: count requests inside the trailing window,
    /// deny at the limit, record the request when admitted. Denied
    /// attempts are never recorded. The prune-and-count and the insert
    /// are each one atomic store operation; a caller racing between the
    /// two can only make the gate slightly more permissive, never more
    /// restrictive.
    pub async fn allow(&self, identifier: &str, limit: u32, window: Duration) -> AdmissionDecision {
        let key = self.key(identifier);
        let now = Utc::now().timestamp_millis();
        let window_start = now - window.as_millis() as i64;

        let count = match self.store.prune_and_count(&key, window_start).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(
                    identifier,
                    error = %err,
                    "counter store unreachable, admitting without quota check"
                );
                return AdmissionDecision {
                    allowed: true,
                    degraded: true,
                };
            }
        };

        if count >= u64::from(limit) {
            tracing::debug!(identifier, count, limit, "submission denied by admission gate");
            return AdmissionDecision {
                allowed: false,
                degraded: false,
            };
        }

        let member = format!("{now}:{}", Uuid::now_v7());
        if let Err(err) = self.store.record(&key, now, member, window).await {
            tracing::warn!(identifier, error = %err, "failed to record admitted request");
            return AdmissionDecision {
                allowed: true,
                degraded: true,
            };
        }

        AdmissionDecision {
            allowed: true,
            degraded: false,
        }
    }

    /// Read-only view of the identifier's remaining quota and the time
    /// the window fully resets.
    pub async fn status(
        &self,
        identifier: &str,
        limit: u32,
        window: Duration,
    ) -> Result<QuotaStatus, StoreError> {
        let key = self.key(identifier);
        let now = Utc::now();
        let window_start = now.timestamp_millis() - window.as_millis() as i64;

        let count = self.store.count_since(&key, window_start).await?;
        let remaining = u64::from(limit).saturating_sub(count) as u32;

        Ok(QuotaStatus {
            remaining,
            reset_at: now
                + chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::zero()),
        })
    }
}
