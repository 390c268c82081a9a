use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scand::core::admission::{AdmissionGate, CounterStore, StoreError};
use scand::stores::MemoryCounterStore;

fn gate() -> AdmissionGate {
    AdmissionGate::new(Arc::new(MemoryCounterStore::new()), "ratelimit")
}

#[tokio::test]
async fn the_limit_is_honored_inside_one_window() {
    let gate = gate();
    let window = Duration::from_secs(60);

    for call in 0..2 {
        let decision = gate.allow("user:42", 2, window).await;
        assert!(decision.allowed, "call {call} should be admitted");
        assert!(!decision.degraded);
    }

    let decision = gate.allow("user:42", 2, window).await;
    assert!(!decision.allowed, "third call inside the window must be denied");
}

#[tokio::test]
async fn denied_attempts_are_not_counted() {
    let gate = gate();
    let window = Duration::from_secs(60);

    assert!(gate.allow("user:42", 1, window).await.allowed);
    for _ in 0..5 {
        assert!(!gate.allow("user:42", 1, window).await.allowed);
    }

    // five denials later the quota still shows one used, not six
    let status = gate.status("user:42", 10, window).await.unwrap();
    assert_eq!(status.remaining, 9);
}

#[tokio::test]
async fn the_window_resets_once_it_elapses() {
    let gate = gate();
    let window = Duration::from_millis(200);

    assert!(gate.allow("user:42", 1, window).await.allowed);
    assert!(!gate.allow("user:42", 1, window).await.allowed);

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(gate.allow("user:42", 1, window).await.allowed);
}

#[tokio::test]
async fn identifiers_do_not_share_quota() {
    let gate = gate();
    let window = Duration::from_secs(60);

    assert!(gate.allow("user:42", 1, window).await.allowed);
    assert!(gate.allow("ip:203.0.113.9", 1, window).await.allowed);
    assert!(!gate.allow("user:42", 1, window).await.allowed);
}

#[tokio::test]
async fn quota_status_reports_remaining_and_reset() {
    let gate = gate();
    let window = Duration::from_secs(60);
    let before = Utc::now();

    gate.allow("user:42", 5, window).await;
    gate.allow("user:42", 5, window).await;

    let status = gate.status("user:42", 5, window).await.unwrap();
    assert_eq!(status.remaining, 3);
    assert!(status.reset_at >= before + chrono::Duration::seconds(59));
}

#[tokio::test]
async fn exhausted_quota_reports_zero_remaining() {
    let gate = gate();
    let window = Duration::from_secs(60);

    for _ in 0..3 {
        gate.allow("user:42", 2, window).await;
    }

    let status = gate.status("user:42", 2, window).await.unwrap();
    assert_eq!(status.remaining, 0);
}

struct UnreachableStore;

#[async_trait]
impl CounterStore for UnreachableStore {
    async fn prune_and_count(&self, _key: &str, _window_start: i64) -> Result<u64, StoreError> {
        Err(StoreError("connection refused".to_string()))
    }

    async fn record(
        &self,
        _key: &str,
        _now: i64,
        _member: String,
        _expiry: Duration,
    ) -> Result<(), StoreError> {
        Err(StoreError("connection refused".to_string()))
    }

    async fn count_since(&self, _key: &str, _window_start: i64) -> Result<u64, StoreError> {
        Err(StoreError("connection refused".to_string()))
    }
}

#[tokio::test]
async fn an_unreachable_store_fails_open() {
    let gate = AdmissionGate::new(Arc::new(UnreachableStore), "ratelimit");

    for _ in 0..10 {
        let decision = gate.allow("user:42", 1, Duration::from_secs(60)).await;
        assert!(decision.allowed, "the gate must never deny on store failure");
        assert!(decision.degraded);
    }
}
