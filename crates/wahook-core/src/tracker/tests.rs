use super::*;
use crate::events::SessionStatus;
use crate::queue::{MemoryDeletionQueue, MockDeletionQueue};
use crate::store::{MemoryCounterStore, MockCounterStore};
use std::time::Duration;

struct Harness {
    store: Arc<MemoryCounterStore>,
    queue: Arc<MemoryDeletionQueue>,
    tracker: QrScanTracker,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryCounterStore::new());
    let queue = Arc::new(MemoryDeletionQueue::new());
    let tracker = QrScanTracker::new(store.clone(), queue.clone());
    Harness {
        store,
        queue,
        tracker,
    }
}

fn store_down() -> Error {
    Error::Store("Redis connection failed: connection refused".to_string())
}

#[test]
fn test_default_config() {
    let config = TrackerConfig::default();
    assert_eq!(config.threshold, 5);
    assert_eq!(config.ttl_secs, 600);
    assert_eq!(config.key_prefix, "qr-scan-count:");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation() {
    let config = TrackerConfig {
        threshold: 0,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(Error::Configuration(_))));

    let config = TrackerConfig {
        ttl_secs: 0,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_config_rejects_oversized_ttl() {
    let config = TrackerConfig {
        ttl_secs: u64::MAX,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(Error::Configuration(_))));

    let config = TrackerConfig {
        ttl_secs: MAX_QR_SCAN_TTL_SECS,
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_out_of_range_ttl_does_not_panic() {
    // Built without validate(), as a caller constructing the tracker directly could
    let store = Arc::new(MemoryCounterStore::new());
    let tracker = QrScanTracker::with_config(
        store.clone(),
        Arc::new(MemoryDeletionQueue::new()),
        TrackerConfig {
            ttl_secs: u64::MAX,
            ..Default::default()
        },
    );

    let outcome = tracker.record_scan("inst", "s").await;
    assert_eq!(
        outcome,
        ScanOutcome {
            scan_count: 1,
            delete_triggered: false
        }
    );
    assert_eq!(tracker.current_count("inst", "s").await.unwrap(), 1);
}

#[tokio::test]
async fn test_abandoned_counters_are_reclaimed() {
    let store = Arc::new(MemoryCounterStore::new());
    let tracker = QrScanTracker::with_config(
        store.clone(),
        Arc::new(MemoryDeletionQueue::new()),
        TrackerConfig {
            ttl_secs: 1,
            ..Default::default()
        },
    );

    for i in 0..50 {
        tracker.record_scan("inst", &format!("session-{}", i)).await;
    }
    assert_eq!(store.len().await, 50);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    for i in 0..3 {
        tracker.record_scan("inst", &format!("fresh-{}", i)).await;
    }
    assert_eq!(store.raw_len().await, 3);
    assert_eq!(store.len().await, 3);
}

#[test]
fn test_config_partial_deserialize() {
    let config: TrackerConfig = serde_json::from_str(r#"{"threshold": 3}"#).unwrap();
    assert_eq!(config.threshold, 3);
    assert_eq!(config.ttl_secs, QR_SCAN_TTL_SECS);
    assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
}

#[test]
fn test_counter_key_format() {
    let h = harness();
    assert_eq!(
        h.tracker.counter_key("inst-1", "default"),
        "qr-scan-count:inst-1:default"
    );
}

#[tokio::test]
async fn test_counts_below_threshold() {
    let h = harness();

    for expected in 1..=4 {
        let outcome = h.tracker.record_scan("inst-1", "default").await;
        assert_eq!(outcome.scan_count, expected);
        assert!(!outcome.delete_triggered);
    }

    assert_eq!(h.tracker.current_count("inst-1", "default").await.unwrap(), 4);
    assert_eq!(h.queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn test_threshold_escalates_and_restarts() {
    let h = harness();

    for _ in 0..4 {
        h.tracker.record_scan("inst-1", "default").await;
    }

    let fifth = h.tracker.record_scan("inst-1", "default").await;
    assert_eq!(
        fifth,
        ScanOutcome {
            scan_count: 5,
            delete_triggered: true
        }
    );

    let jobs = h.queue.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].instance_id, "inst-1");

    let key = h.tracker.counter_key("inst-1", "default");
    assert_eq!(h.store.get(&key).await.unwrap(), None);

    let sixth = h.tracker.record_scan("inst-1", "default").await;
    assert_eq!(
        sixth,
        ScanOutcome {
            scan_count: 1,
            delete_triggered: false
        }
    );
    assert_eq!(h.queue.pending().await.unwrap(), 1);
}

#[tokio::test]
async fn test_reset_clears_prior_count() {
    let h = harness();

    assert_eq!(h.tracker.record_scan("inst-1", "s").await.scan_count, 1);
    assert_eq!(h.tracker.record_scan("inst-1", "s").await.scan_count, 2);

    h.tracker.reset_scan("inst-1", "s").await;
    assert_eq!(h.tracker.current_count("inst-1", "s").await.unwrap(), 0);

    assert_eq!(h.tracker.record_scan("inst-1", "s").await.scan_count, 1);
}

#[tokio::test]
async fn test_reset_on_absent_counter() {
    let h = harness();
    h.tracker.reset_scan("inst-1", "never-seen").await;
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_ttl_refreshed_on_each_scan() {
    let h = harness();
    h.tracker.record_scan("inst-1", "s").await;

    let key = h.tracker.counter_key("inst-1", "s");
    let ttl = h.store.ttl(&key).await.unwrap();
    assert!(ttl <= Duration::from_secs(QR_SCAN_TTL_SECS));
    assert!(ttl > Duration::from_secs(QR_SCAN_TTL_SECS - 5));
}

#[tokio::test]
async fn test_expired_counter_restarts_at_one() {
    let h = harness();
    h.tracker.record_scan("inst-1", "s").await;
    h.tracker.record_scan("inst-1", "s").await;

    // Simulate the TTL running out
    let key = h.tracker.counter_key("inst-1", "s");
    h.store.expire(&key, 0).await.unwrap();

    assert_eq!(h.tracker.record_scan("inst-1", "s").await.scan_count, 1);
}

#[tokio::test]
async fn test_sessions_do_not_interfere() {
    let h = harness();

    for _ in 0..4 {
        h.tracker.record_scan("inst-1", "a").await;
    }
    let other = h.tracker.record_scan("inst-1", "b").await;
    assert_eq!(other.scan_count, 1);

    let other_instance = h.tracker.record_scan("inst-2", "a").await;
    assert_eq!(other_instance.scan_count, 1);

    h.tracker.reset_scan("inst-1", "b").await;
    assert_eq!(h.tracker.current_count("inst-1", "a").await.unwrap(), 4);
}

#[tokio::test]
async fn test_unparseable_value_counts_from_zero() {
    let h = harness();
    let key = h.tracker.counter_key("inst-1", "s");
    h.store.set(&key, "not-a-number").await.unwrap();

    assert_eq!(h.tracker.record_scan("inst-1", "s").await.scan_count, 1);
}

#[tokio::test]
async fn test_custom_threshold() {
    let store = Arc::new(MemoryCounterStore::new());
    let queue = Arc::new(MemoryDeletionQueue::new());
    let tracker = QrScanTracker::with_config(
        store,
        queue.clone(),
        TrackerConfig {
            threshold: 2,
            ..Default::default()
        },
    );

    assert!(!tracker.record_scan("i", "s").await.delete_triggered);
    assert!(tracker.record_scan("i", "s").await.delete_triggered);
    assert_eq!(queue.pending().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unreachable_store_still_returns_outcome() {
    let mut store = MockCounterStore::new();
    store.expect_get().returning(|_| Err(store_down()));
    store.expect_set().returning(|_, _| Err(store_down()));

    let queue = Arc::new(MemoryDeletionQueue::new());
    let tracker = QrScanTracker::new(Arc::new(store), queue.clone());

    let outcome = tracker.record_scan("inst-1", "s").await;
    assert_eq!(
        outcome,
        ScanOutcome {
            scan_count: 1,
            delete_triggered: false
        }
    );
    assert_eq!(queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn test_read_failure_treated_as_zero() {
    let mut store = MockCounterStore::new();
    store.expect_get().times(1).returning(|_| Err(store_down()));
    store.expect_set().times(1).returning(|_, _| Ok(()));
    store.expect_expire().times(1).returning(|_, _| Ok(true));

    let tracker = QrScanTracker::new(Arc::new(store), Arc::new(MemoryDeletionQueue::new()));
    assert_eq!(tracker.record_scan("inst-1", "s").await.scan_count, 1);
}

#[tokio::test]
async fn test_write_failure_skips_expire() {
    let mut store = MockCounterStore::new();
    store
        .expect_get()
        .times(1)
        .returning(|_| Ok(Some("2".to_string())));
    store.expect_set().times(1).returning(|_, _| Err(store_down()));
    store.expect_expire().times(0);

    let tracker = QrScanTracker::new(Arc::new(store), Arc::new(MemoryDeletionQueue::new()));
    let outcome = tracker.record_scan("inst-1", "s").await;
    assert_eq!(outcome.scan_count, 3);
    assert!(!outcome.delete_triggered);
}

#[tokio::test]
async fn test_enqueue_failure_still_clears_counter() {
    let store = Arc::new(MemoryCounterStore::new());
    let mut queue = MockDeletionQueue::new();
    queue
        .expect_enqueue_session_deletion()
        .times(1)
        .returning(|_| Err(Error::Queue("Redis LPUSH failed: timeout".to_string())));

    let tracker = QrScanTracker::new(store.clone(), Arc::new(queue));
    let key = tracker.counter_key("inst-1", "s");
    store.set(&key, "4").await.unwrap();

    let outcome = tracker.record_scan("inst-1", "s").await;
    assert_eq!(outcome.scan_count, 5);
    assert!(outcome.delete_triggered);
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_escalation_survives_total_backend_outage() {
    let mut store = MockCounterStore::new();
    store.expect_get().returning(|_| Err(store_down()));
    store.expect_set().returning(|_, _| Err(store_down()));
    store.expect_del().times(1).returning(|_| Err(store_down()));

    let mut queue = MockDeletionQueue::new();
    queue
        .expect_enqueue_session_deletion()
        .times(1)
        .returning(|_| Err(Error::Queue("Redis connection failed".to_string())));

    let tracker = QrScanTracker::with_config(
        Arc::new(store),
        Arc::new(queue),
        TrackerConfig {
            threshold: 1,
            ..Default::default()
        },
    );

    let outcome = tracker.record_scan("inst-1", "s").await;
    assert_eq!(outcome.scan_count, 1);
    assert!(outcome.delete_triggered);
}

#[tokio::test]
async fn test_reset_failure_is_absorbed() {
    let mut store = MockCounterStore::new();
    store.expect_del().times(1).returning(|_| Err(store_down()));

    let tracker = QrScanTracker::new(Arc::new(store), Arc::new(MemoryDeletionQueue::new()));
    tracker.reset_scan("inst-1", "s").await;
}

#[tokio::test]
async fn test_current_count_surfaces_errors() {
    let mut store = MockCounterStore::new();
    store.expect_get().returning(|_| Err(store_down()));

    let tracker = QrScanTracker::new(Arc::new(store), Arc::new(MemoryDeletionQueue::new()));
    assert!(matches!(
        tracker.current_count("inst-1", "s").await,
        Err(Error::Store(_))
    ));
}

#[tokio::test]
async fn test_handle_event_dispatch() {
    let h = harness();

    let qr = WebhookEvent::session_status("default", SessionStatus::ScanQrCode);
    let action = h.tracker.handle_event("inst-1", &qr).await;
    assert_eq!(
        action,
        TrackerAction::ScanRecorded(ScanOutcome {
            scan_count: 1,
            delete_triggered: false
        })
    );

    let working = WebhookEvent::session_status("default", SessionStatus::Working);
    assert_eq!(
        h.tracker.handle_event("inst-1", &working).await,
        TrackerAction::Reset
    );
    assert_eq!(h.tracker.current_count("inst-1", "default").await.unwrap(), 0);
}

#[tokio::test]
async fn test_handle_event_without_session_is_ignored() {
    let h = harness();
    let qr = WebhookEvent::session_status("", SessionStatus::ScanQrCode);

    assert_eq!(
        h.tracker.handle_event("inst-1", &qr).await,
        TrackerAction::Ignored
    );
    assert!(h.store.is_empty().await);
}

#[test]
fn test_action_serialization() {
    let action = TrackerAction::ScanRecorded(ScanOutcome {
        scan_count: 5,
        delete_triggered: true,
    });
    let json = serde_json::to_value(action).unwrap();
    assert_eq!(json["action"], "scan_recorded");
    assert_eq!(json["scan_count"], 5);
    assert_eq!(json["delete_triggered"], true);

    let json = serde_json::to_value(TrackerAction::Reset).unwrap();
    assert_eq!(json["action"], "reset");
}
