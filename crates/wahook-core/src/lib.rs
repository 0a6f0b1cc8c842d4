//! Wahook Core - QR-scan escalation for WhatsApp gateway sessions
//!
//! This crate holds everything the webhook server needs that is not HTTP:
//! - Events: the gateway's webhook payloads and their classification
//! - Store: counter storage with per-key expiry (Redis or in-memory)
//! - Queue: the session deletion job queue (Redis list or in-memory)
//! - Tracker: the per-session QR-scan counter and its escalation rule

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod queue;
pub mod store;
pub mod tracker;

pub use error::{Error, Result};
pub use events::{EventKind, SessionStatus, WebhookEvent};
pub use queue::{
    DeletionJob, DeletionQueue, MemoryDeletionQueue, RedisDeletionQueue, DEFAULT_QUEUE_NAME,
};
pub use store::{CounterStore, MemoryCounterStore, RedisCounterStore};
pub use tracker::{
    QrScanTracker, ScanOutcome, TrackerAction, TrackerConfig, DEFAULT_KEY_PREFIX,
    MAX_CONSECUTIVE_QR_SCANS, MAX_QR_SCAN_TTL_SECS, QR_SCAN_TTL_SECS,
};
