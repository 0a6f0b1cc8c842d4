//! QR-Scan Tracker
//!
//! Detects gateway sessions stuck showing pairing QR codes that never get
//! scanned, and asks for their deletion.
//!
//! Each (instance, session) pair has a counter in the [`CounterStore`]:
//! - every QR event increments it and refreshes its TTL
//! - any other event deletes it
//! - reaching the threshold enqueues a deletion job and deletes it
//! - a counter left alone for the TTL expires on its own
//!
//! The public operations never fail. Store and queue errors are logged and
//! the operation carries on with a default (a failed read counts as zero, a
//! failed enqueue still clears the counter).
//!
//! The read-increment-write is not atomic: two concurrent deliveries for the
//! same session may both read the same value. The threshold absorbs that.

use crate::error::{Error, Result};
use crate::events::{EventKind, WebhookEvent};
use crate::queue::DeletionQueue;
use crate::store::CounterStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Consecutive QR events that mark a session as stuck
pub const MAX_CONSECUTIVE_QR_SCANS: u32 = 5;

/// Counter TTL in seconds (10 minutes)
pub const QR_SCAN_TTL_SECS: u64 = 10 * 60;

/// Largest accepted counter TTL in seconds (30 days)
pub const MAX_QR_SCAN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Counter key prefix
pub const DEFAULT_KEY_PREFIX: &str = "qr-scan-count:";

/// Tracker configuration (`[tracker]` in TOML)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Consecutive QR events before escalation
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    /// Counter TTL, refreshed on every QR event
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Prefix for counter keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_threshold() -> u32 {
    MAX_CONSECUTIVE_QR_SCANS
}

fn default_ttl_secs() -> u64 {
    QR_SCAN_TTL_SECS
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            ttl_secs: default_ttl_secs(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl TrackerConfig {
    /// Check the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for a zero threshold, or a TTL that is
    /// zero or above [`MAX_QR_SCAN_TTL_SECS`]
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::Configuration(
                "tracker.threshold must be at least 1".to_string(),
            ));
        }
        if self.ttl_secs == 0 {
            return Err(Error::Configuration(
                "tracker.ttl_secs must be at least 1".to_string(),
            ));
        }
        if self.ttl_secs > MAX_QR_SCAN_TTL_SECS {
            return Err(Error::Configuration(format!(
                "tracker.ttl_secs must be at most {}",
                MAX_QR_SCAN_TTL_SECS
            )));
        }
        Ok(())
    }
}

/// Result of recording one QR event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    /// Counter value after this event
    pub scan_count: u32,
    /// Whether this event crossed the threshold and requested deletion
    pub delete_triggered: bool,
}

/// What the tracker did with a webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TrackerAction {
    /// QR event counted
    ScanRecorded(ScanOutcome),
    /// Non-QR event, counter cleared
    Reset,
    /// Event had no session name and was not tracked
    Ignored,
}

/// Per-session QR-scan counter with escalation
pub struct QrScanTracker {
    store: Arc<dyn CounterStore>,
    queue: Arc<dyn DeletionQueue>,
    config: TrackerConfig,
}

impl QrScanTracker {
    /// Create a tracker with default threshold and TTL
    pub fn new(store: Arc<dyn CounterStore>, queue: Arc<dyn DeletionQueue>) -> Self {
        Self::with_config(store, queue, TrackerConfig::default())
    }

    /// Create a tracker with custom configuration
    pub fn with_config(
        store: Arc<dyn CounterStore>,
        queue: Arc<dyn DeletionQueue>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Store key for an (instance, session) pair
    #[must_use]
    pub fn counter_key(&self, instance_id: &str, session_name: &str) -> String {
        format!("{}{}:{}", self.config.key_prefix, instance_id, session_name)
    }

    /// Record a QR event and escalate once the threshold is reached
    pub async fn record_scan(&self, instance_id: &str, session_name: &str) -> ScanOutcome {
        let key = self.counter_key(instance_id, session_name);

        let previous = match self.read_count(&key).await {
            Ok(count) => count,
            Err(e) => {
                error!(instance_id = %instance_id, session = %session_name, error = %e, "Failed to read QR scan count");
                0
            }
        };
        let scan_count = previous.saturating_add(1);

        if let Err(e) = self.write_count(&key, scan_count).await {
            error!(instance_id = %instance_id, session = %session_name, error = %e, "Failed to store QR scan count");
        }

        info!(
            instance_id = %instance_id,
            session = %session_name,
            scan_count,
            threshold = self.config.threshold,
            "QR scan recorded"
        );

        if scan_count < self.config.threshold {
            return ScanOutcome {
                scan_count,
                delete_triggered: false,
            };
        }

        warn!(
            instance_id = %instance_id,
            session = %session_name,
            scan_count,
            "Consecutive QR scans reached threshold, treating connection as failed"
        );

        self.request_deletion(instance_id).await;

        if let Err(e) = self.store.del(&key).await {
            error!(instance_id = %instance_id, session = %session_name, error = %e, "Failed to clear QR scan count");
        }

        info!(instance_id = %instance_id, session = %session_name, "QR scan count cleared after escalation");

        ScanOutcome {
            scan_count,
            delete_triggered: true,
        }
    }

    /// Clear the counter after a non-QR event
    pub async fn reset_scan(&self, instance_id: &str, session_name: &str) {
        let key = self.counter_key(instance_id, session_name);

        match self.store.del(&key).await {
            Ok(existed) => {
                debug!(instance_id = %instance_id, session = %session_name, existed, "QR scan count reset");
            }
            Err(e) => {
                error!(instance_id = %instance_id, session = %session_name, error = %e, "Failed to reset QR scan count");
            }
        }
    }

    /// Current counter value, zero when absent
    ///
    /// # Errors
    ///
    /// Returns the store error; unlike the tracking operations this one is
    /// for diagnostics and does not hide failures.
    pub async fn current_count(&self, instance_id: &str, session_name: &str) -> Result<u32> {
        self.read_count(&self.counter_key(instance_id, session_name))
            .await
    }

    /// Dispatch a webhook event to the matching operation
    pub async fn handle_event(&self, instance_id: &str, event: &WebhookEvent) -> TrackerAction {
        if event.session.trim().is_empty() {
            debug!(instance_id = %instance_id, event = %event.event, "Event without session name ignored");
            return TrackerAction::Ignored;
        }

        match event.kind() {
            EventKind::QrPresented => {
                TrackerAction::ScanRecorded(self.record_scan(instance_id, &event.session).await)
            }
            EventKind::Other => {
                self.reset_scan(instance_id, &event.session).await;
                TrackerAction::Reset
            }
        }
    }

    async fn read_count(&self, key: &str) -> Result<u32> {
        let raw = self.store.get(key).await?;
        Ok(match raw {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                warn!(key = %key, value = %value, "Unparseable QR scan count, starting over");
                0
            }),
            None => 0,
        })
    }

    async fn write_count(&self, key: &str, count: u32) -> Result<()> {
        self.store.set(key, &count.to_string()).await?;
        self.store.expire(key, self.config.ttl_secs).await?;
        Ok(())
    }

    async fn request_deletion(&self, instance_id: &str) {
        match self.queue.enqueue_session_deletion(instance_id).await {
            Ok(job) => {
                info!(instance_id = %instance_id, job_id = %job.id, "Session deletion requested");
            }
            Err(e) => {
                error!(instance_id = %instance_id, error = %e, "Failed to enqueue session deletion");
            }
        }
    }
}

#[cfg(test)]
mod tests;
