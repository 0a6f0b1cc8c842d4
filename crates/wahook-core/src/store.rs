//! Counter storage backends
//!
//! Provides both in-memory and Redis-backed key/value storage with
//! independent per-key expiry.
//!
//! # Semantics
//!
//! Both backends follow Redis behaviour so the tracker sees the same thing
//! in tests and in production:
//! - `set` clears any previous expiry on the key
//! - `expire` on a missing key is a no-op and returns `false`
//! - `expire` with a TTL of zero removes the key
//! - an expired key reads as absent

use crate::error::{Error, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

/// Key/value store with per-key TTL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read a key; `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key, dropping any previous TTL
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set the key's TTL; returns whether the key existed
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool>;

    /// Delete a key; returns whether the key existed
    async fn del(&self, key: &str) -> Result<bool>;

    /// Round-trip check used by health endpoints
    async fn ping(&self) -> Result<()>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Drop every expired entry; writes call this so abandoned keys do not pile up
fn sweep_expired(entries: &mut HashMap<String, Entry>, now: Instant) {
    let before = entries.len();
    entries.retain(|_, e| !e.is_expired(now));
    let swept = before - entries.len();
    if swept > 0 {
        debug!(swept, remaining = entries.len(), "Expired counters removed");
    }
}

/// In-memory counter store (for development/testing)
///
/// Data is lost on restart and is not shared between processes.
#[derive(Default)]
pub struct MemoryCounterStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCounterStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether the store holds no live keys
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of entries held, including expired ones not yet swept
    #[cfg(test)]
    pub(crate) async fn raw_len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Remaining TTL of a key, `None` if absent or persistent
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .and_then(|e| e.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        sweep_expired(&mut entries, Instant::now());
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        sweep_expired(&mut entries, now);

        if !entries.contains_key(key) {
            return Ok(false);
        }

        if ttl_secs == 0 {
            entries.remove(key);
            return Ok(true);
        }

        let deadline = now
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| {
                Error::Store(format!("TTL of {} seconds is out of range", ttl_secs))
            })?;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(deadline);
        }
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .is_some_and(|e| !e.is_expired(now)))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Redis-backed counter store (for production)
///
/// One multiplexed connection is opened lazily and shared by every caller.
/// A failed connect is retried on the next command.
pub struct RedisCounterStore {
    client: redis::Client,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisCounterStore {
    /// Create a new Redis store
    ///
    /// # Errors
    ///
    /// Returns error if Redis URL is invalid
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| Error::Store(e.to_string()))?;
        info!("Redis counter store configured");

        Ok(Self {
            client,
            conn: OnceCell::new(),
        })
    }

    /// Get the shared async connection
    async fn connection(&self) -> Result<MultiplexedConnection> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| Error::Store(format!("Redis connection failed: {}", e)))
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;

        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis GET failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis SET failed: {}", e)))
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let mut conn = self.connection().await?;

        let applied: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis EXPIRE failed: {}", e)))?;

        Ok(applied > 0)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;

        let deleted: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis DEL failed: {}", e)))?;

        debug!(key = %key, deleted = deleted > 0, "Key deleted from Redis");
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| Error::Store(format!("Redis PING failed: {}", e)))
    }
}
