//! Session Deletion Queue
//!
//! Jobs asking a worker to delete a stuck gateway session. The tracker only
//! produces jobs; consuming them (and calling the gateway) belongs to a
//! separate worker.
//!
//! The Redis backend keeps jobs as JSON in a list: producers `LPUSH`,
//! consumers `RPOP`, which gives FIFO order.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};
use uuid::Uuid;

/// Default Redis list holding deletion jobs
pub const DEFAULT_QUEUE_NAME: &str = "wahook:queue:session-delete";

/// A request to delete the gateway session of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionJob {
    /// Job identifier (for logging and dedup on the consumer side)
    pub id: Uuid,
    /// Instance whose session should be deleted
    pub instance_id: String,
    /// When the job was enqueued
    pub enqueued_at: DateTime<Utc>,
    /// Delivery attempts so far
    #[serde(default)]
    pub attempts: u32,
}

impl DeletionJob {
    /// Create a fresh job for an instance
    #[must_use]
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance_id: instance_id.into(),
            enqueued_at: Utc::now(),
            attempts: 0,
        }
    }
}

fn validate_instance_id(instance_id: &str) -> Result<()> {
    if instance_id.trim().is_empty() {
        return Err(Error::InvalidInput(
            "instance id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Queue of session deletion jobs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeletionQueue: Send + Sync {
    /// Enqueue a deletion job for an instance
    async fn enqueue_session_deletion(&self, instance_id: &str) -> Result<DeletionJob>;

    /// Take the oldest job, if any
    async fn dequeue(&self) -> Result<Option<DeletionJob>>;

    /// Number of jobs waiting
    async fn pending(&self) -> Result<usize>;
}

/// In-memory deletion queue (for development/testing)
#[derive(Default)]
pub struct MemoryDeletionQueue {
    jobs: Mutex<VecDeque<DeletionJob>>,
}

impl MemoryDeletionQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of waiting jobs, oldest first
    pub async fn jobs(&self) -> Vec<DeletionJob> {
        self.jobs.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl DeletionQueue for MemoryDeletionQueue {
    async fn enqueue_session_deletion(&self, instance_id: &str) -> Result<DeletionJob> {
        validate_instance_id(instance_id)?;

        let job = DeletionJob::new(instance_id);
        self.jobs.lock().await.push_back(job.clone());
        debug!(job_id = %job.id, instance_id = %instance_id, "Deletion job queued in memory");
        Ok(job)
    }

    async fn dequeue(&self) -> Result<Option<DeletionJob>> {
        Ok(self.jobs.lock().await.pop_front())
    }

    async fn pending(&self) -> Result<usize> {
        Ok(self.jobs.lock().await.len())
    }
}

/// Redis list-backed deletion queue (for production)
pub struct RedisDeletionQueue {
    client: redis::Client,
    conn: OnceCell<MultiplexedConnection>,
    /// Redis list key
    queue_name: String,
}

impl RedisDeletionQueue {
    /// Create a queue on the default list
    ///
    /// # Errors
    ///
    /// Returns error if Redis URL is invalid
    pub fn new(redis_url: &str) -> Result<Self> {
        Self::with_name(redis_url, DEFAULT_QUEUE_NAME)
    }

    /// Create a queue on a custom list
    ///
    /// # Errors
    ///
    /// Returns error if Redis URL is invalid or the name is empty
    pub fn with_name(redis_url: &str, queue_name: &str) -> Result<Self> {
        if queue_name.trim().is_empty() {
            return Err(Error::Configuration(
                "queue name must not be empty".to_string(),
            ));
        }
        let client = redis::Client::open(redis_url).map_err(|e| Error::Queue(e.to_string()))?;

        Ok(Self {
            client,
            conn: OnceCell::new(),
            queue_name: queue_name.to_string(),
        })
    }

    /// Redis list key this queue writes to
    #[must_use]
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| Error::Queue(format!("Redis connection failed: {}", e)))
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl DeletionQueue for RedisDeletionQueue {
    async fn enqueue_session_deletion(&self, instance_id: &str) -> Result<DeletionJob> {
        validate_instance_id(instance_id)?;

        let job = DeletionJob::new(instance_id);
        let json = serde_json::to_string(&job)?;
        let mut conn = self.connection().await?;

        let depth: i64 = redis::cmd("LPUSH")
            .arg(&self.queue_name)
            .arg(&json)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Queue(format!("Redis LPUSH failed: {}", e)))?;

        info!(
            job_id = %job.id,
            instance_id = %instance_id,
            queue = %self.queue_name,
            depth,
            "Session deletion job enqueued"
        );
        Ok(job)
    }

    async fn dequeue(&self) -> Result<Option<DeletionJob>> {
        let mut conn = self.connection().await?;

        let data: Option<String> = redis::cmd("RPOP")
            .arg(&self.queue_name)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Queue(format!("Redis RPOP failed: {}", e)))?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn pending(&self) -> Result<usize> {
        let mut conn = self.connection().await?;

        let len: i64 = redis::cmd("LLEN")
            .arg(&self.queue_name)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Queue(format!("Redis LLEN failed: {}", e)))?;

        Ok(usize::try_from(len).unwrap_or(0))
    }
}
