//! Durable click-job queue
//!
//! Carries `ClickJob`s from the redirect path to the analytics consumers
//! with at-least-once delivery. Submission is best-effort from the
//! producer's point of view: the redirect handler fires and forgets, and a
//! failed enqueue is logged, never surfaced.
//!
//! Jobs move waiting -> active -> {completed | waiting (retry) | failed}.
//! The retry/backoff policy lives in the consumer loop; backends only
//! provide the state transitions and count introspection.

pub mod consumer;
pub mod memory;
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::analytics::ClickJob;

pub use consumer::{run_consumer, RetryPolicy};
pub use memory::MemoryQueue;
pub use redis::RedisQueue;

/// A job leased to a consumer, with its delivery bookkeeping
#[derive(Debug)]
pub struct JobEnvelope {
    pub job: ClickJob,
    /// Deliveries already attempted before this one
    pub attempt: u32,
    /// Backend-specific handle to the in-flight entry (raw Redis payload);
    /// `None` for the in-memory backend
    pub(crate) token: Option<String>,
}

/// Queue depth snapshot for operational visibility
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit a job for background processing
    async fn enqueue(&self, job: ClickJob) -> Result<()>;

    /// Lease the next job, blocking up to the backend's poll timeout.
    /// `None` means the queue was empty for the whole wait.
    async fn dequeue(&self) -> Result<Option<JobEnvelope>>;

    /// Acknowledge successful processing
    async fn complete(&self, envelope: JobEnvelope) -> Result<()>;

    /// Return a job to the waiting state for another delivery
    async fn requeue(&self, envelope: JobEnvelope) -> Result<()>;

    /// Park a job as permanently failed
    async fn fail(&self, envelope: JobEnvelope) -> Result<()>;

    /// Waiting/active/completed/failed counts
    async fn counts(&self) -> Result<QueueCounts>;
}
