//! In-process queue backend
//!
//! Default when no Redis URL is configured; also the test backend. Jobs
//! live in a deque guarded by a mutex, with a `Notify` waking blocked
//! consumers. Failed jobs are retained so counts and tests can inspect
//! them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::analytics::ClickJob;
use crate::queue::{JobEnvelope, JobQueue, QueueCounts};

const POLL_TIMEOUT: Duration = Duration::from_millis(500);

pub struct MemoryQueue {
    waiting: Mutex<VecDeque<(ClickJob, u32)>>,
    failed: Mutex<Vec<ClickJob>>,
    notify: Notify,
    active: AtomicU64,
    completed: AtomicU64,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            waiting: Mutex::new(VecDeque::new()),
            failed: Mutex::new(Vec::new()),
            notify: Notify::new(),
            active: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// Jobs parked as failed, oldest first
    pub async fn failed_jobs(&self) -> Vec<ClickJob> {
        self.failed.lock().await.clone()
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: ClickJob) -> Result<()> {
        self.waiting.lock().await.push_back((job, 0));
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<JobEnvelope>> {
        loop {
            if let Some((job, attempt)) = self.waiting.lock().await.pop_front() {
                self.active.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(JobEnvelope {
                    job,
                    attempt,
                    token: None,
                }));
            }

            if tokio::time::timeout(POLL_TIMEOUT, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn complete(&self, _envelope: JobEnvelope) -> Result<()> {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn requeue(&self, envelope: JobEnvelope) -> Result<()> {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.waiting
            .lock()
            .await
            .push_back((envelope.job, envelope.attempt + 1));
        self.notify.notify_one();
        Ok(())
    }

    async fn fail(&self, envelope: JobEnvelope) -> Result<()> {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.failed.lock().await.push(envelope.job);
        Ok(())
    }

    async fn counts(&self) -> Result<QueueCounts> {
        Ok(QueueCounts {
            waiting: self.waiting.lock().await.len() as u64,
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.lock().await.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job(code: &str) -> ClickJob {
        ClickJob {
            short_code: code.to_string(),
            user_agent: None,
            ip: None,
            referer: None,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_enqueue_dequeue_complete() {
        let queue = MemoryQueue::new();
        queue.enqueue(sample_job("abc")).await.unwrap();

        let envelope = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(envelope.job.short_code, "abc");
        assert_eq!(envelope.attempt, 0);

        queue.complete(envelope).await.unwrap();
        let counts = queue.counts().await.unwrap();
        assert_eq!(counts.waiting, 0);
        assert_eq!(counts.active, 0);
        assert_eq!(counts.completed, 1);
    }

    #[tokio::test]
    async fn test_requeue_increments_attempt() {
        let queue = MemoryQueue::new();
        queue.enqueue(sample_job("abc")).await.unwrap();

        let envelope = queue.dequeue().await.unwrap().unwrap();
        queue.requeue(envelope).await.unwrap();

        let envelope = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(envelope.attempt, 1);
    }

    #[tokio::test]
    async fn test_fail_parks_job() {
        let queue = MemoryQueue::new();
        queue.enqueue(sample_job("abc")).await.unwrap();

        let envelope = queue.dequeue().await.unwrap().unwrap();
        queue.fail(envelope).await.unwrap();

        let counts = queue.counts().await.unwrap();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.active, 0);

        let failed = queue.failed_jobs().await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].short_code, "abc");
    }

    #[tokio::test]
    async fn test_empty_dequeue_times_out() {
        let queue = MemoryQueue::new();
        assert!(queue.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MemoryQueue::new();
        queue.enqueue(sample_job("first")).await.unwrap();
        queue.enqueue(sample_job("second")).await.unwrap();

        let a = queue.dequeue().await.unwrap().unwrap();
        let b = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(a.job.short_code, "first");
        assert_eq!(b.job.short_code, "second");
    }
}
