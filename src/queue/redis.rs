//! Redis queue backend
//!
//! Jobs are JSON envelopes on a waiting list, moved atomically to an
//! active list on lease (BLMOVE) and removed from it on ack (LREM).
//! Retry and dead-letter transitions push the job to its destination
//! list before dropping the active entry, so a crash between the two
//! writes redelivers the job instead of losing it. Entries stranded on
//! the active list by a dead consumer are swept back to waiting by
//! `recover_active` at startup. Completed jobs bump a counter, failed
//! ones land on a dead-letter list.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Direction};
use serde::{Deserialize, Serialize};

use crate::analytics::ClickJob;
use crate::queue::{JobEnvelope, JobQueue, QueueCounts};

const WAITING_KEY: &str = "nanolink:queue:waiting";
const ACTIVE_KEY: &str = "nanolink:queue:active";
const FAILED_KEY: &str = "nanolink:queue:failed";
const COMPLETED_KEY: &str = "nanolink:queue:completed";

const POLL_TIMEOUT_SECS: f64 = 1.0;

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    attempt: u32,
    job: ClickJob,
}

pub struct RedisQueue {
    conn: ConnectionManager,
}

impl RedisQueue {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("invalid Redis URL: {}", redis_url))?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis queue")?;

        Ok(Self { conn })
    }

    async fn push_waiting(&self, job: ClickJob, attempt: u32) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&WireEnvelope { attempt, job })?;
        conn.lpush::<_, _, ()>(WAITING_KEY, payload).await?;
        Ok(())
    }

    /// Move entries stranded on the active list back to waiting.
    ///
    /// Run at startup before consumers attach. A consumer that died
    /// between lease and ack leaves its entry here; redelivering it is a
    /// duplicate at worst, dropping it would be a loss.
    pub async fn recover_active(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        let mut moved = 0u64;
        loop {
            let raw: Option<String> = conn
                .lmove(ACTIVE_KEY, WAITING_KEY, Direction::Right, Direction::Left)
                .await?;
            if raw.is_none() {
                break;
            }
            moved += 1;
        }
        Ok(moved)
    }

    /// Drop the leased entry from the active list
    async fn ack(&self, envelope: &JobEnvelope) -> Result<()> {
        let raw = envelope
            .token
            .as_deref()
            .context("missing lease token on Redis job")?;
        let mut conn = self.conn.clone();
        conn.lrem::<_, _, ()>(ACTIVE_KEY, 1, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, job: ClickJob) -> Result<()> {
        self.push_waiting(job, 0).await
    }

    async fn dequeue(&self) -> Result<Option<JobEnvelope>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .blmove(
                WAITING_KEY,
                ACTIVE_KEY,
                Direction::Right,
                Direction::Left,
                POLL_TIMEOUT_SECS,
            )
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let wire: WireEnvelope =
            serde_json::from_str(&raw).context("malformed click job payload")?;
        Ok(Some(JobEnvelope {
            job: wire.job,
            attempt: wire.attempt,
            token: Some(raw),
        }))
    }

    async fn complete(&self, envelope: JobEnvelope) -> Result<()> {
        self.ack(&envelope).await?;
        let mut conn = self.conn.clone();
        conn.incr::<_, _, ()>(COMPLETED_KEY, 1).await?;
        Ok(())
    }

    async fn requeue(&self, envelope: JobEnvelope) -> Result<()> {
        // Destination first: a crash before the ack redelivers the job,
        // never loses it
        self.push_waiting(envelope.job.clone(), envelope.attempt + 1)
            .await?;
        self.ack(&envelope).await
    }

    async fn fail(&self, envelope: JobEnvelope) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&WireEnvelope {
            attempt: envelope.attempt,
            job: envelope.job.clone(),
        })?;
        conn.lpush::<_, _, ()>(FAILED_KEY, payload).await?;
        self.ack(&envelope).await
    }

    async fn counts(&self) -> Result<QueueCounts> {
        let mut conn = self.conn.clone();
        let waiting: u64 = conn.llen(WAITING_KEY).await?;
        let active: u64 = conn.llen(ACTIVE_KEY).await?;
        let failed: u64 = conn.llen(FAILED_KEY).await?;
        let completed: Option<u64> = conn.get(COMPLETED_KEY).await?;

        Ok(QueueCounts {
            waiting,
            active,
            completed: completed.unwrap_or(0),
            failed,
        })
    }
}
