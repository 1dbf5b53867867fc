//! Queue consumer loop
//!
//! Each consumer task leases one job at a time, runs it through the click
//! processor, and drives the retry state machine: success acknowledges,
//! failure retries with exponential backoff up to the attempt bound, then
//! parks the job as failed. Parking is terminal for that job only, never
//! for the pipeline.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::analytics::ClickProcessor;
use crate::queue::JobQueue;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total deliveries allowed per job (first attempt included)
    pub max_attempts: u32,
    /// Base delay for exponential backoff between deliveries
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    /// Delay before delivery `attempt + 1`: base * 2^attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1_000,
        }
    }
}

/// Run one consumer until the shutdown signal flips
pub async fn run_consumer(
    queue: Arc<dyn JobQueue>,
    processor: Arc<ClickProcessor>,
    policy: RetryPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("analytics consumer shutting down");
                    break;
                }
            }
            leased = queue.dequeue() => {
                match leased {
                    Ok(Some(envelope)) => {
                        process_one(&queue, &processor, policy, envelope).await;
                    }
                    Ok(None) => {
                        // Poll timeout with an empty queue
                    }
                    Err(err) => {
                        warn!(error = %err, "queue dequeue failed, backing off");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

async fn process_one(
    queue: &Arc<dyn JobQueue>,
    processor: &Arc<ClickProcessor>,
    policy: RetryPolicy,
    envelope: crate::queue::JobEnvelope,
) {
    let short_code = envelope.job.short_code.clone();
    let attempt = envelope.attempt;

    match processor.process(&envelope.job).await {
        Ok(()) => {
            if let Err(err) = queue.complete(envelope).await {
                warn!(short_code = %short_code, error = %err, "failed to ack completed job");
            }
        }
        Err(err) => {
            let delivered = attempt + 1;
            if delivered >= policy.max_attempts {
                error!(
                    short_code = %short_code,
                    attempts = delivered,
                    error = %err,
                    "click job exhausted retries, parking as failed"
                );
                if let Err(err) = queue.fail(envelope).await {
                    warn!(short_code = %short_code, error = %err, "failed to park job");
                }
            } else {
                warn!(
                    short_code = %short_code,
                    attempt = delivered,
                    error = %err,
                    "click job failed, scheduling retry"
                );
                tokio::time::sleep(policy.backoff(attempt)).await;
                if let Err(err) = queue.requeue(envelope).await {
                    warn!(short_code = %short_code, error = %err, "failed to requeue job");
                }
            }
        }
    }
}
