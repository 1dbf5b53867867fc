//! Queue and consumer integration tests
//!
//! Drives the consumer loop end to end over the in-process queue: jobs
//! flow to completion against real storage, and a persistently failing
//! store exhausts the retry budget and parks the job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;

use nanolink::analytics::{ClickJob, ClickProcessor, GeoIpService, NewClickEvent};
use nanolink::analytics::models::{CountryCount, DayCount, UserAgentCount};
use nanolink::models::ShortUrl;
use nanolink::queue::{run_consumer, JobQueue, MemoryQueue, RetryPolicy};
use nanolink::storage::{SqliteStorage, Storage, StorageResult};

async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn click(code: &str) -> ClickJob {
    ClickJob {
        short_code: code.to_string(),
        user_agent: None,
        ip: Some("203.0.113.5".to_string()),
        referer: None,
        timestamp: 1_700_000_000,
    }
}

/// Storage stub that resolves URLs but cannot persist events
struct WriteFailingStorage;

#[async_trait]
impl Storage for WriteFailingStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn create_url(
        &self,
        _short_code: &str,
        _original_url: &str,
        _is_custom_alias: bool,
    ) -> StorageResult<ShortUrl> {
        unimplemented!()
    }

    async fn get_url(&self, short_code: &str) -> Result<Option<ShortUrl>> {
        Ok(Some(ShortUrl {
            id: 1,
            short_code: short_code.to_string(),
            original_url: "https://example.com".to_string(),
            is_custom_alias: false,
            created_at: 0,
        }))
    }

    async fn get_url_by_id(&self, _id: i64) -> Result<Option<ShortUrl>> {
        Ok(None)
    }

    async fn insert_event(&self, _event: NewClickEvent) -> Result<()> {
        anyhow::bail!("disk full")
    }

    async fn count_events(&self, _url_id: i64) -> Result<i64> {
        Ok(0)
    }

    async fn clicks_by_day(&self, _url_id: i64) -> Result<Vec<DayCount>> {
        Ok(vec![])
    }

    async fn country_counts(&self, _url_id: i64, _limit: i64) -> Result<Vec<CountryCount>> {
        Ok(vec![])
    }

    async fn user_agent_counts(&self, _url_id: i64) -> Result<Vec<UserAgentCount>> {
        Ok(vec![])
    }
}

fn create_processor(storage: Arc<dyn Storage>) -> Arc<ClickProcessor> {
    Arc::new(ClickProcessor::new(
        storage,
        GeoIpService::new(None).unwrap(),
        "test-salt".to_string(),
    ))
}

#[tokio::test]
async fn test_consumer_completes_jobs() {
    let storage = create_test_storage().await;
    let url = storage
        .create_url("consumed", "https://example.com", false)
        .await
        .unwrap();

    let queue = Arc::new(MemoryQueue::new());
    let processor = create_processor(Arc::clone(&storage));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = tokio::spawn(run_consumer(
        Arc::clone(&queue) as Arc<dyn JobQueue>,
        processor,
        RetryPolicy::default(),
        shutdown_rx,
    ));

    for _ in 0..3 {
        queue.enqueue(click("consumed")).await.unwrap();
    }

    // Wait for the consumer to drain the queue
    let mut drained = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if queue.counts().await.unwrap().completed == 3 {
            drained = true;
            break;
        }
    }
    assert!(drained, "consumer did not drain the queue in time");
    assert_eq!(storage.count_events(url.id).await.unwrap(), 3);

    shutdown_tx.send(true).unwrap();
    consumer.await.unwrap();
}

#[tokio::test]
async fn test_click_pipeline_end_to_end() {
    use nanolink::analytics::StatsAggregator;
    use nanolink::cache::{MemoryCache, UrlCache};
    use nanolink::shortener::Shortener;

    let storage = create_test_storage().await;
    let cache: Arc<dyn UrlCache> = Arc::new(MemoryCache::new(128, 60));
    let queue = Arc::new(MemoryQueue::new());

    let shortener = Shortener::new(Arc::clone(&storage), cache, 8);
    let url = shortener
        .allocate("https://example.com/e2e", None)
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = tokio::spawn(run_consumer(
        Arc::clone(&queue) as Arc<dyn JobQueue>,
        create_processor(Arc::clone(&storage)),
        RetryPolicy::default(),
        shutdown_rx,
    ));

    queue.enqueue(click(&url.short_code)).await.unwrap();

    let mut processed = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if queue.counts().await.unwrap().completed == 1 {
            processed = true;
            break;
        }
    }
    assert!(processed, "click was not processed in time");

    let stats = StatsAggregator::new(Arc::clone(&storage))
        .get_stats(&url.short_code)
        .await
        .unwrap();
    assert_eq!(stats.total_clicks, 1);
    assert_eq!(stats.clicks_by_day.len(), 1);

    shutdown_tx.send(true).unwrap();
    consumer.await.unwrap();
}

#[tokio::test]
async fn test_consumer_retries_then_parks_failed_job() {
    let queue = Arc::new(MemoryQueue::new());
    let processor = create_processor(Arc::new(WriteFailingStorage));

    let policy = RetryPolicy {
        max_attempts: 3,
        backoff_base_ms: 1,
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = tokio::spawn(run_consumer(
        Arc::clone(&queue) as Arc<dyn JobQueue>,
        processor,
        policy,
        shutdown_rx,
    ));

    queue.enqueue(click("doomed12")).await.unwrap();

    let mut parked = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let counts = queue.counts().await.unwrap();
        if counts.failed == 1 {
            parked = true;
            assert_eq!(counts.completed, 0);
            assert_eq!(counts.waiting, 0);
            break;
        }
    }
    assert!(parked, "job was not parked as failed in time");

    let failed = queue.failed_jobs().await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].short_code, "doomed12");

    shutdown_tx.send(true).unwrap();
    consumer.await.unwrap();
}
