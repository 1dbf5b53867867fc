//! Analytics pipeline integration tests
//!
//! Runs the click processor and stats aggregator against real SQLite
//! storage: event persistence, IP anonymization, the drop rule for unknown
//! codes, duplicate delivery, and read-side aggregation.

use std::sync::Arc;

use nanolink::analytics::{hash_ip, ClickJob, ClickProcessor, GeoIpService, NewClickEvent, StatsAggregator};
use nanolink::error::ServiceError;
use nanolink::storage::{SqliteStorage, Storage};

const SALT: &str = "test-salt";

const CHROME_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36";
const FIREFOX_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn create_processor(storage: Arc<dyn Storage>) -> ClickProcessor {
    ClickProcessor::new(storage, GeoIpService::new(None).unwrap(), SALT.to_string())
}

fn job(code: &str, ip: Option<&str>, ua: Option<&str>, timestamp: i64) -> ClickJob {
    ClickJob {
        short_code: code.to_string(),
        user_agent: ua.map(String::from),
        ip: ip.map(String::from),
        referer: None,
        timestamp,
    }
}

#[tokio::test]
async fn test_process_persists_event() {
    let storage = create_test_storage().await;
    let url = storage
        .create_url("tracked1", "https://example.com", false)
        .await
        .unwrap();

    let processor = create_processor(Arc::clone(&storage));
    processor
        .process(&job("tracked1", Some("203.0.113.5"), Some(CHROME_UA), 1_700_000_000))
        .await
        .unwrap();

    assert_eq!(storage.count_events(url.id).await.unwrap(), 1);

    // The raw IP never reaches the store
    let agents = storage.user_agent_counts(url.id).await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].user_agent.as_deref(), Some(CHROME_UA));
}

#[tokio::test]
async fn test_unknown_code_is_dropped() {
    let storage = create_test_storage().await;
    let processor = create_processor(Arc::clone(&storage));

    // Done, not an error: redelivery cannot make the URL appear
    processor
        .process(&job("ghost123", Some("203.0.113.5"), None, 1_700_000_000))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_duplicate_delivery_writes_two_rows() {
    let storage = create_test_storage().await;
    let url = storage
        .create_url("dupes123", "https://example.com", false)
        .await
        .unwrap();

    let processor = create_processor(Arc::clone(&storage));
    let click = job("dupes123", Some("203.0.113.5"), None, 1_700_000_000);
    processor.process(&click).await.unwrap();
    processor.process(&click).await.unwrap();

    // At-least-once delivery accepts duplicates
    assert_eq!(storage.count_events(url.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_stats_aggregation() {
    let storage = create_test_storage().await;
    let url = storage
        .create_url("stats123", "https://example.com/stats", false)
        .await
        .unwrap();

    // Two clicks on day one, one on day two
    let day1 = 1_700_000_000; // 2023-11-14
    let day2 = day1 + 86_400;

    for (time, country, ua) in [
        (day1, Some("US"), Some(CHROME_UA)),
        (day1 + 60, Some("DE"), Some(FIREFOX_UA)),
        (day2, Some("US"), Some(CHROME_UA)),
    ] {
        storage
            .insert_event(NewClickEvent {
                url_id: url.id,
                access_time: time,
                hashed_ip: Some(hash_ip("203.0.113.5", SALT)),
                user_agent: ua.map(String::from),
                referer: None,
                country_code: country.map(String::from),
            })
            .await
            .unwrap();
    }

    let aggregator = StatsAggregator::new(Arc::clone(&storage));
    let stats = aggregator.get_stats("stats123").await.unwrap();

    assert_eq!(stats.short_code, "stats123");
    assert_eq!(stats.original_url, "https://example.com/stats");
    assert_eq!(stats.total_clicks, 3);

    assert_eq!(stats.clicks_by_day.len(), 2);
    assert_eq!(stats.clicks_by_day[0].date, "2023-11-14");
    assert_eq!(stats.clicks_by_day[0].count, 2);
    assert_eq!(stats.clicks_by_day[1].date, "2023-11-15");
    assert_eq!(stats.clicks_by_day[1].count, 1);

    assert_eq!(stats.top_countries.len(), 2);
    assert_eq!(stats.top_countries[0].country, "US");
    assert_eq!(stats.top_countries[0].count, 2);
    assert_eq!(stats.top_countries[1].country, "DE");

    assert_eq!(stats.top_browsers.len(), 2);
    assert_eq!(stats.top_browsers[0].browser, "Chrome");
    assert_eq!(stats.top_browsers[0].count, 2);
    assert_eq!(stats.top_browsers[1].browser, "Firefox");
}

#[tokio::test]
async fn test_stats_tie_break_is_deterministic() {
    let storage = create_test_storage().await;
    let url = storage
        .create_url("ties1234", "https://example.com", false)
        .await
        .unwrap();

    // One click each from FR and CA; equal counts must rank CA first
    for country in ["FR", "CA"] {
        storage
            .insert_event(NewClickEvent {
                url_id: url.id,
                access_time: 1_700_000_000,
                hashed_ip: None,
                user_agent: None,
                referer: None,
                country_code: Some(country.to_string()),
            })
            .await
            .unwrap();
    }

    let aggregator = StatsAggregator::new(storage);
    let stats = aggregator.get_stats("ties1234").await.unwrap();
    assert_eq!(stats.top_countries[0].country, "CA");
    assert_eq!(stats.top_countries[1].country, "FR");
}

#[tokio::test]
async fn test_stats_unknown_code() {
    let storage = create_test_storage().await;
    let aggregator = StatsAggregator::new(storage);

    let err = aggregator.get_stats("missing1").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn test_stats_no_clicks() {
    let storage = create_test_storage().await;
    storage
        .create_url("quiet123", "https://example.com", false)
        .await
        .unwrap();

    let aggregator = StatsAggregator::new(storage);
    let stats = aggregator.get_stats("quiet123").await.unwrap();

    assert_eq!(stats.total_clicks, 0);
    assert!(stats.clicks_by_day.is_empty());
    assert!(stats.top_countries.is_empty());
    assert!(stats.top_browsers.is_empty());
}
