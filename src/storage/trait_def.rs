use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::analytics::models::{CountryCount, DayCount, NewClickEvent, UserAgentCount};
use crate::models::ShortUrl;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes)
    async fn init(&self) -> Result<()>;

    /// Insert a new short URL. The UNIQUE constraint on short_code is the
    /// sole concurrency control for allocation; a constraint rejection
    /// surfaces as `StorageError::Conflict`.
    async fn create_url(
        &self,
        short_code: &str,
        original_url: &str,
        is_custom_alias: bool,
    ) -> StorageResult<ShortUrl>;

    /// Point lookup by short code
    async fn get_url(&self, short_code: &str) -> Result<Option<ShortUrl>>;

    /// Point lookup by id
    async fn get_url_by_id(&self, id: i64) -> Result<Option<ShortUrl>>;

    /// Insert-only analytics write
    async fn insert_event(&self, event: NewClickEvent) -> Result<()>;

    /// Total click count for a URL
    async fn count_events(&self, url_id: i64) -> Result<i64>;

    /// Per-day click counts, ascending by date
    async fn clicks_by_day(&self, url_id: i64) -> Result<Vec<DayCount>>;

    /// Country counts (NULL excluded), descending by count with
    /// country-code-ascending tie break, bounded to `limit`
    async fn country_counts(&self, url_id: i64, limit: i64) -> Result<Vec<CountryCount>>;

    /// Raw user-agent counts (NULL included); browser classification
    /// happens above the storage layer
    async fn user_agent_counts(&self, url_id: i64) -> Result<Vec<UserAgentCount>>;
}
