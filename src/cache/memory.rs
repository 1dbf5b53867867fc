//! In-process cache backend (moka)
//!
//! Default when no Redis URL is configured; also the test backend.

use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use crate::cache::UrlCache;
use crate::models::ShortUrl;

pub struct MemoryCache {
    cache: Cache<String, ShortUrl>,
}

impl MemoryCache {
    pub fn new(max_entries: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { cache }
    }
}

#[async_trait]
impl UrlCache for MemoryCache {
    async fn get(&self, short_code: &str) -> Result<Option<ShortUrl>> {
        Ok(self.cache.get(short_code).await)
    }

    async fn set(&self, short_code: &str, url: &ShortUrl) -> Result<()> {
        self.cache.insert(short_code.to_string(), url.clone()).await;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_url(code: &str) -> ShortUrl {
        ShortUrl {
            id: 1,
            short_code: code.to_string(),
            original_url: "https://example.com".to_string(),
            is_custom_alias: false,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new(16, 60);
        cache.set("abc", &sample_url("abc")).await.unwrap();

        let hit = cache.get("abc").await.unwrap().unwrap();
        assert_eq!(hit.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn test_miss_is_none() {
        let cache = MemoryCache::new(16, 60);
        assert!(cache.get("missing").await.unwrap().is_none());
    }
}
