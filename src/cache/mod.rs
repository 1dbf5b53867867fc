//! Short-code lookup cache
//!
//! Read path is cache-aside: the resolver consults the cache first and
//! repopulates it from the store on miss. Writes are write-through on
//! allocation. Entries are immutable once created, so TTL expiry is the
//! only invalidation that can ever be needed.
//!
//! Cache failures must never fail a redirect: callers treat `Err` from
//! `get` as a miss and `Err` from `set` as a logged no-op.

pub mod memory;
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ShortUrl;

pub use memory::MemoryCache;
pub use redis::RedisCache;

#[async_trait]
pub trait UrlCache: Send + Sync {
    /// Lookup a cached short URL by code
    async fn get(&self, short_code: &str) -> Result<Option<ShortUrl>>;

    /// Populate the cache; the configured TTL is applied by the backend
    async fn set(&self, short_code: &str, url: &ShortUrl) -> Result<()>;

    /// Liveness probe for health reporting
    async fn ping(&self) -> Result<()>;
}
