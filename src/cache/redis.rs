//! Redis cache backend
//!
//! Stores short URLs as JSON under a prefixed key with a per-entry TTL
//! (SETEX). Uses a multiplexed connection manager so concurrent redirect
//! handlers share one connection and reconnects are transparent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::cache::UrlCache;
use crate::models::ShortUrl;

const KEY_PREFIX: &str = "nanolink:url:";

pub struct RedisCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisCache {
    pub async fn new(redis_url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("invalid Redis URL: {}", redis_url))?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis cache")?;

        Ok(Self { conn, ttl_secs })
    }

    fn make_key(short_code: &str) -> String {
        format!("{}{}", KEY_PREFIX, short_code)
    }
}

#[async_trait]
impl UrlCache for RedisCache {
    async fn get(&self, short_code: &str) -> Result<Option<ShortUrl>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(Self::make_key(short_code)).await?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, short_code: &str, url: &ShortUrl) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(url)?;
        conn.set_ex::<_, _, ()>(Self::make_key(short_code), json, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}
