use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::analytics::models::{CountryCount, DayCount, NewClickEvent, UserAgentCount};
use crate::models::ShortUrl;
use crate::storage::{Storage, StorageError, StorageResult};

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS urls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL UNIQUE,
                original_url TEXT NOT NULL,
                is_custom_alias INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_short_code ON urls(short_code)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analytics_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url_id INTEGER NOT NULL,
                access_time INTEGER NOT NULL,
                hashed_ip TEXT,
                user_agent TEXT,
                referer TEXT,
                country_code TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_events_url_time ON analytics_events(url_id, access_time)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_url(
        &self,
        short_code: &str,
        original_url: &str,
        is_custom_alias: bool,
    ) -> StorageResult<ShortUrl> {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| StorageError::Other(e.into()))?
            .as_secs() as i64;

        let result = sqlx::query(
            r#"
            INSERT INTO urls (short_code, original_url, is_custom_alias, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(short_code) DO NOTHING
            "#,
        )
        .bind(short_code)
        .bind(original_url)
        .bind(is_custom_alias)
        .bind(created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let url = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT id, short_code, original_url, is_custom_alias, created_at
            FROM urls
            WHERE short_code = ?
            "#,
        )
        .bind(short_code)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(url)
    }

    async fn get_url(&self, short_code: &str) -> Result<Option<ShortUrl>> {
        let url = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT id, short_code, original_url, is_custom_alias, created_at
            FROM urls
            WHERE short_code = ?
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(url)
    }

    async fn get_url_by_id(&self, id: i64) -> Result<Option<ShortUrl>> {
        let url = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT id, short_code, original_url, is_custom_alias, created_at
            FROM urls
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(url)
    }

    async fn insert_event(&self, event: NewClickEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analytics_events
                (url_id, access_time, hashed_ip, user_agent, referer, country_code)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.url_id)
        .bind(event.access_time)
        .bind(event.hashed_ip)
        .bind(event.user_agent)
        .bind(event.referer)
        .bind(event.country_code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn count_events(&self, url_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM analytics_events WHERE url_id = ?",
        )
        .bind(url_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn clicks_by_day(&self, url_id: i64) -> Result<Vec<DayCount>> {
        let rows = sqlx::query_as::<_, DayCount>(
            r#"
            SELECT date(access_time, 'unixepoch') AS date, COUNT(*) AS count
            FROM analytics_events
            WHERE url_id = ?
            GROUP BY date
            ORDER BY date ASC
            "#,
        )
        .bind(url_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn country_counts(&self, url_id: i64, limit: i64) -> Result<Vec<CountryCount>> {
        let rows = sqlx::query_as::<_, CountryCount>(
            r#"
            SELECT country_code AS country, COUNT(*) AS count
            FROM analytics_events
            WHERE url_id = ? AND country_code IS NOT NULL
            GROUP BY country_code
            ORDER BY count DESC, country_code ASC
            LIMIT ?
            "#,
        )
        .bind(url_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn user_agent_counts(&self, url_id: i64) -> Result<Vec<UserAgentCount>> {
        let rows = sqlx::query_as::<_, UserAgentCount>(
            r#"
            SELECT user_agent, COUNT(*) AS count
            FROM analytics_events
            WHERE url_id = ?
            GROUP BY user_agent
            "#,
        )
        .bind(url_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }
}
