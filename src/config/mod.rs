use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub redirect_server: ServerConfig,
    pub cache: CacheConfig,
    pub queue: QueueConfig,
    pub analytics: AnalyticsConfig,
    /// Base URL used to build the short_url field in API responses
    pub public_base_url: String,
    /// Default length of generated short codes
    pub code_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL; falls back to an in-process moka cache when unset
    pub redis_url: Option<String>,
    /// TTL applied when populating the short-code cache
    pub ttl_secs: u64,
    /// Capacity bound for the in-process cache
    pub max_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Redis connection URL; falls back to an in-process queue when unset
    pub redis_url: Option<String>,
    /// Number of analytics consumer tasks
    pub workers: usize,
    /// Per-job delivery attempts before the job is parked as failed
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff
    pub backoff_base_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Salt mixed into the one-way IP digest. Required: there is no default,
    /// a hardcoded fallback would silently weaken the anonymization.
    pub ip_hash_salt: String,
    /// Path to a MaxMind GeoLite2/GeoIP2 City .mmdb file
    pub geoip_db_path: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./nanolink.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let redirect_host =
            std::env::var("REDIRECT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let redirect_port = std::env::var("REDIRECT_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let cache_redis_url = std::env::var("CACHE_REDIS_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .ok();
        let cache_ttl_secs = std::env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300);
        let cache_max_entries = std::env::var("CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10_000);

        let queue_redis_url = std::env::var("QUEUE_REDIS_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .ok();
        let queue_workers = std::env::var("ANALYTICS_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(2);
        let queue_max_attempts = std::env::var("QUEUE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);
        let queue_backoff_base_ms = std::env::var("QUEUE_BACKOFF_BASE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1_000);

        // Deliberately no fallback value: an unconfigured salt must fail
        // startup instead of quietly hashing with a well-known constant.
        let ip_hash_salt = std::env::var("IP_HASH_SALT")
            .context("IP_HASH_SALT must be set (used to anonymize visitor IPs)")?;
        if ip_hash_salt.is_empty() {
            anyhow::bail!("IP_HASH_SALT must not be empty");
        }

        let geoip_db_path = std::env::var("GEOIP_DB_PATH").ok();

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", redirect_host, redirect_port));

        let code_length = std::env::var("CODE_LENGTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(8);

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            cache: CacheConfig {
                redis_url: cache_redis_url,
                ttl_secs: cache_ttl_secs,
                max_entries: cache_max_entries,
            },
            queue: QueueConfig {
                redis_url: queue_redis_url,
                workers: queue_workers,
                max_attempts: queue_max_attempts,
                backoff_base_ms: queue_backoff_base_ms,
            },
            analytics: AnalyticsConfig {
                ip_hash_salt,
                geoip_db_path,
            },
            public_base_url,
            code_length,
        })
    }
}
