use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nanolink::analytics::{ClickProcessor, GeoIpService, StatsAggregator};
use nanolink::api::{create_api_router, AppState};
use nanolink::cache::{MemoryCache, RedisCache, UrlCache};
use nanolink::config::{Config, DatabaseBackend};
use nanolink::queue::{run_consumer, JobQueue, MemoryQueue, RedisQueue, RetryPolicy};
use nanolink::redirect::{create_redirect_router, handlers::RedirectState, Resolver};
use nanolink::shortener::Shortener;
use nanolink::storage::{PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(SqliteStorage::new(&config.database.url, config.database.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
    };

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    let cache: Arc<dyn UrlCache> = match config.cache.redis_url.as_deref() {
        Some(url) => {
            info!("Using Redis URL cache");
            Arc::new(RedisCache::new(url, config.cache.ttl_secs).await?)
        }
        None => {
            info!("Using in-process URL cache");
            Arc::new(MemoryCache::new(
                config.cache.max_entries,
                config.cache.ttl_secs,
            ))
        }
    };

    let queue: Arc<dyn JobQueue> = match config.queue.redis_url.as_deref() {
        Some(url) => {
            info!("Using Redis click queue");
            let queue = RedisQueue::new(url).await?;
            let reclaimed = queue.recover_active().await?;
            if reclaimed > 0 {
                info!(reclaimed, "requeued jobs left in flight by a previous run");
            }
            Arc::new(queue)
        }
        None => {
            info!("Using in-process click queue");
            Arc::new(MemoryQueue::new())
        }
    };

    let geoip = GeoIpService::new(config.analytics.geoip_db_path.as_deref())?;
    if config.analytics.geoip_db_path.is_some() {
        info!("GeoIP database loaded");
    } else {
        info!("No GeoIP database configured, country attribution disabled");
    }

    // Analytics consumers
    let processor = Arc::new(ClickProcessor::new(
        Arc::clone(&storage),
        geoip,
        config.analytics.ip_hash_salt.clone(),
    ));
    let policy = RetryPolicy {
        max_attempts: config.queue.max_attempts,
        backoff_base_ms: config.queue.backoff_base_ms,
    };
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    for _ in 0..config.queue.workers {
        tokio::spawn(run_consumer(
            Arc::clone(&queue),
            Arc::clone(&processor),
            policy,
            shutdown_rx.clone(),
        ));
    }
    info!("Started {} analytics consumer(s)", config.queue.workers);

    // Routers
    let app_state = Arc::new(AppState {
        storage: Arc::clone(&storage),
        cache: Arc::clone(&cache),
        queue: Arc::clone(&queue),
        shortener: Shortener::new(Arc::clone(&storage), Arc::clone(&cache), config.code_length),
        stats: StatsAggregator::new(Arc::clone(&storage)),
        public_base_url: config.public_base_url.clone(),
    });
    let api_router = create_api_router(app_state);

    let redirect_state = Arc::new(RedirectState {
        resolver: Resolver::new(Arc::clone(&storage), Arc::clone(&cache)),
        queue: Arc::clone(&queue),
    });
    let redirect_router = create_redirect_router(redirect_state);

    // API server
    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("API server listening on http://{}", api_addr);

    // Redirect server
    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("Redirect server listening on http://{}", redirect_addr);

    tokio::try_join!(
        axum::serve(api_listener, api_router),
        axum::serve(
            redirect_listener,
            redirect_router.into_make_service_with_connect_info::<SocketAddr>(),
        ),
    )?;

    Ok(())
}
