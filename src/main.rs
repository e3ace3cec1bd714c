use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orderstream::cache::{Cache, MemoryCache, RedisCache};
use orderstream::config::Config;
use orderstream::http;
use orderstream::messaging::{
    DeadLetterConsumer, DeadLetterRouter, KafkaPublisher, MessagePublisher, OrderConsumer,
    RetryConsumer, RetryRouter,
};
use orderstream::metrics::Metrics;
use orderstream::service::OrderService;
use orderstream::shutdown::Shutdown;
use orderstream::storage::{OrderStore, PgOrderStore};
use orderstream::utils::BackoffPolicy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orderstream=debug")),
        )
        .init();

    tracing::info!("🚀 Starting orderstream");

    let config = Config::from_env()?;

    // === 1. Postgres: the system of record ===
    tracing::info!("Connecting to Postgres...");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await?;
    let pg = PgOrderStore::new(pool);
    pg.ensure_schema().await?;
    let store: Arc<dyn OrderStore> = Arc::new(pg);

    // === 2. Cache: Redis when configured, in-process otherwise ===
    let cache: Arc<dyn Cache> = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url).await?),
        None => {
            tracing::info!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    // === 3. Order service, cache warmed from the store ===
    let service = Arc::new(OrderService::new(store.clone(), cache, config.cache_ttl));
    let warmed = service.warm_up().await?;
    tracing::info!(orders = warmed, "🔥 Cache warmed from store");

    // === 4. Metrics registry ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    // === 5. Kafka publisher and failure routers ===
    let publisher: Arc<dyn MessagePublisher> =
        Arc::new(KafkaPublisher::new(&config.kafka_brokers)?);
    let retry_router = RetryRouter::new(publisher.clone(), config.retry_topic.clone());
    let dlq_router = DeadLetterRouter::new(publisher.clone(), config.dlq_topic.clone());

    // === 6. Consumers: an unreachable broker fails startup ===
    let orders = OrderConsumer::connect(
        &config,
        service.clone(),
        retry_router,
        dlq_router,
        metrics.clone(),
    )?;
    let relay = RetryConsumer::connect(
        &config,
        publisher.clone(),
        BackoffPolicy::new(config.retry_backoff_base, config.retry_backoff_max),
        metrics.clone(),
    )?;
    let dead_letters = DeadLetterConsumer::connect(&config, store.clone(), metrics.clone())?;

    // === 7. Run everything until a signal arrives ===
    let shutdown = Shutdown::new();
    let workers = vec![
        tokio::spawn(orders.run(shutdown.listener())),
        tokio::spawn(relay.run(shutdown.listener())),
        tokio::spawn(dead_letters.run(shutdown.listener())),
    ];

    let server = http::start_http_server(
        &config.http_addr,
        service.clone(),
        metrics.clone(),
        config.shutdown_grace,
    )?;
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    shutdown.wait_for_signal().await;

    // Workers finish their in-flight message before the HTTP server drains.
    for worker in workers {
        if let Err(error) = worker.await {
            tracing::error!(%error, "Worker task panicked");
        }
    }
    server_handle.stop(true).await;
    server_task.await??;

    tracing::info!("👋 Orderstream stopped");
    Ok(())
}
