//! Binary entry point: wires up the database pool, cache, dispatcher,
//! background workers, and HTTP server from [`vas_gateway::AppConfig`],
//! then serves until Ctrl+C.
//!
//! Grounded on `payrix-webhooks.rs`'s `main`/`run_server`: a
//! `tracing_subscriber::registry()` with an `EnvFilter` set up first,
//! then a state struct built once and handed to the server's `run`.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vas_gateway::auth::AuthState;
use vas_gateway::cache::{Cache, InMemoryCache, RedisCache};
use vas_gateway::coordinator::Coordinator;
use vas_gateway::dispatcher::Dispatcher;
use vas_gateway::http::{self, AppState};
use vas_gateway::queue::{InProcessQueue, RequeryTask};
use vas_gateway::workers::{RequeryWorker, TimeoutSweeper};
use vas_gateway::AppConfig;

/// Channel capacity for the in-process requery queue: how many scheduled
/// follow-ups may be in flight (delay timer running or awaiting a
/// handler) at once.
const REQUERY_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let cache: Arc<dyn Cache> = match &config.redis_url {
        Some(redis_url) => Arc::new(RedisCache::connect(redis_url).await?),
        None => {
            tracing::warn!("REDIS_URL unset, falling back to single-instance in-memory cache");
            Arc::new(InMemoryCache::new())
        }
    };

    let dispatcher = Arc::new(Dispatcher::new());
    let (requery_queue, requery_receiver) = InProcessQueue::<RequeryTask>::new(REQUERY_QUEUE_CAPACITY);
    let requery_queue: Arc<dyn vas_gateway::queue::TaskQueue<RequeryTask>> = Arc::new(requery_queue);

    let coordinator = Arc::new(Coordinator::new(
        pool.clone(),
        cache.clone(),
        dispatcher.clone(),
        requery_queue.clone(),
    ));

    let requery_worker = Arc::new(RequeryWorker::new(
        pool.clone(),
        cache.clone(),
        dispatcher.clone(),
        requery_queue.clone(),
    ));
    tokio::spawn(requery_worker.run(requery_receiver));

    let sweeper = Arc::new(TimeoutSweeper::new(pool.clone()));
    sweeper.clone().spawn_loop();

    let auth = Arc::new(AuthState { pool: pool.clone(), cache: cache.clone() });

    let state = Arc::new(AppState {
        pool,
        cache,
        coordinator,
        auth,
        sweeper,
        secret_key: config.secret_key,
    });

    http::serve(state, config.bind_addr, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
}
