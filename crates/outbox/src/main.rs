//! Outbox relay entry point.

use outbox::{
    InMemoryOutboxStore, LoggingPublisher, OutboxRelay, PostgresOutboxStore, RelayConfig,
    RelayOptions,
};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(%err, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RelayConfig::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = RelayOptions::from(&config);
    tracing::info!(
        batch_size = options.batch_size,
        max_attempts = options.max_attempts,
        poll_interval_ms = options.poll_interval.as_millis() as u64,
        "starting outbox relay"
    );

    // 2. Pick the store and run until shutdown
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            let store = PostgresOutboxStore::new(pool);
            store.run_migrations().await?;

            OutboxRelay::with_options(store, LoggingPublisher, options)
                .run(shutdown_signal())
                .await?;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, relaying from an empty in-memory store");
            OutboxRelay::with_options(InMemoryOutboxStore::new(), LoggingPublisher, options)
                .run(shutdown_signal())
                .await?;
        }
    }

    tracing::info!("relay shut down gracefully");
    Ok(())
}
