//! Pursue API server binary

use std::net::SocketAddr;

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use pursue_api::{build_router, AppState, Config, Storage};
use pursue_db::{MemoryStore, PoolOptions, Repositories};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("pursue_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pursue API");

    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        storage = ?config.storage,
        "Configuration loaded"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let repos = match config.storage {
        Storage::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for postgres storage")?;
            let options = PoolOptions {
                max_connections: config.db_max_connections,
                ..PoolOptions::default()
            };
            let pool = pursue_db::create_pool_with_options(url, &options).await?;
            tracing::info!("Database pool created");

            if config.run_migrations {
                pursue_db::run_migrations(&pool).await?;
                tracing::info!("Migrations applied");
            }
            Repositories::postgres(pool)
        }
        Storage::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Repositories::in_memory(MemoryStore::new())
        }
    };

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(repos, config);
    let app = build_router(state, metrics_handle);

    tracing::info!("HTTP server listening on {}", http_addr);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Most operations are a handful of queries
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("pursue_operation_duration_seconds".to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    metrics::describe_counter!(
        "pursue_groups_created_total",
        "Groups created, by kind (regular or challenge)"
    );
    metrics::describe_counter!(
        "pursue_downgrades_resolved_total",
        "Over-limit accounts resolved through group selection"
    );
    metrics::describe_counter!(
        "pursue_challenge_transitions_total",
        "Challenge status transitions by target status"
    );
    metrics::describe_counter!(
        "pursue_progress_logged_total",
        "Progress entries logged"
    );
    metrics::describe_counter!(
        "pursue_subscriptions_purchased_total",
        "Premium purchases by product"
    );
    metrics::describe_histogram!(
        "pursue_operation_duration_seconds",
        "Handler latency in seconds by operation and result"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
