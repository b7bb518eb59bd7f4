use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tonic::transport::Endpoint;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orders_service::config::Config;
use orders_service::domain::order::{OrderWorkflow, Pagination};
use orders_service::metrics::{start_metrics_server, Metrics};
use orders_service::rpc::GrpcProductValidator;
use orders_service::store::PgOrderStore;
use orders_service::utils::{retry_with_backoff, RetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orders_service=debug")),
        )
        .init();

    tracing::info!("Starting orders service");

    let config = Config::from_env()?;

    // === 1. Connect PostgreSQL (process-wide pool) ===
    // The database may come up after us; only the initial connection retries.
    tracing::info!("Connecting to PostgreSQL...");
    let database_url = config.database_url.clone();
    let max_connections = config.db_max_connections;
    let pool = retry_with_backoff(RetryConfig::default(), |_attempt| {
        let url = database_url.clone();
        async move {
            PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(&url)
                .await
        }
    })
    .await
    .map_err(|e| anyhow::anyhow!("could not connect to PostgreSQL: {e}"))?;

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database connected");

    // === 2. Product service channel (long-lived, lazily connecting) ===
    let channel = Endpoint::from_shared(config.product_service_url.clone())?.connect_lazy();
    let products = Arc::new(GrpcProductValidator::new(channel));
    tracing::info!(url = %config.product_service_url, "Product service client ready");

    // === 3. Metrics + HTTP server on a dedicated runtime thread ===
    let metrics = Arc::new(Metrics::new()?);
    let registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            if let Err(e) = start_metrics_server(registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 4. Assemble the order workflow ===
    let store = Arc::new(PgOrderStore::new(pool.clone()));
    let workflow = Arc::new(OrderWorkflow::new(store, products, metrics));

    // Startup probe: one cheap read proves the store wiring end to end.
    let page = workflow
        .find_all(Pagination {
            status: None,
            page: 1,
            limit: 1,
        })
        .await?;
    tracing::info!(total_orders = page.meta.total, "Order workflow ready");

    // The inbound command transport owns request dispatch; this process
    // stays up serving it until asked to stop.
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    pool.close().await;

    Ok(())
}
