use engine_api::{ApiConfig, ApiServer, AppState};
use engine_db::{DatabaseConfig, DatabasePool, PgOrderStore};
use engine_dex::{SimulatedChain, SimulatedRouter};
use engine_metrics::{MetricsConfig, MetricsServer};
use engine_pipeline::{
    DeliveryHandler, EventPublisher, ExecutionHandler, OrderLifecycle, PipelineConfig,
    ResourceManager, RouteTable,
};
use engine_queue::{QueueConfig, RedisConnection};
use engine_registry::PushRegistry;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("engine_pipeline=info".parse()?)
                .add_directive("engine_queue=info".parse()?),
        )
        .init();

    info!("Swap execution engine starting...");

    // Database
    let db_config = DatabaseConfig::from_env();
    let db_pool = match DatabasePool::connect(&db_config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };
    if let Err(e) = db_pool.migrate().await {
        error!(error = %e, "Failed to run database migrations");
        std::process::exit(1);
    }
    info!("Database connected and migrations applied");

    // Queue substrate reachability check; per-order connections are opened
    // on demand.
    let queue_config = QueueConfig::from_env();
    match RedisConnection::new(queue_config.clone()).await {
        Ok(conn) => {
            if let Err(e) = conn.health_check().await {
                error!(error = %e, "Queue substrate health check failed");
                std::process::exit(1);
            }
            info!("Queue substrate reachable");
        }
        Err(e) => {
            error!(error = %e, "Failed to connect to queue substrate");
            std::process::exit(1);
        }
    }

    let pipeline_config = PipelineConfig::from_env();
    info!(
        execute_concurrency = pipeline_config.execute_concurrency,
        delivery_concurrency = pipeline_config.delivery_concurrency,
        idle_timeout_secs = pipeline_config.idle_timeout.as_secs(),
        "Pipeline configuration"
    );

    // Components; constructed once and handed into handlers explicitly.
    let store: Arc<PgOrderStore> = Arc::new(PgOrderStore::new(db_pool.clone()));
    let registry = Arc::new(PushRegistry::new(SUBSCRIBER_CHANNEL_CAPACITY));
    let routes = Arc::new(RouteTable::new());

    let publisher = Arc::new(EventPublisher::new(
        routes.clone(),
        pipeline_config.publish_timeout,
    ));
    let router = Arc::new(SimulatedRouter::new());
    let chain = Arc::new(SimulatedChain::new());

    let lifecycle = Arc::new(OrderLifecycle::new(
        store.clone(),
        router,
        chain,
        publisher,
        pipeline_config.confirmation_timeout,
    ));

    let resources = ResourceManager::new(
        queue_config,
        pipeline_config,
        routes,
        registry.clone(),
        Arc::new(ExecutionHandler::new(lifecycle)),
        Arc::new(DeliveryHandler::new(registry.clone())),
    );

    // Metrics server (if enabled)
    if std::env::var("METRICS_PORT").is_ok() || std::env::var("METRICS_ENABLED").is_ok() {
        let metrics_server = MetricsServer::new(MetricsConfig::from_env());
        tokio::spawn(async move {
            if let Err(e) = metrics_server.run().await {
                error!(error = %e, "Metrics server error");
            }
        });
        info!("Metrics server started");
    }

    // API server
    let api_config = ApiConfig::from_env();
    let app_state = AppState {
        store,
        registry,
        resources: resources.clone(),
        snapshot_delay: api_config.snapshot_delay(),
    };
    let api_server = ApiServer::new(api_config, app_state);
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run().await {
            error!(error = %e, "API server error");
        }
    });

    // Run until Ctrl+C
    tokio::signal::ctrl_c().await.ok();
    info!("Shutdown signal received (Ctrl+C)");

    api_task.abort();
    resources.shutdown_all().await;
    db_pool.close().await;

    info!("Swap execution engine shutdown complete");
    Ok(())
}
