use crate::config::MetricsConfig;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

/// Serves the Prometheus scrape endpoint and owns the recorder it renders
/// from.
pub struct MetricsServer {
    config: MetricsConfig,
}

impl MetricsServer {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Install the recorder, register metric descriptions and serve
    /// `/metrics` until the process exits.
    pub async fn run(self) -> crate::Result<()> {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| crate::MetricsError::Recorder(e.to_string()))?;

        crate::counters::init();
        crate::gauges::init();

        let addr = self.config.address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::MetricsError::Server(e.to_string()))?;
        info!(address = %addr, "Metrics endpoint listening");

        let app = Router::new()
            .route("/metrics", get(move || render(handle.clone())))
            .route("/health", get(|| async { "OK" }));

        axum::serve(listener, app)
            .await
            .map_err(|e| crate::MetricsError::Server(e.to_string()))?;

        Ok(())
    }
}

async fn render(handle: PrometheusHandle) -> String {
    handle.render()
}
