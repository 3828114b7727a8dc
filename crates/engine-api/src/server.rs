use crate::config::ApiConfig;
use crate::routes::create_router;
use crate::state::AppState;
use tracing::info;

/// HTTP and push-channel server
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the server
    pub async fn run(self) -> crate::Result<()> {
        let addr = self.config.address();
        let app = create_router(self.state, self.config.cors_enabled);

        info!(address = %addr, "Starting API server");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::ApiError::Server(e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| crate::ApiError::Server(e.to_string()))?;

        Ok(())
    }
}
