use std::time::Duration;

/// HTTP and push-channel server settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    /// Delay before the initial stream snapshot, letting the pending
    /// write settle before it is read back.
    pub snapshot_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_enabled: true,
            snapshot_delay_ms: 300,
        }
    }
}

impl ApiConfig {
    /// `HOST` / `PORT` / `API_CORS_ENABLED` / `WS_SNAPSHOT_DELAY_MS`,
    /// falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.port),
            cors_enabled: std::env::var("API_CORS_ENABLED")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.cors_enabled),
            snapshot_delay_ms: std::env::var("WS_SNAPSHOT_DELAY_MS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.snapshot_delay_ms),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn snapshot_delay(&self) -> Duration {
        Duration::from_millis(self.snapshot_delay_ms)
    }
}
