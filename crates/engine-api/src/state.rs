use engine_core::OrderStore;
use engine_pipeline::ResourceManager;
use engine_registry::PushRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub registry: Arc<PushRegistry>,
    pub resources: ResourceManager,
    pub snapshot_delay: Duration,
}
