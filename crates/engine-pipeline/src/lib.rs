pub mod config;
pub mod delivery;
pub mod execution;
pub mod lifecycle;
pub mod publisher;
pub mod resources;
pub mod routes;

pub use config::PipelineConfig;
pub use delivery::DeliveryHandler;
pub use execution::{ExecuteJob, ExecutionHandler};
pub use lifecycle::OrderLifecycle;
pub use publisher::EventPublisher;
pub use resources::ResourceManager;
pub use routes::RouteTable;
