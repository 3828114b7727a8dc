pub mod config;
pub mod counters;
pub mod gauges;
pub mod server;

pub use config::MetricsConfig;
pub use server::MetricsServer;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Server error: {0}")]
    Server(String),

    #[error("Recorder error: {0}")]
    Recorder(String),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
