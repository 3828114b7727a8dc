pub mod config;
pub mod connection;
pub mod job;
pub mod keys;
pub mod queue;
pub mod worker;

pub use config::QueueConfig;
pub use connection::RedisConnection;
pub use job::{Job, JobOptions};
pub use queue::JobQueue;
pub use worker::{JobHandler, Worker, WorkerConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
