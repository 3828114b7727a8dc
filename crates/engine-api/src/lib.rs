pub mod config;
pub mod dto;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use server::ApiServer;
pub use state::AppState;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
