pub mod config;
pub mod model;
pub mod pool;
pub mod repository;
pub mod store;

pub use config::DatabaseConfig;
pub use pool::DatabasePool;
pub use store::PgOrderStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Corrupt row for order {0}: {1}")]
    CorruptRow(uuid::Uuid, String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Query(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::Migration(err.to_string())
    }
}

impl From<DatabaseError> for engine_core::EngineError {
    fn from(err: DatabaseError) -> Self {
        engine_core::EngineError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
