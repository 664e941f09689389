//! Errors raised while loading configuration and opening storage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Startup failure of a scoring service
#[derive(Error, Debug)]
pub enum Error {
    /// Opening the pool or creating the schema failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or database file could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unreadable or not valid TOML
    #[error("Configuration error: {0}")]
    Config(String),
}
