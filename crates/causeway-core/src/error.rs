use thiserror::Error;

/// Core error type for causeway operations.
#[derive(Error, Debug)]
pub enum CausewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration '{name}' failed: {message}")]
    Migration { name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Result type alias using CausewayError.
pub type Result<T> = std::result::Result<T, CausewayError>;
