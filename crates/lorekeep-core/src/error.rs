//! Error types for Lorekeep

use thiserror::Error;

/// Result type alias using Lorekeep's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Lorekeep error types with helpful messages
#[derive(Error, Debug)]
pub enum Error {
    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Text generation error: {0}. Check the generation endpoint with `lorekeep doctor`.")]
    GenerationError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    // Store errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Graph store error: {0}")]
    StoreError(String),

    #[error("Snapshot error: {0}")]
    SnapshotError(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "E100",
            Self::GenerationError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::DatabaseError(_) => "E400",
            Self::StoreError(_) => "E401",
            Self::SnapshotError(_) => "E402",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }
}
