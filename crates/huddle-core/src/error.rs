//! Unified error types for the draft core

use thiserror::Error;

/// Unified error type for draft operations
#[derive(Error, Debug)]
pub enum DraftError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Player data errors
    #[error("Player data error: {0}")]
    PlayerData(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Team not found: {0}")]
    TeamNotFound(String),

    // Invariant violations - these indicate a bug, never expected at runtime
    #[error("Draft integrity violation: {0}")]
    Integrity(String),

    // Run control
    #[error("Draft cancelled before pick {0}")]
    Cancelled(u32),

    // Recorder errors
    #[error("Recorder error: {0}")]
    Recorder(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl DraftError {
    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Integrity(_) | Self::Cancelled(_))
    }
}

/// Result type alias using DraftError
pub type Result<T> = std::result::Result<T, DraftError>;
