//! Error types for the sharedchat library.
//!
//! This module provides custom error types using `thiserror` for better error
//! handling and more specific error messages throughout the application.

use thiserror::Error;

/// Errors that can occur in the sharedchat application.
#[derive(Error, Debug)]
pub enum SharedChatError {
    /// Database-related errors; fatal to the operation, the application keeps running
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Storage pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Malformed or missing import data; reported per file, never aborts a batch
    #[error("Import error: {0}")]
    Import(String),

    /// Rendering failures; defensive fallbacks mean these should not occur in practice
    #[error("Render error: {0}")]
    Render(String),

    /// Title-suggestion collaborator failures; reported, skips one item
    #[error("Title suggestion error: {0}")]
    Collaborator(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with SharedChatError
pub type Result<T> = std::result::Result<T, SharedChatError>;

impl From<reqwest::Error> for SharedChatError {
    fn from(err: reqwest::Error) -> Self {
        SharedChatError::Collaborator(err.to_string())
    }
}
