//! Error types for the key-value backends.

use thiserror::Error;

/// Errors that can occur during backend operations.
#[derive(Debug, Error)]
pub enum KvError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Document encoding/decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Key not found. Reserved for backends whose `get` signals absence as
    /// an error; the bundled backends return `Ok(None)` instead.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The backend is closed (or never finished opening).
    #[error("backend is closed")]
    Closed,

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KvError {
    /// True for the "absent key" condition, which callers treat as a normal
    /// lookup miss rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound(_))
    }
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, KvError>;
