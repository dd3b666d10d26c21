//! Error types for the document store.

use tabula_core::{CoreError, QueryError};
use tabula_kv::KvError;
use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Backend failures are passed through untouched, so callers can inspect the
/// underlying [`KvError`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend error.
    #[error(transparent)]
    Kv(#[from] KvError),

    /// The filter could not be compiled.
    #[error("can not select by filter {filter}: {source}")]
    Query {
        filter: String,
        #[source]
        source: QueryError,
    },

    /// Caller input could not be turned into JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document conversion error.
    #[error("document error: {0}")]
    Document(#[from] CoreError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
