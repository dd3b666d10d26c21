//! Error types for Tabula core.

use thiserror::Error;

/// Core errors that can occur while handling documents.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::EncodingError(e.to_string())
    }
}

/// Errors raised while compiling a filter specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("filter must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("operator {operator} expects {expected}")]
    InvalidOperand {
        operator: String,
        expected: &'static str,
    },

    #[error("unknown type name for $type: {0}")]
    UnknownType(String),
}
