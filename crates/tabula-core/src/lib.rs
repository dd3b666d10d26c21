//! # Tabula Core
//!
//! Pure primitives for Tabula: documents, identifiers, structural merge and
//! equality, filter queries and operation result records.
//!
//! This crate contains no I/O and no storage. Everything here is
//! computation over `serde_json` values.
//!
//! ## Key Types
//!
//! - [`Document`] - A JSON object carrying a string `id`
//! - [`Query`] - A compiled MongoDB-style filter
//! - [`InsertResult`], [`SaveResult`], [`DeleteResult`], [`SaveOutcome`] -
//!   outcome records returned by the store
//!
//! ## Merge semantics
//!
//! [`deep_merge`] merges objects recursively and replaces arrays and scalars
//! wholesale. See [`value`].

pub mod document;
pub mod error;
pub mod id;
pub mod query;
pub mod result;
pub mod value;

pub use document::{doc_id, ensure_id, from_document, normalize, to_document, Document, ID_FIELD};
pub use error::{CoreError, QueryError};
pub use id::{generate_id, is_valid_id};
pub use query::{is_constraining, Query};
pub use result::{DeleteResult, InsertResult, SaveOutcome, SaveResult};
pub use value::{deep_equal, deep_merge, maps_equal};
