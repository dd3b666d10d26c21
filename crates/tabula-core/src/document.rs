//! Documents and input normalization.
//!
//! A [`Document`] is a JSON object with a string `id` field. Callers hand the
//! store arbitrary JSON; [`normalize`] decides whether that input is a usable
//! document set and produces owned copies, so the caller's value is never
//! touched.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::id::{generate_id, is_valid_id};

/// A stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Name of the identifier field.
pub const ID_FIELD: &str = "id";

/// Get the document id, if it is a non-empty string.
pub fn doc_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| is_valid_id(id))
}

/// Give `doc` a generated id unless it already carries a valid one.
///
/// Returns the document's id.
pub fn ensure_id(doc: &mut Document) -> String {
    if let Some(id) = doc_id(doc) {
        return id.to_string();
    }
    let id = generate_id();
    doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    id
}

/// Normalize caller input into an owned list of documents.
///
/// Accepted shapes:
/// - a non-empty object, which becomes a one-element list;
/// - a non-empty array whose elements are all objects.
///
/// Anything else (scalars, null, `{}`, `[]`, arrays holding non-objects)
/// returns `None`. The store treats that as a no-op, not an error.
pub fn normalize(input: &Value) -> Option<Vec<Document>> {
    match input {
        Value::Object(map) if !map.is_empty() => Some(vec![map.clone()]),
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_object().cloned())
            .collect(),
        _ => None,
    }
}

/// Serialize any value into a JSON object.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<Document, CoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(CoreError::NotAnObject),
    }
}

/// Deserialize a stored document into a typed value.
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T, CoreError> {
    serde_json::from_value(Value::Object(doc.clone()))
        .map_err(|e| CoreError::DecodingError(e.to_string()))
}
