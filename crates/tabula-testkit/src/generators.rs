//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};

use tabula_core::{Document, ID_FIELD};

/// Generate a JSON scalar.
pub fn scalar() -> impl Strategy<Value = Value> + Clone {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(Value::from),
        (-1000.0f64..1000.0).prop_map(|f| Number::from_f64(f).map_or(Value::Null, Value::Number)),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

/// Generate a field name. Never starts with `$` and never contains `.`.
pub fn field_name() -> impl Strategy<Value = String> + Clone {
    "[a-z][a-z0-9_]{0,7}".prop_map(String::from)
}

/// Generate an arbitrary JSON value, nesting up to `depth` levels.
pub fn json_value(depth: u32) -> impl Strategy<Value = Value> {
    scalar().prop_recursive(depth, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate a document id.
pub fn doc_id() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}".prop_map(String::from)
}

/// Generate a non-empty document without an `id` field.
pub fn document() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name(), json_value(2), 1..6).prop_map(|m| {
        m.into_iter()
            .filter(|(k, _)| k != ID_FIELD)
            .chain(std::iter::once(("kind".to_string(), Value::from("doc"))))
            .collect::<Map<String, Value>>()
    })
}

/// Generate a document carrying the given id.
pub fn document_with_id(id: String) -> impl Strategy<Value = Document> {
    document().prop_map(move |mut doc| {
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        doc
    })
}

/// Generate a table of documents with distinct ids.
pub fn table(max_len: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::btree_set(doc_id(), 0..=max_len).prop_flat_map(|ids| {
        ids.into_iter()
            .map(document_with_id)
            .collect::<Vec<_>>()
    })
}

/// Generate a filter over top-level fields, using equality, comparison and
/// existence operators, optionally combined with `$or`.
pub fn filter() -> impl Strategy<Value = Value> {
    let clause = (field_name(), scalar(), 0..5u8).prop_map(|(field, v, op)| {
        let cond = match op {
            0 => v,
            1 => serde_json::json!({ "$ne": v }),
            2 => serde_json::json!({ "$gt": v }),
            3 => serde_json::json!({ "$lte": v }),
            _ => serde_json::json!({ "$exists": true }),
        };
        let mut m = Map::new();
        m.insert(field, cond);
        Value::Object(m)
    });

    prop_oneof![
        clause.clone(),
        prop::collection::vec(clause, 1..4).prop_map(|cs| serde_json::json!({ "$or": cs })),
    ]
}
