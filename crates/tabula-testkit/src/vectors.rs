//! Filter vectors: known filters with the ids they must select.
//!
//! Every vector runs against [`vector_table`]. Expected ids are listed in
//! key order, which is the order `select` returns.

use serde_json::{json, Value};
use tabula_core::{doc_id, normalize, Document, Query};

/// A filter vector.
#[derive(Debug, Clone)]
pub struct FilterVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The filter, as JSON text.
    pub filter: &'static str,
    /// Ids the filter selects from [`vector_table`].
    pub expected: &'static [&'static str],
}

/// The table every vector is evaluated against.
pub fn vector_table() -> Vec<Document> {
    let table = json!([
        {"id": "ada", "age": 36, "langs": ["en", "fr"], "addr": {"city": "London", "zip": "N1"}, "admin": true},
        {"id": "bob", "age": 17, "langs": ["en"], "addr": {"city": "Leeds"}, "admin": false},
        {"id": "cyd", "age": 52.5, "langs": [], "addr": {"city": "London"}},
        {"id": "dee", "age": "unknown", "langs": ["de", "en", "fr"], "pets": [{"kind": "cat", "age": 3}, {"kind": "dog", "age": 9}]},
        {"id": "eve", "age": null, "addr": null}
    ]);
    normalize(&table).unwrap_or_default()
}

/// Get all filter vectors.
pub fn all_vectors() -> Vec<FilterVector> {
    vec![
        FilterVector { name: "empty filter", filter: "{}", expected: &["ada", "bob", "cyd", "dee", "eve"] },
        FilterVector { name: "equality", filter: r#"{"age": 17}"#, expected: &["bob"] },
        FilterVector { name: "int equals float", filter: r#"{"age": 36.0}"#, expected: &["ada"] },
        FilterVector { name: "null matches missing", filter: r#"{"admin": null}"#, expected: &["cyd", "dee", "eve"] },
        FilterVector { name: "array contains", filter: r#"{"langs": "fr"}"#, expected: &["ada", "dee"] },
        FilterVector { name: "array equals", filter: r#"{"langs": ["en"]}"#, expected: &["bob"] },
        FilterVector { name: "dot path", filter: r#"{"addr.city": "London"}"#, expected: &["ada", "cyd"] },
        FilterVector { name: "dot path into array", filter: r#"{"pets.kind": "dog"}"#, expected: &["dee"] },
        FilterVector { name: "array index", filter: r#"{"langs.0": "de"}"#, expected: &["dee"] },
        FilterVector { name: "gt skips other types", filter: r#"{"age": {"$gt": 30}}"#, expected: &["ada", "cyd"] },
        FilterVector { name: "range", filter: r#"{"age": {"$gte": 17, "$lt": 40}}"#, expected: &["ada", "bob"] },
        FilterVector { name: "string compare", filter: r#"{"age": {"$gte": "a"}}"#, expected: &["dee"] },
        FilterVector { name: "ne", filter: r#"{"admin": {"$ne": true}}"#, expected: &["bob", "cyd", "dee", "eve"] },
        FilterVector { name: "in", filter: r#"{"id": {"$in": ["bob", "eve", "zed"]}}"#, expected: &["bob", "eve"] },
        FilterVector { name: "nin", filter: r#"{"langs": {"$nin": ["en"]}}"#, expected: &["cyd", "eve"] },
        FilterVector { name: "exists", filter: r#"{"addr": {"$exists": true}}"#, expected: &["ada", "bob", "cyd", "eve"] },
        FilterVector { name: "not exists", filter: r#"{"pets": {"$exists": false}}"#, expected: &["ada", "bob", "cyd", "eve"] },
        FilterVector { name: "type", filter: r#"{"age": {"$type": "string"}}"#, expected: &["dee"] },
        FilterVector { name: "size", filter: r#"{"langs": {"$size": 0}}"#, expected: &["cyd"] },
        FilterVector { name: "all", filter: r#"{"langs": {"$all": ["fr", "en"]}}"#, expected: &["ada", "dee"] },
        FilterVector { name: "elemMatch document", filter: r#"{"pets": {"$elemMatch": {"kind": "cat", "age": {"$lt": 5}}}}"#, expected: &["dee"] },
        FilterVector { name: "not", filter: r#"{"age": {"$not": {"$gt": 20}}}"#, expected: &["bob", "dee", "eve"] },
        FilterVector { name: "or", filter: r#"{"$or": [{"age": 17}, {"addr.zip": "N1"}]}"#, expected: &["ada", "bob"] },
        FilterVector { name: "and", filter: r#"{"$and": [{"addr.city": "London"}, {"admin": true}]}"#, expected: &["ada"] },
        FilterVector { name: "nor", filter: r#"{"$nor": [{"admin": true}, {"addr": null}]}"#, expected: &["bob", "cyd"] },
        FilterVector { name: "implicit and", filter: r#"{"addr.city": "London", "langs": "en"}"#, expected: &["ada"] },
    ]
}

/// Evaluate one vector and return the selected ids.
pub fn run_vector(vector: &FilterVector) -> anyhow::Result<Vec<String>> {
    let filter: Value = serde_json::from_str(vector.filter)?;
    let query = Query::compile(&filter)?;
    Ok(query
        .find(&vector_table())
        .iter()
        .filter_map(doc_id)
        .map(str::to_string)
        .collect())
}

/// Verify all vectors, returning the names of the ones that fail.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .iter()
        .filter(|v| match run_vector(v) {
            Ok(ids) => ids != v.expected,
            Err(_) => true,
        })
        .map(|v| v.name)
        .collect()
}
