//! Behavioral tests for the document store over the in-memory backend.

use proptest::prelude::*;
use serde_json::{json, Value};
use tabula::core::doc_id;
use tabula::{
    DeleteResult, Document, DocumentStore, InsertResult, MemoryKv, SaveOptions, SaveOutcome,
    SaveResult,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn value(doc: &Document) -> Value {
    Value::Object(doc.clone())
}

#[tokio::test]
async fn generated_ids_are_unique_and_reinsert_is_noop() -> anyhow::Result<()> {
    init_tracing();
    let store = DocumentStore::open_memory();

    let input: Vec<Value> = (0..50).map(|i| json!({"n": i})).collect();
    let result = store.insert(&input).await?;
    assert_eq!(result, InsertResult { n: 50, n_inserted: 50, ok: 1 });

    let stored = store.select_all().await?;
    let mut ids: Vec<&str> = stored.iter().filter_map(doc_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 50);

    // Re-inserting the stored documents (now carrying ids) writes nothing.
    let again = store.insert(&stored).await?;
    assert_eq!(again, InsertResult { n: 50, n_inserted: 0, ok: 1 });
    assert_eq!(store.select_all().await?.len(), 50);
    Ok(())
}

#[tokio::test]
async fn save_twice_modifies_then_does_nothing() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    store.insert(&json!({"id": "d", "v": 1})).await?;

    let doc = json!({"id": "d", "v": 2});
    let first = store.save(&doc, SaveOptions::default()).await?;
    let second = store.save(&doc, SaveOptions::default()).await?;

    assert_eq!(first, vec![SaveOutcome::Saved(SaveResult::modified())]);
    assert_eq!(second, vec![SaveOutcome::Saved(SaveResult::unchanged())]);
    Ok(())
}

#[tokio::test]
async fn save_merge_preserves_untouched_fields() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    store.insert(&json!({"id": "1", "a": 1, "b": 2})).await?;

    store.save(&json!({"id": "1", "b": 3}), SaveOptions::default()).await?;

    let stored = store.select(&json!({"id": "1"})).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(value(&stored[0]), json!({"id": "1", "a": 1, "b": 3}));
    Ok(())
}

#[tokio::test]
async fn save_auto_inserts_missing_documents() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    store.insert(&json!({"id": "old", "v": 1})).await?;

    let results = store
        .save(
            &json!([{"id": "old", "v": 2}, {"id": "new", "v": 1}, {"v": 9}]),
            SaveOptions::default(),
        )
        .await?;

    assert_eq!(
        results,
        vec![
            SaveOutcome::Saved(SaveResult::modified()),
            SaveOutcome::Inserted(InsertResult { n: 1, n_inserted: 1, ok: 1 }),
            SaveOutcome::Inserted(InsertResult { n: 1, n_inserted: 1, ok: 1 }),
        ]
    );
    assert_eq!(
        serde_json::to_value(&results)?,
        json!([
            {"n": 1, "nModified": 1, "ok": 1},
            {"n": 1, "nInserted": 1, "ok": 1},
            {"n": 1, "nInserted": 1, "ok": 1}
        ])
    );
    assert_eq!(store.select_all().await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn del_reports_missing_and_idless_documents() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    store.insert(&json!({"id": "keep"})).await?;

    let results = store
        .del(&json!([{"id": "nope"}, {"name": "no id"}, {"id": "keep"}]))
        .await?;
    assert_eq!(
        results,
        vec![
            DeleteResult { n: 1, n_deleted: 0, ok: 1 },
            DeleteResult { n: 1, n_deleted: 0, ok: 0 },
            DeleteResult { n: 1, n_deleted: 1, ok: 1 },
        ]
    );
    assert!(store.select_all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn del_all_with_empty_filter_clears_table() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let docs: Vec<Value> = (0..7).map(|i| json!({"i": i})).collect();
    store.insert(&docs).await?;

    let result = store.del_all(&json!({})).await?;
    assert_eq!(result, DeleteResult { n: 7, n_deleted: 7, ok: 1 });
    assert!(store.select_all().await?.is_empty());

    // Non-object filters match everything too.
    store.insert(&docs).await?;
    let result = store.del_all(&Value::Null).await?;
    assert_eq!(result.n_deleted, 7);
    Ok(())
}

#[tokio::test]
async fn del_all_with_filter_keeps_unmatched_half() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let docs: Vec<Value> = (0..10)
        .map(|i| json!({"id": format!("d{i}"), "even": i % 2 == 0}))
        .collect();
    store.insert(&docs).await?;

    let result = store.del_all(&json!({"even": true})).await?;
    assert_eq!(result, DeleteResult { n: 10, n_deleted: 5, ok: 1 });

    let rest = store.select(&json!({})).await?;
    assert_eq!(rest.len(), 5);
    assert!(rest.iter().all(|d| d["even"] == json!(false)));

    let none = store.del_all(&json!({"even": "maybe"})).await?;
    assert_eq!(none, DeleteResult { n: 5, n_deleted: 0, ok: 1 });
    assert_eq!(store.select_all().await?.len(), 5);
    Ok(())
}

#[tokio::test]
async fn insert_then_select_by_field() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let result = store.insert(&json!([{"a": 1}, {"a": 2}])).await?;
    assert_eq!(result, InsertResult { n: 2, n_inserted: 2, ok: 1 });

    let found = store.select(&json!({"a": 1})).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["a"], json!(1));
    Ok(())
}

#[tokio::test]
async fn duplicate_insert_keeps_first_value() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    store.insert(&json!({"id": "x", "v": 1})).await?;
    let second = store.insert(&json!({"id": "x", "v": 2})).await?;

    assert_eq!(second, InsertResult { n: 1, n_inserted: 0, ok: 1 });
    let stored = store.select(&json!({"id": "x"})).await?;
    assert_eq!(stored[0]["v"], json!(1));
    Ok(())
}

#[tokio::test]
async fn repeated_id_in_one_insert_sees_earlier_write() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let result = store
        .insert(&json!([{"id": "x", "v": 1}, {"id": "x", "v": 2}]))
        .await?;

    assert_eq!(result, InsertResult { n: 2, n_inserted: 1, ok: 1 });
    let stored = store.select_all().await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(value(&stored[0]), json!({"id": "x", "v": 1}));
    Ok(())
}

#[tokio::test]
async fn repeated_id_in_one_save_merges_into_earlier_write() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let out = store
        .save(
            &json!([{"id": "y", "v": 1}, {"id": "y", "w": 2}]),
            SaveOptions::default(),
        )
        .await?;

    assert_eq!(
        out,
        vec![
            SaveOutcome::Inserted(InsertResult { n: 1, n_inserted: 1, ok: 1 }),
            SaveOutcome::Saved(SaveResult::modified()),
        ]
    );
    let stored = store.select_all().await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(value(&stored[0]), json!({"id": "y", "v": 1, "w": 2}));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn saving_the_same_document_twice_is_idempotent(
        fields in prop::collection::btree_map("f_[a-z]{1,5}", -100i64..100, 1..5),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        runtime.block_on(async {
            let store = DocumentStore::open_memory();
            store.insert(&json!({"id": "p", "seed": true})).await.unwrap();

            let mut doc = serde_json::Map::new();
            doc.insert("id".into(), json!("p"));
            for (key, n) in &fields {
                doc.insert(key.clone(), json!(n));
            }

            let first = store.save(&doc, SaveOptions::default()).await.unwrap();
            let second = store.save(&doc, SaveOptions::default()).await.unwrap();
            assert_eq!(first, vec![SaveOutcome::Saved(SaveResult::modified())]);
            assert_eq!(second, vec![SaveOutcome::Saved(SaveResult::unchanged())]);
        });
    }
}

#[tokio::test]
async fn malformed_input_is_a_noop() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let (count, _sub) = {
        let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = std::sync::Arc::clone(&count);
        let sub = store.subscribe(move |_| {
            c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        (count, sub)
    };

    for bad in [json!(null), json!(3), json!("doc"), json!({}), json!([]), json!([1, {"a": 1}])] {
        assert_eq!(store.insert(&bad).await?, InsertResult::noop());
        assert!(store.save(&bad, SaveOptions::default()).await?.is_empty());
        assert!(store.del(&bad).await?.is_empty());
    }

    assert!(store.select_all().await?.is_empty());
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn select_filter_operators() -> anyhow::Result<()> {
    let store = DocumentStore::new(MemoryKv::new());
    store
        .insert(&json!([
            {"id": "a", "age": 31, "tags": ["x", "y"], "addr": {"city": "Oslo"}},
            {"id": "b", "age": 19, "tags": ["y"], "addr": {"city": "Rome"}},
            {"id": "c", "age": 45, "addr": {"city": "Oslo"}}
        ]))
        .await?;

    let ids = |docs: Vec<Document>| -> Vec<String> {
        docs.iter().filter_map(doc_id).map(str::to_string).collect()
    };

    assert_eq!(ids(store.select(&json!({"age": {"$gt": 30}})).await?), ["a", "c"]);
    assert_eq!(ids(store.select(&json!({"addr.city": "Oslo"})).await?), ["a", "c"]);
    assert_eq!(ids(store.select(&json!({"tags": "y"})).await?), ["a", "b"]);
    assert_eq!(ids(store.select(&json!({"tags": {"$exists": false}})).await?), ["c"]);
    assert_eq!(
        ids(store
            .select(&json!({"$or": [{"age": {"$lt": 20}}, {"id": "c"}]}))
            .await?),
        ["b", "c"]
    );
    Ok(())
}

#[derive(serde::Serialize)]
struct Order<'a> {
    id: &'a str,
    qty: u32,
}

#[tokio::test]
async fn typed_input_and_output() -> anyhow::Result<()> {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Stored {
        id: String,
        qty: u32,
    }

    let store = DocumentStore::open_memory();
    store
        .insert(&[Order { id: "o1", qty: 1 }, Order { id: "o2", qty: 5 }])
        .await?;
    store
        .save(&Order { id: "o1", qty: 2 }, SaveOptions::update_only())
        .await?;

    let orders: Vec<Stored> = store.select_as(&json!({"qty": {"$lte": 2}})).await?;
    assert_eq!(orders, vec![Stored { id: "o1".into(), qty: 2 }]);
    Ok(())
}
