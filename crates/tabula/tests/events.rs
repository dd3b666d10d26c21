//! Change notification through the store.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tabula::{ChangeEvent, ChangeResult, DocumentStore, Operation, SaveOptions};

type Log = Arc<Mutex<Vec<ChangeEvent>>>;

fn record(store: &DocumentStore<tabula::MemoryKv>) -> (Log, tabula::Subscription) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let sub = store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    (log, sub)
}

fn operations(log: &Log) -> Vec<Operation> {
    log.lock().unwrap().iter().map(ChangeEvent::operation).collect()
}

#[tokio::test]
async fn every_mutation_emits_once() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let (log, _sub) = record(&store);

    store.insert(&json!({"id": "a", "v": 1})).await?;
    store.save(&json!({"id": "a", "v": 2}), SaveOptions::default()).await?;
    store.del(&json!({"id": "a"})).await?;
    store.del_all(&json!({})).await?;

    assert_eq!(
        operations(&log),
        vec![Operation::Insert, Operation::Save, Operation::Del, Operation::DelAll]
    );

    let events = log.lock().unwrap();
    let inserted = events[0].documents().unwrap();
    assert_eq!(inserted[0]["v"], json!(1));
    assert!(events[3].documents().is_none());
    Ok(())
}

#[tokio::test]
async fn insert_event_carries_generated_ids() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let (log, _sub) = record(&store);

    store.insert(&json!([{"a": 1}, {"a": 2}])).await?;

    let events = log.lock().unwrap();
    let docs = events[0].documents().unwrap();
    let stored = store.select_all().await?;
    assert_eq!(docs.len(), 2);
    for doc in docs {
        assert!(stored.contains(doc));
    }
    Ok(())
}

#[tokio::test]
async fn auto_insert_emits_insert_before_save() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let (log, _sub) = record(&store);

    store.save(&json!({"id": "n", "v": 1}), SaveOptions::default()).await?;

    assert_eq!(operations(&log), vec![Operation::Insert, Operation::Save]);
    let events = log.lock().unwrap();
    match events[1].result() {
        ChangeResult::Save(results) => assert_eq!(results[0].written(), 1),
        other => panic!("unexpected result {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn failed_call_emits_nothing() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    store.insert(&json!({"id": "a"})).await?;
    let (log, _sub) = record(&store);

    assert!(store.del_all(&json!({"$where": "1"})).await.is_err());
    assert!(store.select(&json!({"a": {"$near": 1}})).await.is_err());

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(store.select_all().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unsubscribed_callback_is_not_called() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let (kept, _kept_sub) = record(&store);
    let (dropped, sub) = record(&store);

    store.insert(&json!({"id": "1"})).await?;
    assert!(sub.unsubscribe());
    store.insert(&json!({"id": "2"})).await?;

    assert_eq!(kept.lock().unwrap().len(), 2);
    assert_eq!(dropped.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn async_receivers_see_events_in_order() -> anyhow::Result<()> {
    let store = DocumentStore::open_memory();
    let mut rx = store.changes();

    store.insert(&json!({"id": "1"})).await?;
    store.del(&json!({"id": "1"})).await?;

    assert_eq!(rx.recv().await?.operation(), Operation::Insert);
    assert_eq!(rx.recv().await?.operation(), Operation::Del);
    Ok(())
}
