//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tabula::{ChangeEvent, DocumentStore, MemoryKv, Operation, SqliteKv, StoreConfig, Subscription};
use tempfile::TempDir;

/// A memory-backed store that records every change event.
pub struct TestFixture {
    pub store: DocumentStore<MemoryKv>,
    events: Arc<Mutex<Vec<ChangeEvent>>>,
    _subscription: Subscription,
}

impl TestFixture {
    /// Create a fixture over an empty table.
    pub fn new() -> Self {
        let store = DocumentStore::open_memory();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = store.subscribe(move |event| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone())
        });
        Self {
            store,
            events,
            _subscription: subscription,
        }
    }

    /// Create a fixture pre-filled with `count` documents.
    ///
    /// Documents get ids `doc-0000`, `doc-0001`, ... and deterministic
    /// fields derived from `seed`. Seeding does not show up in
    /// [`TestFixture::events`].
    pub async fn seeded(count: usize, seed: u64) -> anyhow::Result<Self> {
        let fixture = Self::new();
        fixture.store.insert(&sample_documents(count, seed)).await?;
        fixture.clear_events();
        Ok(fixture)
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Operations recorded so far, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.events().iter().map(ChangeEvent::operation).collect()
    }

    pub fn clear_events(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A SQLite-backed store in a temporary directory.
///
/// The directory is removed when the fixture is dropped.
pub struct DiskFixture {
    pub store: DocumentStore<SqliteKv>,
    pub config: StoreConfig,
    dir: TempDir,
}

impl DiskFixture {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = StoreConfig::new()
            .url(dir.path().to_string_lossy())
            .db("testkit")
            .cl("docs");
        let store = DocumentStore::open(&config)?;
        Ok(Self { store, config, dir })
    }

    /// Close the store and open the same table again.
    pub fn reopen(self) -> anyhow::Result<Self> {
        let Self { store, config, dir } = self;
        store.kv().close()?;
        drop(store);
        let store = DocumentStore::open(&config)?;
        Ok(Self { store, config, dir })
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

/// Deterministic sample documents with ids `doc-0000` onwards.
pub fn sample_documents(count: usize, seed: u64) -> Vec<Value> {
    const CITIES: [&str; 4] = ["Oslo", "Rome", "Lima", "Pune"];
    const TAGS: [&str; 5] = ["red", "green", "blue", "new", "sale"];

    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let tags: Vec<&str> = TAGS
                .iter()
                .copied()
                .filter(|_| rng.gen_bool(0.4))
                .collect();
            json!({
                "id": format!("doc-{i:04}"),
                "n": i,
                "score": rng.gen_range(0..100),
                "active": rng.gen_bool(0.5),
                "tags": tags,
                "addr": {"city": CITIES[rng.gen_range(0..CITIES.len())]},
            })
        })
        .collect()
}
