//! The document store: CRUD over one table.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tabula_core::{
    deep_merge, doc_id, ensure_id, from_document, is_constraining, maps_equal, normalize,
    DeleteResult, Document, InsertResult, Query, SaveOutcome, SaveResult,
};
use tabula_kv::{KvEntry, KvStore, KvStoreExt, MemoryKv, SqliteKv};
use tokio::sync::broadcast;

use crate::config::{SaveOptions, StoreConfig, DEFAULT_CHANGE_BUFFER};
use crate::error::{Result, StoreError};
use crate::notify::{ChangeEvent, ChangeNotifier, Subscription};

/// A table of JSON documents keyed by their `id` field.
///
/// Provides:
/// - filtered selection with a Mongo-style filter language
/// - insert, which never overwrites
/// - save, which deep-merges into existing documents and optionally inserts
/// - point and filtered deletion
/// - change notification for every mutation
///
/// Every call waits for the backend to report `open` before touching it.
/// Calls process their documents one at a time, in input order.
pub struct DocumentStore<K: KvStore> {
    kv: Arc<K>,
    table: String,
    notifier: ChangeNotifier,
}

impl DocumentStore<SqliteKv> {
    /// Open the table described by `config`, creating it if needed.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let kv = SqliteKv::open(config.database_file())?;
        tracing::info!(table = %config.table_name(), path = %config.database_file().display(), "table opened");
        Ok(Self::with_config(kv, config))
    }

    /// Start opening the table and return at once.
    ///
    /// Calls made before the backend is ready wait for it. Must be called
    /// from within a tokio runtime.
    pub fn open_in_background(config: &StoreConfig) -> Self {
        let kv = SqliteKv::open_in_background(config.database_file());
        Self::with_config(kv, config)
    }
}

impl DocumentStore<MemoryKv> {
    /// A throwaway in-memory table.
    pub fn open_memory() -> Self {
        Self::new(MemoryKv::new())
    }
}

impl<K: KvStore> DocumentStore<K> {
    /// Wrap an existing backend.
    pub fn new(kv: K) -> Self {
        Self {
            kv: Arc::new(kv),
            table: StoreConfig::default().table_name(),
            notifier: ChangeNotifier::new(DEFAULT_CHANGE_BUFFER),
        }
    }

    /// Wrap an existing backend, taking the label and channel size from `config`.
    pub fn with_config(kv: K, config: &StoreConfig) -> Self {
        Self {
            kv: Arc::new(kv),
            table: config.table_name(),
            notifier: ChangeNotifier::new(config.channel_capacity()),
        }
    }

    /// The backend.
    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// `db/cl` label of this table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Register a change callback.
    ///
    /// Callbacks run synchronously, in registration order, after the
    /// mutation has been applied and before the mutating call returns.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    /// Receive change events asynchronously.
    pub fn changes(&self) -> broadcast::Receiver<Arc<ChangeEvent>> {
        self.notifier.changes()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    async fn entries(&self) -> Result<Vec<KvEntry>> {
        self.kv.wait_open().await?;
        Ok(self.kv.get_range().await?)
    }

    async fn get_data(&self) -> Result<Vec<Document>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|entry| entry.value)
            .collect())
    }

    async fn get_value(&self, id: &str) -> Result<Option<Document>> {
        self.kv.wait_open().await?;
        Ok(self.kv.lookup(id).await?)
    }

    /// Return the documents matching `filter`, in key order.
    ///
    /// A filter that is not a non-empty object matches everything.
    pub async fn select<F>(&self, filter: &F) -> Result<Vec<Document>>
    where
        F: Serialize + ?Sized,
    {
        let filter = serde_json::to_value(filter)?;
        let docs = self.get_data().await?;
        if !is_constraining(&filter) {
            return Ok(docs);
        }

        let query = compile(&filter)?;
        let found = query.find(&docs);
        tracing::debug!(table = %self.table, scanned = docs.len(), found = found.len(), "select");
        Ok(found)
    }

    /// Return every document, in key order.
    pub async fn select_all(&self) -> Result<Vec<Document>> {
        self.get_data().await
    }

    /// [`DocumentStore::select`], deserializing each match into `T`.
    pub async fn select_as<T, F>(&self, filter: &F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        self.select(filter)
            .await?
            .iter()
            .map(|doc| from_document(doc).map_err(StoreError::from))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a document or a list of documents.
    ///
    /// Documents without a valid `id` get a generated one. A document whose
    /// id is already stored is skipped, never overwritten. Input that is not
    /// a non-empty object or a non-empty list of objects is a no-op.
    pub async fn insert<T>(&self, data: &T) -> Result<InsertResult>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data)?;
        let Some(mut docs) = normalize(&data) else {
            tracing::debug!(table = %self.table, "insert: nothing to insert");
            return Ok(InsertResult::noop());
        };
        for doc in &mut docs {
            ensure_id(doc);
        }
        self.insert_documents(docs).await
    }

    async fn insert_documents(&self, docs: Vec<Document>) -> Result<InsertResult> {
        let mut inserted = 0;
        for doc in &docs {
            let Some(id) = doc_id(doc) else { continue };
            if self.get_value(id).await?.is_some() {
                tracing::debug!(table = %self.table, id, "insert: id exists, skipping");
                continue;
            }
            self.kv.put(id, doc).await?;
            inserted += 1;
        }

        let result = InsertResult {
            n: docs.len(),
            n_inserted: inserted,
            ok: 1,
        };
        tracing::debug!(table = %self.table, n = result.n, inserted, "insert");
        self.notifier.emit(ChangeEvent::insert(docs, result));
        Ok(result)
    }

    /// Update documents by id, deep-merging the input into what is stored.
    ///
    /// Per document:
    /// - stored and deep-equal to the input: nothing is written
    /// - stored and different: the input is merged in and written back
    /// - not stored: inserted through [`DocumentStore::insert`] when
    ///   `options.auto_insert` is set (emitting its own `insert` event),
    ///   otherwise skipped
    ///
    /// Merging recurses into nested objects. Arrays and scalars from the
    /// input replace the stored value.
    pub async fn save<T>(&self, data: &T, options: SaveOptions) -> Result<Vec<SaveOutcome>>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data)?;
        let Some(mut docs) = normalize(&data) else {
            tracing::debug!(table = %self.table, "save: nothing to save");
            return Ok(Vec::new());
        };
        for doc in &mut docs {
            ensure_id(doc);
        }

        let mut results = Vec::with_capacity(docs.len());
        for doc in &docs {
            let Some(id) = doc_id(doc) else { continue };
            let outcome: SaveOutcome = match self.get_value(id).await? {
                Some(stored) if maps_equal(&stored, doc) => SaveResult::unchanged().into(),
                Some(mut stored) => {
                    deep_merge(&mut stored, doc);
                    self.kv.put(id, &stored).await?;
                    SaveResult::modified().into()
                }
                None if options.auto_insert => {
                    self.insert_documents(vec![doc.clone()]).await?.into()
                }
                None => SaveResult::unchanged().into(),
            };
            results.push(outcome);
        }

        tracing::debug!(
            table = %self.table,
            n = docs.len(),
            written = results.iter().map(SaveOutcome::written).sum::<usize>(),
            "save"
        );
        self.notifier.emit(ChangeEvent::save(docs, results.clone()));
        Ok(results)
    }

    /// Delete documents by their `id` field.
    ///
    /// Each document reports whether it was deleted, not found, or carried
    /// no usable id (`ok: 0`).
    pub async fn del<T>(&self, data: &T) -> Result<Vec<DeleteResult>>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data)?;
        let Some(docs) = normalize(&data) else {
            tracing::debug!(table = %self.table, "del: nothing to delete");
            return Ok(Vec::new());
        };

        let mut results = Vec::with_capacity(docs.len());
        for doc in &docs {
            let result = match doc_id(doc) {
                Some(id) => match self.get_value(id).await? {
                    Some(_) => {
                        self.kv.del(id).await?;
                        DeleteResult::deleted()
                    }
                    None => DeleteResult::not_found(),
                },
                None => DeleteResult::missing_id(),
            };
            results.push(result);
        }

        tracing::debug!(
            table = %self.table,
            n = docs.len(),
            deleted = results.iter().map(|r| r.n_deleted).sum::<usize>(),
            "del"
        );
        self.notifier.emit(ChangeEvent::del(docs, results.clone()));
        Ok(results)
    }

    /// Delete every document matching `filter`.
    ///
    /// A filter that is not a non-empty object deletes everything. The
    /// result's `n` counts the documents scanned, `nDeleted` the ones removed.
    pub async fn del_all<F>(&self, filter: &F) -> Result<DeleteResult>
    where
        F: Serialize + ?Sized,
    {
        let filter = serde_json::to_value(filter)?;
        let entries = self.entries().await?;

        let deleted = if is_constraining(&filter) {
            let query = compile(&filter)?;
            let matched: HashSet<&str> = entries
                .iter()
                .filter(|entry| query.matches(&entry.value))
                .map(|entry| entry.key.as_str())
                .collect();

            if !matched.is_empty() {
                for entry in &entries {
                    if matched.contains(entry.key.as_str()) {
                        self.kv.del(&entry.key).await?;
                    }
                }
            }
            matched.len()
        } else {
            for entry in &entries {
                self.kv.del(&entry.key).await?;
            }
            entries.len()
        };

        let result = DeleteResult {
            n: entries.len(),
            n_deleted: deleted,
            ok: 1,
        };
        tracing::debug!(table = %self.table, scanned = entries.len(), deleted, "del_all");
        self.notifier.emit(ChangeEvent::del_all(result));
        Ok(result)
    }
}

impl<K: KvStore> std::fmt::Debug for DocumentStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("table", &self.table)
            .field("status", &self.kv.status())
            .field("notifier", &self.notifier)
            .finish()
    }
}

fn compile(filter: &Value) -> Result<Query> {
    Query::compile(filter).map_err(|source| StoreError::Query {
        filter: filter.to_string(),
        source,
    })
}
