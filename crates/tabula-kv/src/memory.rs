//! In-memory implementation of the KvStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in a `BTreeMap` with no persistence. The lifecycle
//! state can be driven by hand, which makes the open-gate testable.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tabula_core::Document;
use tokio::sync::watch;

use crate::error::{KvError, Result};
use crate::status::{KvStatus, StatusCell};
use crate::traits::{KvEntry, KvStore};

/// In-memory backend.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, Document>>,
    status: StatusCell,
}

impl MemoryKv {
    /// Create a new empty backend that is already open.
    pub fn new() -> Self {
        Self::with_status(KvStatus::Open)
    }

    /// Create a backend that reports `opening` until [`MemoryKv::set_status`]
    /// moves it along.
    pub fn opening() -> Self {
        Self::with_status(KvStatus::Opening)
    }

    fn with_status(status: KvStatus) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            status: StatusCell::new(status),
        }
    }

    /// Drive the lifecycle state.
    pub fn set_status(&self, status: KvStatus) {
        self.status.set(status);
    }

    /// Mark the backend closed. Data is kept, so it can be reopened with
    /// `set_status(KvStatus::Open)`.
    pub fn close(&self) {
        self.status.set(KvStatus::Closed);
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.status.get() {
            KvStatus::Open => Ok(()),
            _ => Err(KvError::Closed),
        }
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Document>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Document>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    fn status(&self) -> KvStatus {
        self.status.get()
    }

    fn watch_status(&self) -> watch::Receiver<KvStatus> {
        self.status.subscribe()
    }

    async fn get(&self, key: &str) -> Result<Option<Document>> {
        self.ensure_open()?;
        Ok(self.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &Document) -> Result<()> {
        self.ensure_open()?;
        self.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        self.write().remove(key);
        Ok(())
    }

    async fn get_range(&self) -> Result<Vec<KvEntry>> {
        self.ensure_open()?;
        Ok(self
            .read()
            .iter()
            .map(|(key, value)| KvEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }
}
