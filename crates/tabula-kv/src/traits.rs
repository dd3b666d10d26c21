//! KvStore trait: the abstract interface for the ordered key-value backend.
//!
//! Documents are stored under their string id. Implementations include
//! SQLite (persistent) and in-memory (for tests and ephemeral tables).

use async_trait::async_trait;
use tabula_core::Document;
use tokio::sync::watch;

use crate::error::{KvError, Result};
use crate::status::KvStatus;

/// One entry of a range scan.
#[derive(Debug, Clone, PartialEq)]
pub struct KvEntry {
    pub key: String,
    pub value: Document,
}

/// The KvStore trait: async interface for document persistence.
///
/// All methods are async to support both blocking (SQLite) and async
/// backends. For SQLite, `spawn_blocking` is used internally to avoid
/// blocking the runtime.
///
/// # Design Notes
///
/// - **Ordered**: `get_range` returns entries sorted by key.
/// - **Lifecycle**: `watch_status` publishes `opening -> open -> closed`.
///   Operations on a backend that is not open fail with [`KvError::Closed`].
/// - **Absence**: `get` returns `Ok(None)` for a missing key, but may also
///   report [`KvError::NotFound`]. Use [`KvStoreExt::lookup`] to treat both
///   as absence.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Current lifecycle state.
    fn status(&self) -> KvStatus {
        *self.watch_status().borrow()
    }

    /// Receiver for lifecycle state changes.
    fn watch_status(&self) -> watch::Receiver<KvStatus>;

    /// Point lookup.
    async fn get(&self, key: &str) -> Result<Option<Document>>;

    /// Insert or replace the value stored under `key`.
    async fn put(&self, key: &str, value: &Document) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Every entry, ordered by key.
    async fn get_range(&self) -> Result<Vec<KvEntry>>;
}

/// Extension trait for common backend patterns.
pub trait KvStoreExt: KvStore {
    /// Wait until the backend reports `Open`.
    ///
    /// A `Closed` observation is logged and the wait continues: a backend may
    /// pass through `closed` while it is being reopened. There is no timeout,
    /// so this waits forever on a backend that never opens. It only fails if
    /// the backend drops its status channel, since no transition can then
    /// ever arrive.
    fn wait_open(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Point lookup that treats a not-found report as absence.
    fn lookup(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Document>>> + Send;
}

impl<S: KvStore + ?Sized> KvStoreExt for S {
    async fn wait_open(&self) -> Result<()> {
        let mut rx = self.watch_status();
        loop {
            let status = *rx.borrow_and_update();
            match status {
                KvStatus::Open => return Ok(()),
                KvStatus::Closed => {
                    tracing::warn!(status = %status, "backend is closed, waiting for it to open");
                }
                KvStatus::Opening => {}
            }
            rx.changed().await.map_err(|_| KvError::Closed)?;
        }
    }

    async fn lookup(&self, key: &str) -> Result<Option<Document>> {
        match self.get(key).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
