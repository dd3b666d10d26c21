//! SQLite implementation of the KvStore trait.
//!
//! This is the persistent backend for Tabula. Each table lives in its own
//! SQLite file holding a single key-ordered `documents` table. Values are
//! CBOR-encoded documents. The connection is wrapped in async via
//! tokio::spawn_blocking.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tabula_core::Document;
use tokio::sync::watch;

use crate::error::{KvError, Result};
use crate::migration;
use crate::status::{KvStatus, StatusCell};
use crate::traits::{KvEntry, KvStore};

/// SQLite-based backend.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. The connection slot is empty while
/// the backend is opening in the background and after it is closed.
pub struct SqliteKv {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Option<Connection>>>,
    /// Lifecycle state.
    status: Arc<StatusCell>,
    /// Database file, `None` for in-memory databases.
    path: Option<PathBuf>,
}

impl SqliteKv {
    /// Open a SQLite database at the given path.
    ///
    /// Creates parent directories and the file, and runs migrations if
    /// needed. The returned backend is already `open`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_connection(&path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            status: Arc::new(StatusCell::new(KvStatus::Open)),
            path: Some(path),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            status: Arc::new(StatusCell::new(KvStatus::Open)),
            path: None,
        })
    }

    /// Start opening a database on the blocking pool and return immediately.
    ///
    /// The backend reports `opening` until the connection is ready, then
    /// `open`. If opening fails the error is logged and the backend reports
    /// `closed`. Must be called from within a tokio runtime.
    pub fn open_in_background(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let kv = Self {
            conn: Arc::new(Mutex::new(None)),
            status: Arc::new(StatusCell::new(KvStatus::Opening)),
            path: Some(path.clone()),
        };

        let slot = Arc::clone(&kv.conn);
        let status = Arc::clone(&kv.status);
        tokio::task::spawn_blocking(move || {
            let opened = open_connection(&path).and_then(|conn| {
                let mut guard = slot.lock().map_err(|e| lock_error(&e))?;
                *guard = Some(conn);
                Ok(())
            });
            match opened {
                Ok(()) => status.set(KvStatus::Open),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to open backend");
                    status.set(KvStatus::Closed);
                }
            }
        });

        kv
    }

    /// Path of the database file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection. Further operations fail with [`KvError::Closed`].
    pub fn close(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| lock_error(&e))?.take();
        self.status.set(KvStatus::Closed);
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| KvError::Database(e))?;
        }
        Ok(())
    }

    /// Execute a blocking operation on the connection.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.status.get() != KvStatus::Open {
            return Err(KvError::Closed);
        }

        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|e| lock_error(&e))?;
            let conn = guard.as_ref().ok_or(KvError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| {
            KvError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

/// Open the file (creating directories) and bring its schema up to date.
fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = Connection::open(path)?;
    migration::migrate(&mut conn)?;
    tracing::debug!(path = %path.display(), "sqlite backend opened");
    Ok(conn)
}

fn lock_error(e: &dyn std::fmt::Display) -> KvError {
    KvError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
        Some(format!("mutex poisoned: {}", e)),
    ))
}

// Helper to encode a document to CBOR
fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(doc, &mut buf).map_err(|e| KvError::Serialization(e.to_string()))?;
    Ok(buf)
}

// Helper to decode a stored CBOR value
fn decode_document(key: &str, bytes: &[u8]) -> Result<Document> {
    ciborium::from_reader(bytes)
        .map_err(|e| KvError::InvalidData(format!("undecodable value at key {}: {}", key, e)))
}

#[async_trait]
impl KvStore for SqliteKv {
    fn status(&self) -> KvStatus {
        self.status.get()
    }

    fn watch_status(&self) -> watch::Receiver<KvStatus> {
        self.status.subscribe()
    }

    async fn get(&self, key: &str) -> Result<Option<Document>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT value FROM documents WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;

            bytes.map(|b| decode_document(&key, &b)).transpose()
        })
        .await
    }

    async fn put(&self, key: &str, value: &Document) -> Result<()> {
        let key = key.to_string();
        let bytes = encode_document(value)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                               updated_at = excluded.updated_at",
                params![key, bytes, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn del(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM documents WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
    }

    async fn get_range(&self) -> Result<Vec<KvEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM documents ORDER BY key")?;

            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(key, bytes)| {
                    let value = decode_document(&key, &bytes)?;
                    Ok(KvEntry { key, value })
                })
                .collect::<Result<Vec<_>>>()
        })
        .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
