//! # Tabula KV
//!
//! Ordered key-value backends for Tabula. Provides a trait-based interface
//! for document persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The facade in the `tabula` crate talks to storage only through the
//! [`KvStore`] trait, so it is storage-agnostic. The primary implementation
//! is [`SqliteKv`], with [`MemoryKv`] for testing.
//!
//! ## Key Types
//!
//! - [`KvStore`] - The async trait for point get/put/del and range scans
//! - [`KvStoreExt`] - The open-gate and not-found-tolerant lookup
//! - [`KvStatus`] - Lifecycle state (`opening`, `open`, `closed`)
//! - [`SqliteKv`] - SQLite-based persistent storage
//! - [`MemoryKv`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tabula_kv::{KvStore, KvStoreExt, SqliteKv};
//!
//! async fn example() {
//!     let kv = SqliteKv::open("_db/worm/test/data.sqlite").unwrap();
//!     kv.wait_open().await.unwrap();
//!
//!     let entries = kv.get_range().await.unwrap();
//!     println!("{} documents", entries.len());
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod status;
pub mod traits;

pub use error::{KvError, Result};
pub use memory::MemoryKv;
pub use sqlite::SqliteKv;
pub use status::{KvStatus, StatusCell};
pub use traits::{KvEntry, KvStore, KvStoreExt};
