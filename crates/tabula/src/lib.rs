//! # Tabula
//!
//! An embedded document store. Each table is a set of JSON objects keyed by
//! their `id` field, persisted in an ordered key-value backend.
//!
//! ## Overview
//!
//! - **select**: filter documents with a Mongo-style filter language
//! - **insert**: add documents, generating ids, never overwriting
//! - **save**: deep-merge into existing documents, optionally inserting
//! - **del** / **del_all**: delete by id or by filter
//! - **changes**: every mutation emits a [`ChangeEvent`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tabula::{DocumentStore, SaveOptions, StoreConfig};
//!
//! async fn example() -> tabula::Result<()> {
//!     let config = StoreConfig::new().url("./_db").db("shop").cl("orders");
//!     let store = DocumentStore::open(&config)?;
//!
//!     let _sub = store.subscribe(|event| println!("{} happened", event.operation()));
//!
//!     store.insert(&json!([{"id": "o1", "qty": 2}, {"qty": 5}])).await?;
//!     store
//!         .save(&json!({"id": "o1", "qty": 3}), SaveOptions::default())
//!         .await?;
//!
//!     let big = store.select(&json!({"qty": {"$gte": 3}})).await?;
//!     println!("{} large orders", big.len());
//!
//!     store.del_all(&json!({})).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `tabula::core` - documents, ids, filters and result records
//! - `tabula::kv` - backend trait and implementations

pub mod config;
pub mod error;
pub mod notify;
pub mod store;

// Re-export component crates
pub use tabula_core as core;
pub use tabula_kv as kv;

pub use config::{SaveOptions, StoreConfig};
pub use error::{Result, StoreError};
pub use notify::{ChangeEvent, ChangeNotifier, ChangeResult, Operation, Subscription};
pub use store::DocumentStore;

pub use tabula_core::{
    DeleteResult, Document, InsertResult, Query, QueryError, SaveOutcome, SaveResult,
};
pub use tabula_kv::{KvError, KvStatus, KvStore, MemoryKv, SqliteKv};
