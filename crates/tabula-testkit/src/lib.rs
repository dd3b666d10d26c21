//! # Tabula Testkit
//!
//! Testing utilities for Tabula.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Filter vectors**: Known filters with the ids they must select
//! - **Generators**: Proptest strategies for documents, tables and filters
//! - **Fixtures**: Ready-made stores for setting up test scenarios
//!
//! ## Filter Vectors
//!
//! ```rust
//! use tabula_testkit::vectors::{all_vectors, run_vector};
//!
//! for vector in all_vectors() {
//!     let ids = run_vector(&vector).unwrap();
//!     assert_eq!(ids, vector.expected, "{}", vector.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use tabula_core::Query;
//! use tabula_testkit::generators::{filter, table};
//!
//! proptest! {
//!     #[test]
//!     fn filters_never_panic(docs in table(10), f in filter()) {
//!         let query = Query::compile(&f).unwrap();
//!         let _ = query.find(&docs);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use tabula_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::seeded(100, 42).await?;
//! fixture.store.del_all(&serde_json::json!({"active": false})).await?;
//! println!("{:?}", fixture.operations());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{sample_documents, DiskFixture, TestFixture};
pub use generators::{document, filter, table};
pub use vectors::{all_vectors, run_vector, verify_all_vectors, FilterVector};
