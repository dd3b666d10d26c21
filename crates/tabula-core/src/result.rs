//! Operation result records.
//!
//! These are the public outcome records callers key their logic on. The
//! serialized field names (`n`, `nInserted`, `nModified`, `nDeleted`, `ok`)
//! are fixed.

use serde::{Deserialize, Serialize};

/// Outcome of an `insert` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertResult {
    /// Documents considered.
    pub n: usize,
    /// Documents actually written.
    #[serde(rename = "nInserted")]
    pub n_inserted: usize,
    /// 1 on success.
    pub ok: u8,
}

impl InsertResult {
    /// The result for input that was not a document set.
    pub const fn noop() -> Self {
        Self {
            n: 0,
            n_inserted: 0,
            ok: 1,
        }
    }
}

/// Outcome of saving a single document that already existed (or was skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaveResult {
    pub n: usize,
    #[serde(rename = "nModified")]
    pub n_modified: usize,
    pub ok: u8,
}

impl SaveResult {
    /// The stored document was merged and rewritten.
    pub const fn modified() -> Self {
        Self {
            n: 1,
            n_modified: 1,
            ok: 1,
        }
    }

    /// Nothing was written.
    pub const fn unchanged() -> Self {
        Self {
            n: 0,
            n_modified: 0,
            ok: 1,
        }
    }
}

/// Outcome of deleting a single document, or of a `del_all` sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteResult {
    pub n: usize,
    #[serde(rename = "nDeleted")]
    pub n_deleted: usize,
    /// 0 when the request carried no usable id.
    pub ok: u8,
}

impl DeleteResult {
    pub const fn deleted() -> Self {
        Self {
            n: 1,
            n_deleted: 1,
            ok: 1,
        }
    }

    pub const fn not_found() -> Self {
        Self {
            n: 1,
            n_deleted: 0,
            ok: 1,
        }
    }

    pub const fn missing_id() -> Self {
        Self {
            n: 1,
            n_deleted: 0,
            ok: 0,
        }
    }
}

/// Per-document outcome of a `save` call.
///
/// A document that did not exist and was auto-inserted reports the insert
/// shape, everything else reports the save shape. The two shapes are kept
/// apart rather than coerced into one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SaveOutcome {
    Saved(SaveResult),
    Inserted(InsertResult),
}

impl SaveOutcome {
    /// Number of documents this outcome wrote, whichever shape it has.
    pub fn written(&self) -> usize {
        match self {
            SaveOutcome::Saved(r) => r.n_modified,
            SaveOutcome::Inserted(r) => r.n_inserted,
        }
    }
}

impl From<SaveResult> for SaveOutcome {
    fn from(r: SaveResult) -> Self {
        SaveOutcome::Saved(r)
    }
}

impl From<InsertResult> for SaveOutcome {
    fn from(r: InsertResult) -> Self {
        SaveOutcome::Inserted(r)
    }
}
