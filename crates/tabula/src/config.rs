//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default root directory.
pub const DEFAULT_URL: &str = "./_db";
/// Default database name.
pub const DEFAULT_DB: &str = "worm";
/// Default table name.
pub const DEFAULT_CL: &str = "test";
/// File name of the SQLite database inside a table directory.
pub const DATABASE_FILE: &str = "data.sqlite";
/// Default number of buffered events for [`crate::DocumentStore::changes`].
pub const DEFAULT_CHANGE_BUFFER: usize = 256;

/// Where a table lives.
///
/// A table is addressed by `(url, db, cl)` and stored under `url/db/cl`.
/// Empty strings fall back to the defaults, so a partially filled config
/// file still yields a usable path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory.
    pub url: String,
    /// Database name.
    pub db: String,
    /// Table name.
    pub cl: String,
    /// Capacity of the async change channel.
    pub change_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            db: DEFAULT_DB.to_string(),
            cl: DEFAULT_CL.to_string(),
            change_buffer: DEFAULT_CHANGE_BUFFER,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn db(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    pub fn cl(mut self, cl: impl Into<String>) -> Self {
        self.cl = cl.into();
        self
    }

    pub fn change_buffer(mut self, capacity: usize) -> Self {
        self.change_buffer = capacity;
        self
    }

    /// Directory holding the table: `url/db/cl`.
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(or_default(&self.url, DEFAULT_URL))
            .join(or_default(&self.db, DEFAULT_DB))
            .join(or_default(&self.cl, DEFAULT_CL))
    }

    /// The SQLite file inside [`StoreConfig::storage_path`].
    pub fn database_file(&self) -> PathBuf {
        self.storage_path().join(DATABASE_FILE)
    }

    /// `db/cl`, used to label log lines.
    pub fn table_name(&self) -> String {
        format!(
            "{}/{}",
            or_default(&self.db, DEFAULT_DB),
            or_default(&self.cl, DEFAULT_CL)
        )
    }

    pub(crate) fn channel_capacity(&self) -> usize {
        self.change_buffer.max(1)
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

/// Options for [`crate::DocumentStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Insert documents that do not exist yet. Defaults to `true`.
    #[serde(rename = "autoInsert")]
    pub auto_insert: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { auto_insert: true }
    }
}

impl SaveOptions {
    /// Save only documents that already exist.
    pub fn update_only() -> Self {
        Self { auto_insert: false }
    }
}
