//! Backend lifecycle state.
//!
//! A backend moves `Opening -> Open`, and may later become `Closed`. The
//! current state is published on a `tokio::sync::watch` channel so callers
//! can await the transition to `Open` instead of polling.

use std::fmt;

use tokio::sync::watch;

/// Lifecycle state of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvStatus {
    /// The backend is still being opened.
    Opening,
    /// Ready for reads and writes.
    Open,
    /// Closed, either explicitly or because opening failed.
    Closed,
}

impl KvStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KvStatus::Opening => "opening",
            KvStatus::Open => "open",
            KvStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for KvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner side of a status channel, held by a backend.
#[derive(Debug)]
pub struct StatusCell {
    tx: watch::Sender<KvStatus>,
}

impl StatusCell {
    pub fn new(initial: KvStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Current state.
    pub fn get(&self) -> KvStatus {
        *self.tx.borrow()
    }

    /// Publish a new state. Works whether or not anyone is watching.
    pub fn set(&self, status: KvStatus) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            tracing::debug!(from = %previous, to = %status, "backend status changed");
        }
    }

    /// A receiver that observes every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<KvStatus> {
        self.tx.subscribe()
    }
}
