//! Change notification.
//!
//! Every successful mutation produces one [`ChangeEvent`]. Events reach
//! observers two ways:
//!
//! - synchronous callbacks registered with [`ChangeNotifier::subscribe`],
//!   invoked in registration order before the mutating call returns
//! - a tokio broadcast channel from [`ChangeNotifier::changes`], for async
//!   consumers that can tolerate lagging

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::Serialize;
use tabula_core::{DeleteResult, Document, InsertResult, SaveOutcome};
use tokio::sync::broadcast;

/// The mutation that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Insert,
    Save,
    Del,
    DelAll,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Save => "save",
            Operation::Del => "del",
            Operation::DelAll => "delAll",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result payload of a [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChangeResult {
    Insert(InsertResult),
    Save(Vec<SaveOutcome>),
    Del(Vec<DeleteResult>),
    DelAll(DeleteResult),
}

/// A change notification: `(operation, documents, result)`.
///
/// `documents` is the normalized input of the call. It is `None` for
/// `delAll`, which carries a filter rather than documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    operation: Operation,
    documents: Option<Vec<Document>>,
    result: ChangeResult,
}

impl ChangeEvent {
    pub fn insert(documents: Vec<Document>, result: InsertResult) -> Self {
        Self {
            operation: Operation::Insert,
            documents: Some(documents),
            result: ChangeResult::Insert(result),
        }
    }

    pub fn save(documents: Vec<Document>, results: Vec<SaveOutcome>) -> Self {
        Self {
            operation: Operation::Save,
            documents: Some(documents),
            result: ChangeResult::Save(results),
        }
    }

    pub fn del(documents: Vec<Document>, results: Vec<DeleteResult>) -> Self {
        Self {
            operation: Operation::Del,
            documents: Some(documents),
            result: ChangeResult::Del(results),
        }
    }

    pub fn del_all(result: DeleteResult) -> Self {
        Self {
            operation: Operation::DelAll,
            documents: None,
            result: ChangeResult::DelAll(result),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn documents(&self) -> Option<&[Document]> {
        self.documents.as_deref()
    }

    pub fn result(&self) -> &ChangeResult {
        &self.result
    }
}

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Observers {
    next_id: AtomicU64,
    callbacks: RwLock<BTreeMap<u64, Callback>>,
}

impl Observers {
    fn remove(&self, id: u64) -> bool {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }
}

/// Fan-out point for [`ChangeEvent`]s.
pub struct ChangeNotifier {
    observers: Arc<Observers>,
    tx: broadcast::Sender<Arc<ChangeEvent>>,
}

impl ChangeNotifier {
    /// Create a notifier whose async channel buffers `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            observers: Arc::new(Observers {
                next_id: AtomicU64::new(0),
                callbacks: RwLock::new(BTreeMap::new()),
            }),
            tx,
        }
    }

    /// Register a callback. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.observers.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(callback));

        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
            attached: true,
        }
    }

    /// Receive events asynchronously.
    pub fn changes(&self) -> broadcast::Receiver<Arc<ChangeEvent>> {
        self.tx.subscribe()
    }

    /// Number of registered callbacks.
    pub fn observer_count(&self) -> usize {
        self.observers
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver an event to every callback, then to the async channel.
    pub fn emit(&self, event: ChangeEvent) {
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<Callback> = self
            .observers
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        tracing::trace!(
            operation = %event.operation(),
            observers = callbacks.len(),
            "emitting change"
        );

        for callback in &callbacks {
            callback(&event);
        }

        // No receivers is fine
        let _ = self.tx.send(Arc::new(event));
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observer_count())
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

/// Handle for a registered callback.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    id: u64,
    observers: Weak<Observers>,
    attached: bool,
}

impl Subscription {
    /// Remove the callback. Returns `false` if it was already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.attached = false;
        self.observers
            .upgrade()
            .map(|observers| observers.remove(self.id))
            .unwrap_or(false)
    }

    /// Keep the callback registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.attached = false;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.attached {
            if let Some(observers) = self.observers.upgrade() {
                observers.remove(self.id);
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.attached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<Operation>>>, impl Fn(&ChangeEvent) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |e: &ChangeEvent| {
            sink.lock().unwrap().push(e.operation())
        })
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Insert.as_str(), "insert");
        assert_eq!(Operation::Save.as_str(), "save");
        assert_eq!(Operation::Del.as_str(), "del");
        assert_eq!(Operation::DelAll.to_string(), "delAll");
    }

    #[test]
    fn test_callbacks_in_registration_order() {
        let notifier = ChangeNotifier::new(8);
        let order = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let order = Arc::clone(&order);
                notifier.subscribe(move |_| order.lock().unwrap().push(i))
            })
            .collect();

        notifier.emit(ChangeEvent::del_all(DeleteResult::deleted()));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn test_unsubscribe_and_drop() {
        let notifier = ChangeNotifier::new(8);
        let (seen, callback) = recorder();

        let sub = notifier.subscribe(callback);
        notifier.emit(ChangeEvent::insert(vec![], InsertResult::noop()));
        assert!(sub.unsubscribe());
        notifier.emit(ChangeEvent::insert(vec![], InsertResult::noop()));
        assert_eq!(seen.lock().unwrap().len(), 1);

        let (seen, callback) = recorder();
        {
            let _sub = notifier.subscribe(callback);
            assert_eq!(notifier.observer_count(), 1);
        }
        assert_eq!(notifier.observer_count(), 0);
        notifier.emit(ChangeEvent::del(vec![], vec![]));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_detach_keeps_callback() {
        let notifier = ChangeNotifier::new(8);
        let (seen, callback) = recorder();
        notifier.subscribe(callback).detach();

        notifier.emit(ChangeEvent::save(vec![], vec![]));
        assert_eq!(*seen.lock().unwrap(), vec![Operation::Save]);
    }

    #[test]
    fn test_callback_may_subscribe() {
        let notifier = Arc::new(ChangeNotifier::new(8));
        let inner = Arc::clone(&notifier);
        notifier
            .subscribe(move |_| inner.subscribe(|_| {}).detach())
            .detach();

        notifier.emit(ChangeEvent::del_all(DeleteResult::deleted()));
        assert_eq!(notifier.observer_count(), 2);
    }

    #[tokio::test]
    async fn test_async_channel() {
        let notifier = ChangeNotifier::new(8);
        let mut rx = notifier.changes();

        notifier.emit(ChangeEvent::del_all(DeleteResult {
            n: 2,
            n_deleted: 2,
            ok: 1,
        }));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.operation(), Operation::DelAll);
        assert!(event.documents().is_none());
    }

    #[test]
    fn test_event_serialization() {
        let doc = json!({"id": "a", "x": 1}).as_object().cloned().unwrap();
        let event = ChangeEvent::insert(
            vec![doc],
            InsertResult {
                n: 1,
                n_inserted: 1,
                ok: 1,
            },
        );
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "operation": "insert",
                "documents": [{"id": "a", "x": 1}],
                "result": {"n": 1, "nInserted": 1, "ok": 1}
            })
        );

        let event = ChangeEvent::del_all(DeleteResult::deleted());
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "operation": "delAll",
                "documents": null,
                "result": {"n": 1, "nDeleted": 1, "ok": 1}
            })
        );
    }
}
