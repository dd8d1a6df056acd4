//! In-process document store.
//!
//! Behaves like a latency-compensating client SDK: every write is first
//! delivered to subscribers as a pending snapshot and then as a confirmed
//! one. Used by tests and for running without a backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;

use super::{Collection, DocumentMap, DocumentStore, RemoteError, Snapshot, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Put,
    Patch,
}

/// A write received by the store, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub kind: WriteKind,
    pub collection: Collection,
    pub id: String,
    pub document: Value,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<Collection, DocumentMap>,
    subscribers: HashMap<Collection, Vec<mpsc::UnboundedSender<Snapshot>>>,
    writes: Vec<WriteRecord>,
    fail_fetches: bool,
}

impl Inner {
    fn documents(&self, collection: Collection) -> DocumentMap {
        self.collections.get(&collection).cloned().unwrap_or_default()
    }

    fn broadcast(&mut self, collection: Collection, snapshot: Snapshot) {
        if let Some(senders) = self.subscribers.get_mut(&collection) {
            senders.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }

    /// Deliver the pending echo followed by the confirmation
    fn publish_write(&mut self, collection: Collection) {
        let documents = self.documents(collection);
        self.broadcast(collection, Snapshot::pending(documents.clone()));
        self.broadcast(collection, Snapshot::confirmed(documents));
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document as if another client had written it earlier.
    /// Not logged and not broadcast.
    pub fn seed(&self, collection: Collection, id: &str, document: Value) {
        self.inner
            .lock()
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Write a document as another client would, notifying subscribers with a
    /// confirmed snapshot only
    pub fn external_put(&self, collection: Collection, id: &str, document: Value) {
        let mut inner = self.inner.lock();
        inner
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), document);
        let documents = inner.documents(collection);
        inner.broadcast(collection, Snapshot::confirmed(documents));
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.inner.lock().fail_fetches = fail;
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().writes.clone()
    }

    pub fn document(&self, collection: Collection, id: &str) -> Option<Value> {
        self.inner
            .lock()
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Number of live subscribers; closed feeds are pruned on the next broadcast
    pub fn subscriber_count(&self, collection: Collection) -> usize {
        self.inner
            .lock()
            .subscribers
            .get(&collection)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn fetch_all(&self, collection: Collection) -> Result<DocumentMap, RemoteError> {
        let inner = self.inner.lock();
        if inner.fail_fetches {
            return Err(RemoteError::Unavailable(format!("fetch of {} refused", collection)));
        }
        Ok(inner.documents(collection))
    }

    async fn subscribe(&self, collection: Collection) -> Result<Subscription, RemoteError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let _ = tx.send(Snapshot::confirmed(inner.documents(collection)));
        inner.subscribers.entry(collection).or_default().push(tx);
        Ok(Subscription::new(rx, None))
    }

    async fn put(&self, collection: Collection, id: &str, document: Value) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.writes.push(WriteRecord {
            kind: WriteKind::Put,
            collection,
            id: id.to_string(),
            document: document.clone(),
        });
        inner
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), document);
        inner.publish_write(collection);
        Ok(())
    }

    async fn patch(&self, collection: Collection, id: &str, fields: Value) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        let existing = inner
            .collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| RemoteError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        match (existing.as_object_mut(), fields.as_object()) {
            (Some(target), Some(updates)) => {
                for (key, value) in updates {
                    target.insert(key.clone(), value.clone());
                }
            }
            _ => {
                return Err(RemoteError::Decode(format!(
                    "patch of {}/{} requires object documents",
                    collection, id
                )))
            }
        }

        inner.writes.push(WriteRecord {
            kind: WriteKind::Patch,
            collection,
            id: id.to_string(),
            document: fields,
        });
        inner.publish_write(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscribe_delivers_current_contents_first() {
        let store = MemoryDocumentStore::new();
        store.seed(Collection::Users, "u1", json!({"userId": "u1"}));

        let mut sub = store.subscribe(Collection::Users).await.unwrap();
        let first = sub.next().await.unwrap();
        assert!(!first.has_pending_writes);
        assert!(first.documents.contains_key("u1"));
    }

    #[tokio::test]
    async fn test_write_emits_pending_then_confirmed() {
        let store = MemoryDocumentStore::new();
        let mut sub = store.subscribe(Collection::Threads).await.unwrap();
        let _initial = sub.next().await.unwrap();

        store
            .put(Collection::Threads, "t1", json!({"id": "t1", "messages": []}))
            .await
            .unwrap();

        let echo = sub.next().await.unwrap();
        assert!(echo.has_pending_writes);
        let confirmed = sub.next().await.unwrap();
        assert!(!confirmed.has_pending_writes);
        assert!(confirmed.documents.contains_key("t1"));
    }

    #[tokio::test]
    async fn test_patch_merges_top_level_fields() {
        let store = MemoryDocumentStore::new();
        store.seed(Collection::Threads, "t1", json!({"id": "t1", "messages": [], "createdAt": 3}));

        store
            .patch(Collection::Threads, "t1", json!({"title": "hello"}))
            .await
            .unwrap();

        let doc = store.document(Collection::Threads, "t1").unwrap();
        assert_eq!(doc["title"], "hello");
        assert_eq!(doc["createdAt"], 3);
        assert_eq!(store.writes().len(), 1);
        assert_eq!(store.writes()[0].kind, WriteKind::Patch);
    }

    #[tokio::test]
    async fn test_patch_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let err = store
            .patch(Collection::Threads, "ghost", json!({"title": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { .. }));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_fail_fetches() {
        let store = MemoryDocumentStore::new();
        store.set_fail_fetches(true);
        assert!(store.fetch_all(Collection::Threads).await.is_err());
        store.set_fail_fetches(false);
        assert!(store.fetch_all(Collection::Threads).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let store = MemoryDocumentStore::new();
        let sub = store.subscribe(Collection::Threads).await.unwrap();
        assert_eq!(store.subscriber_count(Collection::Threads), 1);

        sub.unsubscribe();
        assert_eq!(store.subscriber_count(Collection::Threads), 0);
    }
}
