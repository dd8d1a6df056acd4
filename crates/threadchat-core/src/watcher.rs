//! Replication watcher.
//!
//! Keeps one change feed open per collection while an identity is
//! resolvable and forwards confirmed snapshots to the runtime as
//! `ReplaceThreads` / `MergeUsers`. Snapshots flagged with pending writes
//! are echoes of our own optimistic updates and are dropped.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::remote::{decode_threads, decode_users, Collection, DocumentStore, RemoteError, Snapshot, Subscription};
use crate::store::Action;

/// Translate a snapshot into the action that applies it, or `None` for an echo
pub fn snapshot_action(collection: Collection, snapshot: &Snapshot) -> Option<Action> {
    if snapshot.has_pending_writes {
        return None;
    }
    Some(match collection {
        Collection::Threads => Action::ReplaceThreads(decode_threads(&snapshot.documents)),
        Collection::Users => Action::MergeUsers(decode_users(&snapshot.documents)),
    })
}

/// A confirmed snapshot, decoded into the action that applies it
#[derive(Debug, Clone)]
pub struct ReplicationEvent {
    pub collection: Collection,
    pub read_at: Instant,
    pub action: Action,
}

pub struct ReplicationWatcher {
    store: Arc<dyn DocumentStore>,
    tx: mpsc::UnboundedSender<ReplicationEvent>,
    identity: Option<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl ReplicationWatcher {
    pub fn new(store: Arc<dyn DocumentStore>, tx: mpsc::UnboundedSender<ReplicationEvent>) -> Self {
        Self {
            store,
            tx,
            identity: None,
            tasks: Vec::new(),
        }
    }

    /// Identity the current subscriptions were opened for
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Bring subscriptions in line with `identity`.
    ///
    /// No identity stops watching; a different identity resubscribes; the
    /// same identity keeps the running feeds.
    pub async fn sync_identity(&mut self, identity: Option<String>) -> Result<(), RemoteError> {
        if identity.is_some() && identity == self.identity && self.is_running() {
            return Ok(());
        }

        self.stop();
        let Some(identity) = identity else {
            return Ok(());
        };

        info!("subscribing to change feeds for {}", identity);
        for collection in [Collection::Threads, Collection::Users] {
            let subscription = self.store.subscribe(collection).await?;
            self.tasks.push(forward(collection, subscription, self.tx.clone()));
        }
        self.identity = Some(identity);
        Ok(())
    }

    /// Cancel both feeds
    pub fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        debug!("cancelling change feeds");
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.identity = None;
    }
}

impl Drop for ReplicationWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward(
    collection: Collection,
    mut subscription: Subscription,
    tx: mpsc::UnboundedSender<ReplicationEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            let Some(action) = snapshot_action(collection, &snapshot) else {
                debug!("dropping {} snapshot with pending writes", collection);
                continue;
            };
            let event = ReplicationEvent {
                collection,
                read_at: snapshot.read_at,
                action,
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{DocumentMap, MemoryDocumentStore};
    use serde_json::json;
    use std::time::Duration;

    fn docs() -> DocumentMap {
        let mut documents = DocumentMap::new();
        documents.insert("t1".into(), json!({"id": "t1", "messages": [], "createdAt": 1}));
        documents
    }

    #[test]
    fn test_pending_snapshots_are_echoes() {
        assert!(snapshot_action(Collection::Threads, &Snapshot::pending(docs())).is_none());
        match snapshot_action(Collection::Threads, &Snapshot::confirmed(docs())) {
            Some(Action::ReplaceThreads(threads)) => assert!(threads.contains_key("t1")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            snapshot_action(Collection::Users, &Snapshot::confirmed(DocumentMap::new())),
            Some(Action::MergeUsers(_))
        ));
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<ReplicationEvent>) -> Action {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for action")
            .expect("channel closed")
            .action
    }

    #[tokio::test]
    async fn test_own_write_arrives_once_confirmed() {
        let store = Arc::new(MemoryDocumentStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = ReplicationWatcher::new(store.clone(), tx);
        watcher.sync_identity(Some("anon".into())).await.unwrap();

        // Initial snapshots of both collections
        let mut initial = vec![recv(&mut rx).await, recv(&mut rx).await];
        initial.sort_by_key(|a| a.name());
        assert_eq!(initial[0].name(), "MERGE_USERS");
        assert_eq!(initial[1].name(), "REPLACE_THREADS");

        store
            .put(Collection::Threads, "t1", json!({"id": "t1", "messages": []}))
            .await
            .unwrap();

        match recv(&mut rx).await {
            Action::ReplaceThreads(threads) => assert!(threads.contains_key("t1")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_identity_changes_resubscribe_and_none_stops() {
        let store = Arc::new(MemoryDocumentStore::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut watcher = ReplicationWatcher::new(store.clone(), tx);

        watcher.sync_identity(Some("anon".into())).await.unwrap();
        assert_eq!(watcher.identity(), Some("anon"));
        assert_eq!(store.subscriber_count(Collection::Threads), 1);

        // Same identity keeps the feeds
        watcher.sync_identity(Some("anon".into())).await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(store.subscriber_count(Collection::Threads), 1);

        watcher.sync_identity(Some("ada".into())).await.unwrap();
        assert_eq!(watcher.identity(), Some("ada"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.subscriber_count(Collection::Threads), 1);

        watcher.sync_identity(None).await.unwrap();
        assert!(!watcher.is_running());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.subscriber_count(Collection::Threads), 0);
        assert_eq!(store.subscriber_count(Collection::Users), 0);
    }
}
