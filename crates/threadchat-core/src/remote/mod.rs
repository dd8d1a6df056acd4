//! Remote document store contract.
//!
//! The chat state lives in a hosted document database with two collections,
//! `threads` and `users`. Everything the core needs from it is a one-shot
//! read, a change feed, and create/merge writes.

pub mod firestore;
pub mod firestore_value;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::{MemoryDocumentStore, WriteKind, WriteRecord};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::constants::collections;
use crate::models::{Thread, User};

/// Documents of one collection keyed by document id
pub type DocumentMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Threads,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Threads => collections::THREADS,
            Collection::Users => collections::USERS,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One read of a collection delivered by a change feed
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Set when the snapshot includes local writes the backend has not confirmed yet
    pub has_pending_writes: bool,
    pub documents: DocumentMap,
    /// When the read behind this snapshot started
    pub read_at: Instant,
}

impl Snapshot {
    pub fn confirmed(documents: DocumentMap) -> Self {
        Self {
            has_pending_writes: false,
            documents,
            read_at: Instant::now(),
        }
    }

    pub fn pending(documents: DocumentMap) -> Self {
        Self {
            has_pending_writes: true,
            documents,
            read_at: Instant::now(),
        }
    }

    pub fn with_read_at(mut self, read_at: Instant) -> Self {
        self.read_at = read_at;
        self
    }
}

/// Live change feed for one collection.
///
/// Dropping the subscription cancels it.
pub struct Subscription {
    snapshots: mpsc::UnboundedReceiver<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// `task`, when given, is the producer feeding `snapshots`; it is aborted on cancel
    pub fn new(snapshots: mpsc::UnboundedReceiver<Snapshot>, task: Option<JoinHandle<()>>) -> Self {
        Self { snapshots, task }
    }

    pub async fn next(&mut self) -> Option<Snapshot> {
        self.snapshots.recv().await
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.snapshots.close();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Document {collection}/{id} not found")]
    NotFound { collection: Collection, id: String },

    #[error("Malformed backend response: {0}")]
    Decode(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read every document of `collection` once
    async fn fetch_all(&self, collection: Collection) -> Result<DocumentMap, RemoteError>;

    /// Open a change feed. The first snapshot reflects the current contents.
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, RemoteError>;

    /// Create or overwrite a document
    async fn put(&self, collection: Collection, id: &str, document: Value) -> Result<(), RemoteError>;

    /// Merge the top-level fields of `fields` into an existing document
    async fn patch(&self, collection: Collection, id: &str, fields: Value) -> Result<(), RemoteError>;
}

/// Decode thread documents, skipping those that do not parse
pub fn decode_threads(documents: &DocumentMap) -> HashMap<String, Thread> {
    let mut threads = HashMap::with_capacity(documents.len());
    for (id, document) in documents {
        match serde_json::from_value::<Thread>(document.clone()) {
            Ok(mut thread) => {
                if thread.id.is_empty() {
                    thread.id = id.clone();
                }
                threads.insert(id.clone(), thread);
            }
            Err(e) => tracing::warn!("skipping malformed thread document {}: {}", id, e),
        }
    }
    threads
}

/// Decode user documents, skipping those that do not parse
pub fn decode_users(documents: &DocumentMap) -> HashMap<String, User> {
    let mut users = HashMap::with_capacity(documents.len());
    for (id, document) in documents {
        match serde_json::from_value::<User>(document.clone()) {
            Ok(mut user) => {
                if user.user_id.is_empty() {
                    user.user_id = id.clone();
                }
                if user.initials.is_empty() {
                    user = user.with_derived_initials();
                }
                users.insert(id.clone(), user);
            }
            Err(e) => tracing::warn!("skipping malformed user document {}: {}", id, e),
        }
    }
    users
}
