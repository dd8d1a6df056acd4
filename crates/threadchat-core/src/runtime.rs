//! Runtime glue.
//!
//! `ChatRuntime` is the single owner of the reconciler. It executes the
//! remote writes local intents produce, drains replication actions from the
//! watcher channel, and keeps the watcher subscribed for the current
//! implicit sender.
//!
//! A snapshot whose read started before the runtime's latest write to the
//! same collection cannot contain that write and is dropped, so it never
//! reverts optimistic state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::{AuthForm, AuthProvider, IdentityToolkitAuth};
use crate::bootstrap;
use crate::config::ChatConfig;
use crate::models::Lifecycle;
use crate::remote::{Collection, DocumentStore, FirestoreStore};
use crate::storage::{FileStorage, SessionStore};
use crate::store::{now_ms, Action, AppState, Reconciler};
use crate::watcher::{ReplicationEvent, ReplicationWatcher};

pub struct ChatRuntime {
    reconciler: Reconciler,
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    watcher: ReplicationWatcher,
    replication_rx: mpsc::UnboundedReceiver<ReplicationEvent>,
    last_write_started: HashMap<Collection, Instant>,
    watching: bool,
}

impl ChatRuntime {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>, session: SessionStore) -> Self {
        let (tx, replication_rx) = mpsc::unbounded_channel();
        let watcher = ReplicationWatcher::new(store.clone(), tx);
        Self {
            reconciler: Reconciler::new(session, now_ms()),
            store,
            auth,
            watcher,
            replication_rx,
            last_write_started: HashMap::new(),
            watching: false,
        }
    }

    /// Runtime backed by Firestore, Identity Toolkit and file storage
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let project_id = config.project_id()?;
        let api_key = config.api_key()?.to_string();
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data dir: {}", data_dir.display()))?;

        let store = FirestoreStore::new(project_id, Some(api_key.clone()), config.poll_interval());
        let auth = IdentityToolkitAuth::new(api_key);
        let session = SessionStore::new(Arc::new(FileStorage::new(&data_dir)));
        Ok(Self::new(Arc::new(store), Arc::new(auth), session))
    }

    pub fn state(&self) -> &AppState {
        self.reconciler.state()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    pub fn is_watching(&self) -> bool {
        self.watching && self.watcher.is_running()
    }

    /// Run the initial load; a no-op after the first call
    pub async fn bootstrap(&mut self) -> Lifecycle {
        bootstrap::run(&mut self.reconciler, self.store.as_ref()).await
    }

    /// Subscribe to both change feeds for the implicit sender
    pub async fn start_watching(&mut self) -> Result<()> {
        self.watching = true;
        let identity = self.reconciler.implicit_sender();
        self.watcher
            .sync_identity(identity)
            .await
            .context("Failed to subscribe to change feeds")
    }

    /// Bootstrap, then keep the change feeds open
    pub async fn start(&mut self) -> Result<Lifecycle> {
        let lifecycle = self.bootstrap().await;
        self.start_watching().await?;
        Ok(lifecycle)
    }

    /// Apply one action and replicate its effects.
    ///
    /// Remote writes are issued in order; a failed write is logged and the
    /// optimistic state is kept. Returns whether the state changed.
    pub async fn dispatch(&mut self, action: Action) -> bool {
        let transition = self.reconciler.apply(action, now_ms());

        for write in &transition.writes {
            self.last_write_started.insert(write.collection(), Instant::now());
            if let Err(e) = write.execute(self.store.as_ref()).await {
                warn!("write to {}/{} failed: {}", write.collection(), write.id(), e);
            }
        }

        self.resync_watcher().await;
        transition.changed
    }

    /// Submit an auth form and dispatch the resulting login.
    /// Returns true when a user was logged in.
    pub async fn submit_auth(
        &mut self,
        form: &mut AuthForm,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> bool {
        let auth = self.auth.clone();
        match form.submit(auth.as_ref(), email, password, display_name).await {
            Some(action) => {
                self.dispatch(action).await;
                true
            }
            None => false,
        }
    }

    /// Apply every replication action already queued. Returns how many changed state.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.replication_rx.try_recv() {
            if self.apply_replication(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next replication action and apply it.
    /// Returns `None` once the channel is closed.
    pub async fn next_replication(&mut self) -> Option<bool> {
        let event = self.replication_rx.recv().await?;
        Some(self.apply_replication(event))
    }

    fn apply_replication(&mut self, event: ReplicationEvent) -> bool {
        let ReplicationEvent {
            collection,
            read_at,
            action,
        } = event;
        debug_assert!(action.is_replication());

        if let Some(written_at) = self.last_write_started.get(&collection) {
            if read_at < *written_at {
                debug!("dropping {} snapshot read before our last write", collection);
                return false;
            }
        }

        debug!("replication {}", action.name());
        let transition = self.reconciler.apply(action, now_ms());
        if !transition.writes.is_empty() {
            warn!("replication produced {} writes, dropping them", transition.writes.len());
        }
        transition.changed
    }

    async fn resync_watcher(&mut self) {
        if !self.watching {
            return;
        }
        let identity = self.reconciler.implicit_sender();
        if identity.as_deref() == self.watcher.identity() {
            return;
        }
        info!("implicit sender changed, resubscribing");
        if let Err(e) = self.watcher.sync_identity(identity).await {
            warn!("failed to resubscribe: {}", e);
        }
    }

    /// Cancel the change feeds
    pub fn shutdown(&mut self) {
        self.watching = false;
        self.watcher.stop();
    }
}
