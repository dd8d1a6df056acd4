//! Initial load of both remote collections.
//!
//! Runs only from the idle phase: `IDLE -> LOADING`, then `READY` with both
//! collections applied, or `ERROR` with nothing applied if either fetch
//! fails. There is no retry.

use std::collections::HashMap;

use crate::models::{Lifecycle, Thread, User};
use crate::remote::{decode_threads, decode_users, Collection, DocumentStore, RemoteError};
use crate::store::{now_ms, Action, Reconciler};

/// Both collections as read at startup
#[derive(Debug, Default)]
pub struct InitialSnapshot {
    pub threads: HashMap<String, Thread>,
    pub users: HashMap<String, User>,
}

/// Fetch both collections concurrently
pub async fn fetch_initial(store: &dyn DocumentStore) -> Result<InitialSnapshot, RemoteError> {
    let (threads, users) = futures::try_join!(
        store.fetch_all(Collection::Threads),
        store.fetch_all(Collection::Users),
    )?;
    Ok(InitialSnapshot {
        threads: decode_threads(&threads),
        users: decode_users(&users),
    })
}

/// Move from idle to loading. Returns false, changing nothing, from any other phase.
pub fn begin(reconciler: &mut Reconciler) -> bool {
    if reconciler.state().lifecycle != Lifecycle::Idle {
        return false;
    }
    reconciler.apply(Action::SetLifecycle(Lifecycle::Loading), now_ms()).changed
}

/// Apply the fetch result and settle the lifecycle
pub fn finish(reconciler: &mut Reconciler, result: Result<InitialSnapshot, RemoteError>) -> Lifecycle {
    let now = now_ms();
    match result {
        Ok(snapshot) => {
            tracing::info!(
                "loaded {} threads and {} users",
                snapshot.threads.len(),
                snapshot.users.len()
            );
            reconciler.apply(Action::ReplaceThreads(snapshot.threads), now);
            reconciler.apply(Action::MergeUsers(snapshot.users), now);
            reconciler.apply(Action::SetLifecycle(Lifecycle::Ready), now);
        }
        Err(e) => {
            tracing::warn!("initial load failed: {}", e);
            reconciler.apply(Action::SetLifecycle(Lifecycle::Error), now);
        }
    }
    reconciler.state().lifecycle
}

/// Run the whole load if the reconciler is idle; returns the resulting phase
pub async fn run(reconciler: &mut Reconciler, store: &dyn DocumentStore) -> Lifecycle {
    if !begin(reconciler) {
        return reconciler.state().lifecycle;
    }
    let result = fetch_initial(store).await;
    finish(reconciler, result)
}
