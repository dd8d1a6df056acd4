use serde_json::Value;
use std::collections::HashMap;

use crate::models::{Lifecycle, Thread, User};
use crate::remote::{Collection, DocumentStore, RemoteError};

/// Input to the reconciler.
///
/// `SetLifecycle`, `ReplaceThreads` and `MergeUsers` come from bootstrap and
/// replication; the rest are local intents of the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetLifecycle(Lifecycle),
    ReplaceThreads(HashMap<String, Thread>),
    MergeUsers(HashMap<String, User>),
    CreateThread { thread_id: String },
    AppendMessage { thread_id: String, text: String },
    SetTitle { thread_id: String, title: String },
    Login { user: User, is_new: bool },
    Logout,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetLifecycle(_) => "SET_LIFECYCLE",
            Action::ReplaceThreads(_) => "REPLACE_THREADS",
            Action::MergeUsers(_) => "MERGE_USERS",
            Action::CreateThread { .. } => "CREATE_THREAD",
            Action::AppendMessage { .. } => "APPEND_MESSAGE",
            Action::SetTitle { .. } => "SET_TITLE",
            Action::Login { .. } => "LOGIN",
            Action::Logout => "LOGOUT",
        }
    }

    /// Whether the action carries remote state rather than a user intent
    pub fn is_replication(&self) -> bool {
        matches!(self, Action::ReplaceThreads(_) | Action::MergeUsers(_))
    }
}

/// Write the runtime must issue to the document store after a local intent
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteWrite {
    Put {
        collection: Collection,
        id: String,
        document: Value,
    },
    Patch {
        collection: Collection,
        id: String,
        fields: Value,
    },
}

impl RemoteWrite {
    pub fn collection(&self) -> Collection {
        match self {
            RemoteWrite::Put { collection, .. } | RemoteWrite::Patch { collection, .. } => *collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RemoteWrite::Put { id, .. } | RemoteWrite::Patch { id, .. } => id,
        }
    }

    pub async fn execute(&self, store: &dyn DocumentStore) -> Result<(), RemoteError> {
        match self {
            RemoteWrite::Put { collection, id, document } => {
                store.put(*collection, id, document.clone()).await
            }
            RemoteWrite::Patch { collection, id, fields } => {
                store.patch(*collection, id, fields.clone()).await
            }
        }
    }
}
