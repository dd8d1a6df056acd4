//! Client-side state machine.
//!
//! Every change to [`AppState`] goes through [`Reconciler::apply`], one
//! action at a time. Local intents update the state optimistically and
//! return the remote writes needed to replicate them; replication actions
//! only replace or merge state and never produce writes, so a snapshot of
//! our own write cannot trigger another write.
//!
//! Intents other than `Login`/`Logout` need an implicit sender: the active
//! user, or the anonymous id generated on first run. Without one they are
//! ignored.

use serde::Serialize;
use tracing::{debug, warn};

use super::actions::{Action, RemoteWrite};
use super::app_state::AppState;
use crate::models::{Lifecycle, Thread, User};
use crate::remote::Collection;
use crate::storage::SessionStore;

/// Outcome of one [`Reconciler::apply`] call
#[derive(Debug, Default, PartialEq)]
pub struct Transition {
    pub changed: bool,
    pub writes: Vec<RemoteWrite>,
}

impl Transition {
    fn unchanged() -> Self {
        Self::default()
    }

    fn applied(writes: Vec<RemoteWrite>) -> Self {
        Self { changed: true, writes }
    }
}

pub struct Reconciler {
    state: AppState,
    session: SessionStore,
}

impl Reconciler {
    /// Build the initial state from the stored session.
    ///
    /// A fresh session record seeds the active user; expired or malformed
    /// records are dropped by the session store. The anonymous id is created
    /// here if this is the first run.
    pub fn new(session: SessionStore, now: u64) -> Self {
        let mut state = AppState::default();

        if let Some(user) = session.load(now) {
            debug!("restored session for {}", user.user_id);
            state.user_list.insert(user.user_id.clone(), user.clone());
            state.active_user = Some(user);
        }

        if let Err(e) = session.ensure_anonymous_id() {
            warn!("could not persist anonymous id: {}", e);
        }

        Self { state, session }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Id messages are attributed to: the active user, else the anonymous id
    pub fn implicit_sender(&self) -> Option<String> {
        self.state
            .active_user
            .as_ref()
            .map(|u| u.user_id.clone())
            .or_else(|| self.session.anonymous_id())
    }

    pub fn apply(&mut self, action: Action, now: u64) -> Transition {
        debug!("apply {}", action.name());

        match action {
            Action::Login { user, is_new } => self.login(user, is_new, now),
            Action::Logout => self.logout(),
            action => {
                let Some(sender) = self.implicit_sender() else {
                    debug!("no implicit sender, ignoring {}", action.name());
                    return Transition::unchanged();
                };
                self.apply_as(&sender, action, now)
            }
        }
    }

    fn apply_as(&mut self, sender: &str, action: Action, now: u64) -> Transition {
        match action {
            Action::SetLifecycle(phase) => self.set_lifecycle(phase),
            Action::ReplaceThreads(threads) => {
                self.state.threads = threads;
                Transition::applied(Vec::new())
            }
            Action::MergeUsers(users) => {
                self.state.user_list.extend(users);
                Transition::applied(Vec::new())
            }
            Action::CreateThread { thread_id } => self.create_thread(thread_id, now),
            Action::AppendMessage { thread_id, text } => {
                self.append_message(sender, &thread_id, &text, now)
            }
            Action::SetTitle { thread_id, title } => self.set_title(&thread_id, title, now),
            Action::Login { .. } | Action::Logout => Transition::unchanged(),
        }
    }

    fn set_lifecycle(&mut self, phase: Lifecycle) -> Transition {
        if self.state.lifecycle == phase {
            return Transition::unchanged();
        }
        tracing::info!("lifecycle {} -> {}", self.state.lifecycle, phase);
        self.state.lifecycle = phase;
        Transition::applied(Vec::new())
    }

    fn create_thread(&mut self, thread_id: String, now: u64) -> Transition {
        if self.state.threads.contains_key(&thread_id) {
            return Transition::unchanged();
        }

        self.touch_session(now);

        let thread = Thread::new(thread_id.clone(), now);
        let writes = to_document(&thread)
            .map(|document| RemoteWrite::Put {
                collection: Collection::Threads,
                id: thread_id.clone(),
                document,
            })
            .into_iter()
            .collect();

        self.state.threads.insert(thread_id, thread);
        Transition::applied(writes)
    }

    fn append_message(&mut self, sender: &str, thread_id: &str, text: &str, now: u64) -> Transition {
        let text = text.trim();
        if text.is_empty() {
            return Transition::unchanged();
        }

        let Some(thread) = self.state.threads.get(thread_id) else {
            warn!("message for unknown thread {} dropped", thread_id);
            return Transition::unchanged();
        };

        let mut thread = thread.clone();
        thread.append_message(sender, text);
        thread.last_updated = Some(now);

        self.touch_session(now);
        self.replace_thread(thread)
    }

    fn set_title(&mut self, thread_id: &str, title: String, now: u64) -> Transition {
        let Some(thread) = self.state.threads.get(thread_id) else {
            warn!("title for unknown thread {} dropped", thread_id);
            return Transition::unchanged();
        };
        if thread.title.as_deref() == Some(title.as_str()) {
            return Transition::unchanged();
        }

        let mut thread = thread.clone();
        thread.title = Some(title);
        thread.last_updated = Some(now);

        self.touch_session(now);
        self.replace_thread(thread)
    }

    /// Store an edited thread locally and emit the full-document update
    fn replace_thread(&mut self, thread: Thread) -> Transition {
        let writes = to_document(&thread)
            .map(|fields| RemoteWrite::Patch {
                collection: Collection::Threads,
                id: thread.id.clone(),
                fields,
            })
            .into_iter()
            .collect();

        self.state.threads.insert(thread.id.clone(), thread);
        Transition::applied(writes)
    }

    fn login(&mut self, user: User, is_new: bool, now: u64) -> Transition {
        let user = user.with_derived_initials();

        if let Err(e) = self.session.save(&user, now) {
            warn!("could not persist session for {}: {}", user.user_id, e);
        }

        let already_active = self.state.active_user_id() == Some(user.user_id.as_str());
        let mut writes = Vec::new();
        if is_new && !already_active {
            if let Some(document) = to_document(&user) {
                writes.push(RemoteWrite::Put {
                    collection: Collection::Users,
                    id: user.user_id.clone(),
                    document,
                });
            }
        }

        tracing::info!("logged in as {}", user.user_id);
        self.state.user_list.insert(user.user_id.clone(), user.clone());
        self.state.active_user = Some(user);
        Transition::applied(writes)
    }

    fn logout(&mut self) -> Transition {
        if let Err(e) = self.session.clear() {
            warn!("could not clear session: {}", e);
        }
        if self.state.active_user.take().is_none() {
            return Transition::unchanged();
        }
        tracing::info!("logged out");
        Transition::applied(Vec::new())
    }

    /// Refresh the stored session timestamp for the active user
    fn touch_session(&self, now: u64) {
        if let Some(user) = &self.state.active_user {
            if let Err(e) = self.session.save(user, now) {
                warn!("could not refresh session for {}: {}", user.user_id, e);
            }
        }
    }
}

fn to_document<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(document) => Some(document),
        Err(e) => {
            warn!("could not serialize document: {}", e);
            None
        }
    }
}
