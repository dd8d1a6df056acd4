use std::collections::HashMap;

use crate::models::{Lifecycle, Thread, User};

/// Client view of the chat, owned by the [`Reconciler`](super::Reconciler)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub lifecycle: Lifecycle,
    pub active_user: Option<User>,
    pub user_list: HashMap<String, User>, // user_id -> profile
    pub threads: HashMap<String, Thread>,  // thread id -> thread
}

impl AppState {
    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.get(thread_id)
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.user_list.get(user_id)
    }

    pub fn active_user_id(&self) -> Option<&str> {
        self.active_user.as_ref().map(|u| u.user_id.as_str())
    }
}
