//! Derived read models for front ends.

use super::app_state::AppState;
use crate::constants::{ANONYMOUS_LABEL, NO_MESSAGES_LABEL};

/// One row of the thread list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub id: String,
    /// Stored title, or `Thread #n` by position in the list
    pub title: String,
    pub preview: String,
    pub last_updated: Option<u64>,
}

/// One sender run inside a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub author: String,
    pub author_email: Option<String>,
    pub texts: Vec<String>,
    pub is_own: bool,
}

/// Thread list ordered by creation time
pub fn thread_summaries(state: &AppState) -> Vec<ThreadSummary> {
    let mut threads: Vec<_> = state.threads.values().collect();
    threads.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    threads
        .into_iter()
        .enumerate()
        .map(|(idx, thread)| {
            let preview = match thread.last_message() {
                None => NO_MESSAGES_LABEL.to_string(),
                Some(last) => {
                    let who = state
                        .user(&last.from)
                        .map(|u| u.initials.as_str())
                        .unwrap_or(ANONYMOUS_LABEL);
                    format!("{}: {}", who, last.last_text())
                }
            };

            ThreadSummary {
                id: thread.id.clone(),
                title: thread
                    .title
                    .clone()
                    .unwrap_or_else(|| format!("Thread #{}", idx + 1)),
                preview,
                last_updated: thread.last_updated,
            }
        })
        .collect()
}

/// Messages of a thread with author labels resolved, or `None` if the thread is unknown
pub fn message_views(state: &AppState, thread_id: &str) -> Option<Vec<MessageView>> {
    let thread = state.thread(thread_id)?;
    let me = state.active_user_id();

    Some(
        thread
            .messages
            .iter()
            .map(|message| {
                let author = state.user(&message.from);
                MessageView {
                    author: author
                        .map(|u| u.display_name.clone())
                        .unwrap_or_else(|| ANONYMOUS_LABEL.to_string()),
                    author_email: author.map(|u| u.email.clone()),
                    texts: message.texts().into_iter().map(str::to_string).collect(),
                    is_own: me == Some(message.from.as_str()),
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Thread, User};

    fn state() -> AppState {
        let mut state = AppState::default();
        let ada = User::new("ada", "ada lovelace", "ada@x.io");
        state.user_list.insert("ada".into(), ada.clone());
        state.active_user = Some(ada);

        let mut first = Thread::new("b-first", 10);
        first.append_message("ada", "hi");
        first.append_message("ada", "there");
        first.last_updated = Some(20);

        let mut second = Thread::new("a-second", 30);
        second.title = Some("Ideas".into());
        second.append_message("stranger", "psst");

        let third = Thread::new("c-third", 40);

        for thread in [first, second, third] {
            state.threads.insert(thread.id.clone(), thread);
        }
        state
    }

    #[test]
    fn test_thread_summaries() {
        let summaries = thread_summaries(&state());
        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b-first", "a-second", "c-third"]);

        assert_eq!(summaries[0].title, "Thread #1");
        assert_eq!(summaries[0].preview, "A: there");
        assert_eq!(summaries[0].last_updated, Some(20));

        assert_eq!(summaries[1].title, "Ideas");
        assert_eq!(summaries[1].preview, "Anonymous: psst");

        assert_eq!(summaries[2].title, "Thread #3");
        assert_eq!(summaries[2].preview, "No messages");
    }

    #[test]
    fn test_message_views() {
        let state = state();
        let views = message_views(&state, "b-first").unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].author, "ada lovelace");
        assert_eq!(views[0].texts, vec!["hi", "there"]);
        assert!(views[0].is_own);

        let views = message_views(&state, "a-second").unwrap();
        assert_eq!(views[0].author, "Anonymous");
        assert!(views[0].author_email.is_none());
        assert!(!views[0].is_own);

        assert!(message_views(&state, "nope").is_none());
    }
}
