use serde::{Deserialize, Serialize};

use super::message::Message;

/// A conversation record, replicated from the remote `threads` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Filled from the document id when the stored document lacks it
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,
}

impl Thread {
    pub fn new(id: impl Into<String>, created_at: u64) -> Self {
        Self {
            id: id.into(),
            title: None,
            messages: Vec::new(),
            created_at,
            last_updated: None,
        }
    }

    /// Short random id for a new thread
    pub fn generate_id() -> String {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(11);
        id
    }

    /// Append `text` from `sender`, grouping it into the last message's
    /// consecutive run when that message has the same sender.
    pub fn append_message(&mut self, sender: &str, text: &str) {
        match self.messages.last_mut() {
            Some(last) if last.from == sender => last.push_consecutive(text),
            _ => self.messages.push(Message::new(sender, text)),
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_short_and_distinct() {
        let a = Thread::generate_id();
        let b = Thread::generate_id();
        assert_eq!(a.len(), 11);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_sender_groups_into_consecutive() {
        let mut thread = Thread::new("t1", 0);
        thread.append_message("a", "hi");
        thread.append_message("a", "there");

        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].message, "hi");
        assert_eq!(thread.messages[0].texts(), vec!["hi", "there"]);
    }

    #[test]
    fn test_sender_change_starts_new_entry() {
        let mut thread = Thread::new("t1", 0);
        thread.append_message("a", "hi");
        thread.append_message("b", "hello");
        thread.append_message("a", "how are you");
        thread.append_message("a", "?");

        let senders: Vec<&str> = thread.messages.iter().map(|m| m.from.as_str()).collect();
        assert_eq!(senders, vec!["a", "b", "a"]);
        assert!(thread.messages[1].consecutive.is_none());
        assert_eq!(thread.messages[2].texts(), vec!["how are you", "?"]);
    }

    #[test]
    fn test_deserialize_sparse_document() {
        let thread: Thread = serde_json::from_str(r#"{"messages": [], "createdAt": 42}"#).unwrap();
        assert!(thread.id.is_empty());
        assert_eq!(thread.created_at, 42);
        assert!(thread.title.is_none());
        assert!(thread.last_updated.is_none());
    }

    #[test]
    fn test_serialize_camel_case() {
        let mut thread = Thread::new("t1", 5);
        thread.last_updated = Some(7);
        let json = serde_json::to_value(&thread).unwrap();
        assert_eq!(json["createdAt"], 5);
        assert_eq!(json["lastUpdated"], 7);
        assert!(json.get("title").is_none());
    }
}
