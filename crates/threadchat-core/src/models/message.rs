use serde::{Deserialize, Serialize};

/// A follow-up line grouped under the first message of a same-sender run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsecutiveMessage {
    pub message: String,
}

/// Top-level entry of a thread.
///
/// Messages sent back to back by the same sender are not stored as separate
/// entries; they are appended to `consecutive` of the first message of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive: Option<Vec<ConsecutiveMessage>>,
}

impl Message {
    pub fn new(from: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            message: message.into(),
            consecutive: None,
        }
    }

    pub fn push_consecutive(&mut self, message: impl Into<String>) {
        self.consecutive
            .get_or_insert_with(Vec::new)
            .push(ConsecutiveMessage { message: message.into() });
    }

    /// Text of the latest line in this run
    pub fn last_text(&self) -> &str {
        self.consecutive
            .as_ref()
            .and_then(|run| run.last())
            .map(|c| c.message.as_str())
            .unwrap_or(&self.message)
    }

    /// All lines of the run in send order
    pub fn texts(&self) -> Vec<&str> {
        std::iter::once(self.message.as_str())
            .chain(
                self.consecutive
                    .iter()
                    .flatten()
                    .map(|c| c.message.as_str()),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_text_prefers_consecutive_run() {
        let mut message = Message::new("a", "hi");
        assert_eq!(message.last_text(), "hi");

        message.push_consecutive("there");
        message.push_consecutive("again");
        assert_eq!(message.last_text(), "again");
        assert_eq!(message.texts(), vec!["hi", "there", "again"]);
    }

    #[test]
    fn test_consecutive_omitted_when_absent() {
        let json = serde_json::to_value(Message::new("a", "hi")).unwrap();
        assert!(json.get("consecutive").is_none());

        let parsed: Message =
            serde_json::from_str(r#"{"from":"a","message":"hi","consecutive":[{"message":"yo"}]}"#)
                .unwrap();
        assert_eq!(parsed.texts(), vec!["hi", "yo"]);
    }
}
