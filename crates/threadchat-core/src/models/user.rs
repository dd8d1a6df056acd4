use serde::{Deserialize, Serialize};

/// Public profile of a chat participant.
///
/// Stored in the remote `users` collection keyed by `user_id` and cached in
/// the local session record for the active user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Filled from the document id when the stored document lacks it
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub initials: String,
}

impl User {
    /// Build a profile, deriving initials from the display name.
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let initials = derive_initials(&display_name);
        Self {
            user_id: user_id.into(),
            display_name,
            email: email.into(),
            initials,
        }
    }

    /// Recompute `initials` from the current display name
    pub fn with_derived_initials(mut self) -> Self {
        self.initials = derive_initials(&self.display_name);
        self
    }
}

/// Uppercased first letter of the first word of `display_name`.
/// Empty when the name has no words.
pub fn derive_initials(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .next()
        .and_then(|word| word.chars().next())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials_from_first_word_only() {
        assert_eq!(derive_initials("ada lovelace"), "A");
        assert_eq!(derive_initials("  grace   hopper"), "G");
        assert_eq!(derive_initials("Émile"), "É");
    }

    #[test]
    fn test_initials_empty_name() {
        assert_eq!(derive_initials(""), "");
        assert_eq!(derive_initials("   "), "");
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User::new("u1", "ada lovelace", "ada@example.com");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["displayName"], "ada lovelace");
        assert_eq!(json["initials"], "A");
    }

    #[test]
    fn test_user_missing_optional_fields() {
        let user: User = serde_json::from_str(r#"{"userId": "u2"}"#).unwrap();
        assert_eq!(user.user_id, "u2");
        assert!(user.display_name.is_empty());
        assert!(user.initials.is_empty());
    }
}
