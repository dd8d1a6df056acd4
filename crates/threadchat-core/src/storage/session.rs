//! Local session persistence.
//!
//! Keeps at most one active identity, written as a timestamped record under
//! [`ACTIVE_USER_KEY`]. Records older than [`SESSION_TTL_MS`] are treated as
//! absent. Independently, a random anonymous sender id is generated on first
//! run and reused afterwards, so a visitor can post before logging in.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::local::{LocalStorage, StorageError};
use crate::constants::{ACTIVE_USER_KEY, ANONYMOUS_USER_ID_KEY, SESSION_TTL_MS};
use crate::models::User;

/// Stored form of the active identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Milliseconds since the Unix epoch when the record was written
    #[serde(rename = "timestamp")]
    pub saved_at: u64,
    pub user: User,
}

impl SessionRecord {
    pub fn new(user: User, saved_at: u64) -> Self {
        Self { saved_at, user }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.saved_at.saturating_add(SESSION_TTL_MS) < now
    }
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn LocalStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Overwrite the session record with `user`, stamped `now`
    pub fn save(&self, user: &User, now: u64) -> Result<(), StorageError> {
        let record = SessionRecord::new(user.clone(), now);
        let json = serde_json::to_string(&record)?;
        self.storage.set(ACTIVE_USER_KEY, &json)
    }

    /// Load the stored identity if it is present, well-formed and fresh.
    ///
    /// Expired, unparseable, or id-less records are removed.
    pub fn load(&self, now: u64) -> Option<User> {
        let raw = self.storage.get(ACTIVE_USER_KEY)?;

        let record = match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("discarding malformed session record: {}", e);
                self.discard();
                return None;
            }
        };

        if record.user.user_id.is_empty() {
            tracing::debug!("discarding session record without a user id");
            self.discard();
            return None;
        }

        if record.is_expired(now) {
            tracing::debug!(
                "discarding expired session for {} (saved_at={})",
                record.user.user_id,
                record.saved_at
            );
            self.discard();
            return None;
        }

        Some(record.user)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(ACTIVE_USER_KEY)
    }

    pub fn anonymous_id(&self) -> Option<String> {
        self.storage.get(ANONYMOUS_USER_ID_KEY)
    }

    /// Return the anonymous sender id, generating and persisting one if absent
    pub fn ensure_anonymous_id(&self) -> Result<String, StorageError> {
        if let Some(id) = self.anonymous_id() {
            return Ok(id);
        }
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.storage.set(ANONYMOUS_USER_ID_KEY, &id)?;
        Ok(id)
    }

    fn discard(&self) {
        if let Err(e) = self.clear() {
            tracing::warn!("failed to remove stale session record: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const HOUR_MS: u64 = 60 * 60 * 1000;

    fn store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), SessionStore::new(storage))
    }

    #[test]
    fn test_is_expired_boundary() {
        let record = SessionRecord::new(User::new("u", "Ada", "a@x.io"), 1_000);
        assert!(!record.is_expired(1_000));
        assert!(!record.is_expired(1_000 + SESSION_TTL_MS));
        assert!(record.is_expired(1_000 + SESSION_TTL_MS + 1));
    }

    #[test]
    fn test_fresh_session_loads() {
        let (_, sessions) = store();
        let user = User::new("u1", "Ada", "ada@x.io");
        let now = 100 * HOUR_MS;

        sessions.save(&user, now - HOUR_MS).unwrap();
        assert_eq!(sessions.load(now), Some(user));
    }

    #[test]
    fn test_session_older_than_a_day_is_ignored_and_removed() {
        let (storage, sessions) = store();
        let now = 100 * HOUR_MS;

        sessions.save(&User::new("u1", "Ada", "ada@x.io"), now - 25 * HOUR_MS).unwrap();
        assert!(sessions.load(now).is_none());
        assert!(storage.get(ACTIVE_USER_KEY).is_none());
    }

    #[test]
    fn test_malformed_session_is_discarded() {
        let (storage, sessions) = store();
        storage.set(ACTIVE_USER_KEY, "{\"timestamp\": \"soon\"}").unwrap();

        assert!(sessions.load(0).is_none());
        assert!(storage.get(ACTIVE_USER_KEY).is_none());
    }

    #[test]
    fn test_session_without_user_id_is_discarded() {
        let (storage, sessions) = store();
        storage
            .set(
                ACTIVE_USER_KEY,
                r#"{"timestamp": 10, "user": {"displayName": "Ada", "email": "ada@x.io"}}"#,
            )
            .unwrap();

        assert!(sessions.load(20).is_none());
        assert!(storage.get(ACTIVE_USER_KEY).is_none());
    }

    #[test]
    fn test_record_uses_timestamp_field() {
        let (storage, sessions) = store();
        sessions.save(&User::new("u1", "Ada", "ada@x.io"), 42).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&storage.get(ACTIVE_USER_KEY).unwrap()).unwrap();
        assert_eq!(raw["timestamp"], 42);
        assert_eq!(raw["user"]["userId"], "u1");
    }

    #[test]
    fn test_anonymous_id_is_stable() {
        let (_, sessions) = store();
        assert!(sessions.anonymous_id().is_none());

        let first = sessions.ensure_anonymous_id().unwrap();
        let second = sessions.ensure_anonymous_id().unwrap();
        assert_eq!(first, second);
        assert_eq!(sessions.anonymous_id(), Some(first));
    }
}
