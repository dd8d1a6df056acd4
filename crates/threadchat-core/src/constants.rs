//! Application-wide constants
//!
//! Storage keys, collection names and timing values shared across modules.

/// Local storage key holding the serialized session record
pub const ACTIVE_USER_KEY: &str = "chat/active-user";

/// Local storage key holding the generated anonymous sender id
pub const ANONYMOUS_USER_ID_KEY: &str = "chat/anonymous-active-user";

/// Sessions older than this are treated as absent on bootstrap
pub const SESSION_TTL_MS: u64 = 24 * 60 * 60 * 1000; // 24 hours

/// Delay after which a settled auth form returns to idle
pub const AUTH_FORM_RESET_MS: u64 = 1000;

/// Default interval between polls of a remote collection
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Author label for messages whose sender has no known profile
pub const ANONYMOUS_LABEL: &str = "Anonymous";

/// Preview shown for threads without messages
pub const NO_MESSAGES_LABEL: &str = "No messages";

/// Remote collection names
pub mod collections {
    pub const THREADS: &str = "threads";
    pub const USERS: &str = "users";
}

/// Firebase REST endpoints
pub mod endpoints {
    pub const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";
    pub const IDENTITY_TOOLKIT_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
}
