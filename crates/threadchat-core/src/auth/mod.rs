//! Hosted authentication contract.
//!
//! Email/password accounts with a display name set after sign-up. Failures
//! distinguish a rejected credential from everything else, since the two are
//! reported differently to the user.

pub mod form;
pub mod identity_toolkit;
pub mod memory;

pub use form::{AuthAction, AuthForm, AuthStatus};
pub use identity_toolkit::IdentityToolkitAuth;
pub use memory::MemoryAuthProvider;

use async_trait::async_trait;

/// An authenticated account as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    /// Bearer token for follow-up calls on behalf of this account
    pub id_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Auth failed: {0}")]
    Failed(String),
}

impl AuthError {
    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, AuthError::InvalidCredential)
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    async fn update_profile(&self, identity: &AuthIdentity, display_name: &str) -> Result<(), AuthError>;
}
