//! Log-in / sign-up form state.
//!
//! Drives one submission against an [`AuthProvider`] and turns a successful
//! one into a `Login` intent for the reconciler. Failures stay local to the
//! form as a status plus a user-facing message; the status falls back to
//! idle shortly after settling so the form can be submitted again.

use std::time::{Duration, Instant};

use super::{AuthError, AuthProvider};
use crate::constants::AUTH_FORM_RESET_MS;
use crate::models::User;
use crate::store::Action;

pub const INVALID_CREDENTIAL_MESSAGE: &str = "Invalid e-mail/password. User not found";
pub const LOG_IN_FAILED_MESSAGE: &str = "Could not get account details";
pub const SIGN_UP_FAILED_MESSAGE: &str = "Could not create your user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    LogIn,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Idle,
    Loading,
    Updating,
    Done,
    Error,
}

pub struct AuthForm {
    action: AuthAction,
    status: AuthStatus,
    error_message: Option<String>,
    settled_at: Option<Instant>,
}

impl AuthForm {
    pub fn new(action: AuthAction) -> Self {
        Self {
            action,
            status: AuthStatus::Idle,
            error_message: None,
            settled_at: None,
        }
    }

    pub fn action(&self) -> AuthAction {
        self.action
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Submit the form.
    ///
    /// Returns the `Login` intent on success. Returns `None` without touching
    /// the provider when the form is busy or a required field is empty, and
    /// `None` with an error status when the provider rejects the request.
    pub async fn submit(
        &mut self,
        auth: &dyn AuthProvider,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Option<Action> {
        if self.status != AuthStatus::Idle {
            return None;
        }
        self.error_message = None;
        if email.is_empty() || password.is_empty() {
            return None;
        }

        self.set_status(AuthStatus::Loading);
        let result = self.run(auth, email, password, display_name).await;
        self.settled_at = Some(Instant::now());

        match result {
            Ok(user) => {
                self.set_status(AuthStatus::Done);
                Some(Action::Login {
                    user,
                    is_new: self.action == AuthAction::SignUp,
                })
            }
            Err(e) => {
                tracing::warn!("{:?} failed: {}", self.action, e);
                self.set_status(AuthStatus::Error);
                self.error_message = Some(self.failure_message(&e).to_string());
                None
            }
        }
    }

    async fn run(
        &mut self,
        auth: &dyn AuthProvider,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        let identity = match self.action {
            AuthAction::LogIn => auth.sign_in(email, password).await?,
            AuthAction::SignUp => auth.sign_up(email, password).await?,
        };

        let name = match self.action {
            AuthAction::LogIn => identity.display_name.clone().unwrap_or_default(),
            AuthAction::SignUp => {
                self.set_status(AuthStatus::Updating);
                let name = display_name.unwrap_or_default();
                auth.update_profile(&identity, name).await?;
                name.to_string()
            }
        };

        Ok(User::new(identity.uid, name, email))
    }

    fn failure_message(&self, error: &AuthError) -> &'static str {
        if error.is_invalid_credential() {
            return INVALID_CREDENTIAL_MESSAGE;
        }
        match self.action {
            AuthAction::LogIn => LOG_IN_FAILED_MESSAGE,
            AuthAction::SignUp => SIGN_UP_FAILED_MESSAGE,
        }
    }

    /// Return to idle once the reset delay has passed since settling.
    /// Returns true when the status changed.
    pub fn poll_reset(&mut self, now: Instant) -> bool {
        let Some(settled_at) = self.settled_at else {
            return false;
        };
        if now.saturating_duration_since(settled_at) < Duration::from_millis(AUTH_FORM_RESET_MS) {
            return false;
        }
        self.settled_at = None;
        self.set_status(AuthStatus::Idle);
        true
    }

    fn set_status(&mut self, status: AuthStatus) {
        tracing::debug!("auth form {:?}: {:?} -> {:?}", self.action, self.status, status);
        self.status = status;
    }
}
