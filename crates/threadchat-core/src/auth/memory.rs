use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{AuthError, AuthIdentity, AuthProvider};

struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
}

/// In-process account registry for tests and offline use
#[derive(Default)]
pub struct MemoryAuthProvider {
    accounts: Mutex<HashMap<String, Account>>,
    fail_profile_updates: Mutex<bool>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account directly, returning its uid
    pub fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> String {
        let uid = uuid::Uuid::new_v4().simple().to_string();
        self.accounts.lock().insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
                display_name: display_name.map(str::to_string),
            },
        );
        uid
    }

    pub fn set_fail_profile_updates(&self, fail: bool) {
        *self.fail_profile_updates.lock() = fail;
    }

    pub fn display_name(&self, email: &str) -> Option<String> {
        self.accounts
            .lock()
            .get(email)
            .and_then(|account| account.display_name.clone())
    }
}

fn identity(email: &str, account: &Account) -> AuthIdentity {
    AuthIdentity {
        uid: account.uid.clone(),
        email: email.to_string(),
        display_name: account.display_name.clone(),
        id_token: format!("memory-token-{}", account.uid),
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let accounts = self.accounts.lock();
        match accounts.get(email) {
            Some(account) if account.password == password => Ok(identity(email, account)),
            _ => Err(AuthError::InvalidCredential),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        if self.accounts.lock().contains_key(email) {
            return Err(AuthError::Failed("EMAIL_EXISTS".to_string()));
        }
        self.register(email, password, None);
        let accounts = self.accounts.lock();
        let account = accounts
            .get(email)
            .ok_or_else(|| AuthError::Failed("account vanished".to_string()))?;
        Ok(identity(email, account))
    }

    async fn update_profile(&self, identity: &AuthIdentity, display_name: &str) -> Result<(), AuthError> {
        if *self.fail_profile_updates.lock() {
            return Err(AuthError::Failed("profile update refused".to_string()));
        }
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&identity.email)
            .filter(|account| account.uid == identity.uid)
            .ok_or_else(|| AuthError::Failed("USER_NOT_FOUND".to_string()))?;
        account.display_name = Some(display_name.to_string());
        Ok(())
    }
}
