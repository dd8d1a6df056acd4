use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AuthError, AuthIdentity, AuthProvider};
use crate::constants::endpoints::IDENTITY_TOOLKIT_API_BASE;

/// Error codes that mean the email/password pair was rejected
const INVALID_CREDENTIAL_CODES: &[&str] = &[
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_PASSWORD",
    "EMAIL_NOT_FOUND",
    "USER_DISABLED",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    display_name: Option<String>,
    #[serde(default)]
    id_token: String,
}

/// Firebase Identity Toolkit REST client
pub struct IdentityToolkitAuth {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl IdentityToolkitAuth {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, IDENTITY_TOOLKIT_API_BASE)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, AuthError> {
        let url = format!("{}/accounts:{}", self.base_url, method);

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(payload);
        }

        let message = payload["error"]["message"].as_str().unwrap_or_default();
        Err(classify_error(status.as_u16(), message))
    }

    async fn account_call(&self, method: &str, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let payload = self
            .call(
                method,
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let account: AccountResponse = serde_json::from_value(payload)
            .with_context(|| format!("Failed to parse accounts:{} response", method))
            .map_err(|e| AuthError::Failed(format!("{:#}", e)))?;

        Ok(AuthIdentity {
            uid: account.local_id,
            email: if account.email.is_empty() { email.to_string() } else { account.email },
            display_name: account.display_name.filter(|name| !name.is_empty()),
            id_token: account.id_token,
        })
    }
}

/// Map an Identity Toolkit error message to an [`AuthError`].
///
/// Messages look like `"INVALID_PASSWORD"` or
/// `"WEAK_PASSWORD : Password should be at least 6 characters"`.
fn classify_error(status: u16, message: &str) -> AuthError {
    let code = message.split(" : ").next().unwrap_or_default().trim();
    if INVALID_CREDENTIAL_CODES.contains(&code) {
        AuthError::InvalidCredential
    } else if code.is_empty() {
        AuthError::Failed(format!("identity toolkit returned {}", status))
    } else {
        AuthError::Failed(code.to_string())
    }
}

#[async_trait]
impl AuthProvider for IdentityToolkitAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        self.account_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        self.account_call("signUp", email, password).await
    }

    async fn update_profile(&self, identity: &AuthIdentity, display_name: &str) -> Result<(), AuthError> {
        self.call(
            "update",
            json!({
                "idToken": identity.id_token,
                "displayName": display_name,
                "returnSecureToken": false,
            }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_invalid_credentials() {
        assert!(classify_error(400, "INVALID_LOGIN_CREDENTIALS").is_invalid_credential());
        assert!(classify_error(400, "EMAIL_NOT_FOUND").is_invalid_credential());
        assert!(classify_error(400, "INVALID_PASSWORD").is_invalid_credential());
    }

    #[test]
    fn test_classify_generic_failures() {
        match classify_error(400, "WEAK_PASSWORD : Password should be at least 6 characters") {
            AuthError::Failed(code) => assert_eq!(code, "WEAK_PASSWORD"),
            other => panic!("unexpected {:?}", other),
        }
        match classify_error(503, "") {
            AuthError::Failed(msg) => assert!(msg.contains("503")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_account_response_parsing() {
        let account: AccountResponse = serde_json::from_value(json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "abc",
            "email": "ada@x.io",
            "displayName": "",
            "idToken": "tok",
            "registered": true,
        }))
        .unwrap();
        assert_eq!(account.local_id, "abc");
        assert_eq!(account.display_name.as_deref(), Some(""));
    }
}
