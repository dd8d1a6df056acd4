use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_POLL_INTERVAL_MS;

pub const ENV_PROJECT_ID: &str = "THREADCHAT_PROJECT_ID";
pub const ENV_API_KEY: &str = "THREADCHAT_API_KEY";
pub const ENV_DATA_DIR: &str = "THREADCHAT_DATA_DIR";

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Client configuration, loadable from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Directory for local storage; defaults to the platform data dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Firebase project hosting the `threads` and `users` collections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Web API key of the Firebase project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            project_id: None,
            api_key: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ChatConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ChatConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Override fields from `THREADCHAT_*` environment variables
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(project_id) = lookup(ENV_PROJECT_ID) {
            self.project_id = Some(project_id);
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(data_dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(data_dir));
        }
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("threadchat")
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn project_id(&self) -> Result<&str> {
        self.project_id
            .as_deref()
            .with_context(|| format!("No Firebase project configured (set projectId or {})", ENV_PROJECT_ID))
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .with_context(|| format!("No Firebase API key configured (set apiKey or {})", ENV_API_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "dataDir": "/tmp/chat",
            "projectId": "demo-chat",
            "apiKey": "AIza-test",
            "pollIntervalMs": 500
        }"#;
        let config: ChatConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/chat"));
        assert_eq!(config.project_id().unwrap(), "demo-chat");
        assert_eq!(config.api_key().unwrap(), "AIza-test");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ChatConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert!(config.project_id().is_err());
        assert!(config.api_key().is_err());
        assert!(config.data_dir().ends_with("threadchat"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_PROJECT_ID, "from-env"), (ENV_DATA_DIR, "/var/chat")]
            .into_iter()
            .collect();
        let config = ChatConfig {
            project_id: Some("from-file".into()),
            api_key: Some("key".into()),
            ..ChatConfig::default()
        }
        .with_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.project_id().unwrap(), "from-env");
        assert_eq!(config.api_key().unwrap(), "key");
        assert_eq!(config.data_dir(), PathBuf::from("/var/chat"));
    }

    #[test]
    fn test_load_reports_path_on_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let err = ChatConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.json"));
    }
}
