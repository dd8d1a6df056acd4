use std::path::Path;

use anyhow::Result;
use threadchat_core::ChatConfig;

/// Load the config file if one was given, then apply environment overrides
pub fn load_config(path: Option<&Path>) -> Result<ChatConfig> {
    let config = match path {
        Some(path) => ChatConfig::load(path)?,
        None => ChatConfig::default(),
    };
    Ok(config.with_env_overrides())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"projectId": "demo", "apiKey": "k", "pollIntervalMs": 250}}"#).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert!(config.project_id().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.json"))).is_err());
    }
}
