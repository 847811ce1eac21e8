//! Configuration for localdb stores.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`StoreConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Pool and journal settings for opened sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Seconds a connection waits on a locked database before failing.
    pub busy_timeout_secs: u64,
    /// SQLite journal mode: `wal`, `delete`, `truncate`, or `memory`.
    /// Unknown values fall back to `wal` with a warning.
    pub journal_mode: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_secs: 5,
            journal_mode: "wal".to_string(),
        }
    }
}

/// Resolve the data directory for database files.
///
/// Priority:
/// 1. `LOCALDB_DATA_DIR` environment variable
/// 2. `~/.localdb/db_files`
/// 3. `./.localdb/db_files` as a last resort
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LOCALDB_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".localdb").join("db_files");
    }

    PathBuf::from(".localdb").join("db_files")
}

/// Load store configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`StoreConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the
///   default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> StoreConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            return StoreConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return StoreConfig::default();
        }
    };

    match toml::from_str::<StoreConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            StoreConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.busy_timeout_secs, 5);
        assert_eq!(config.journal_mode, "wal");
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
busy_timeout_secs = 30
journal_mode = "delete"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.busy_timeout_secs, 30);
        assert_eq!(config.journal_mode, "delete");
    }

    #[tokio::test]
    async fn load_config_partial_toml_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "busy_timeout_secs = 10")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.busy_timeout_secs, 10);
        assert_eq!(config.journal_mode, "wal");
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.busy_timeout_secs, 5);
    }

    #[test]
    fn resolve_data_dir_ends_with_db_files() {
        let dir = resolve_data_dir();
        assert!(dir.ends_with("db_files"));
    }
}
