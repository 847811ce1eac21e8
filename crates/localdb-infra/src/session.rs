//! Session pooling over sqlx/SQLite.
//!
//! A [`SessionPool`] wraps one single-connection sqlx pool in WAL mode.
//! One pool is held for the lifetime of a table store and must be closed
//! explicitly.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use localdb_types::error::StoreError;

use crate::config::StoreConfig;

/// Single-connection session pool for one local database file.
///
/// WAL journal mode, foreign key enforcement, and a busy timeout are
/// applied to the connection; the file is created when missing.
#[derive(Clone)]
pub struct SessionPool {
    pool: SqlitePool,
}

impl SessionPool {
    /// Open a session pool against a database file path with default
    /// configuration.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with(path, &StoreConfig::default()).await
    }

    /// Open a session pool honoring a [`StoreConfig`].
    pub async fn open_with(path: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        tracing::info!(path = %path.display(), "opening database session");

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(journal_mode(&config.journal_mode))
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// The underlying sqlx pool.
    pub fn inner(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the session. Idempotent.
    pub async fn close(&self) {
        tracing::info!("closing database session");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn journal_mode(name: &str) -> SqliteJournalMode {
    match name.to_lowercase().as_str() {
        "wal" => SqliteJournalMode::Wal,
        "delete" => SqliteJournalMode::Delete,
        "truncate" => SqliteJournalMode::Truncate,
        "memory" => SqliteJournalMode::Memory,
        other => {
            tracing::warn!(journal_mode = other, "unknown journal mode, using wal");
            SqliteJournalMode::Wal
        }
    }
}
