//! Database-file lifecycle on the local filesystem.
//!
//! A [`DatabaseFile`] names one single-file database inside a directory and
//! supports the explicit lifecycle calls: exists, create, move, delete. The
//! in-memory path fields follow the file on a successful move.

use std::path::{Path, PathBuf};

use localdb_types::error::FileError;

/// File name suffixes recognized as local database files.
pub const DB_SUFFIXES: [&str; 3] = [".db", ".sqlite", ".sqlite3"];

/// Whether a file name carries a recognized database suffix.
pub fn is_database_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    DB_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// One local single-file database.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseFile {
    name: String,
    directory: PathBuf,
    path: PathBuf,
    abs_path: PathBuf,
}

impl DatabaseFile {
    /// Reference a database file by name inside a directory.
    ///
    /// The name must end in a recognized database suffix. The directory is
    /// created when it does not exist yet.
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Result<Self, FileError> {
        let name = name.into();
        let directory = directory.into();

        if !is_database_file(&name) {
            tracing::error!(name = name.as_str(), "rejected database file name");
            return Err(FileError::InvalidFileName(name));
        }

        if !directory.exists() {
            tracing::warn!(
                directory = %directory.display(),
                "directory does not exist, creating it"
            );
            std::fs::create_dir_all(&directory)?;
        }

        let path = directory.join(&name);
        let abs_path = std::path::absolute(&path)?;

        Ok(Self {
            name,
            directory,
            path,
            abs_path,
        })
    }

    /// Reference a database file inside the resolved data directory
    /// (see [`crate::config::resolve_data_dir`]).
    pub fn in_data_dir(name: impl Into<String>) -> Result<Self, FileError> {
        Self::new(name, crate::config::resolve_data_dir())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn abs_path(&self) -> &Path {
        &self.abs_path
    }

    /// Whether the file is present in its directory.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Create the file if it does not exist yet. A no-op when it does.
    pub async fn create(&self) -> Result<(), FileError> {
        tracing::info!(name = self.name.as_str(), "creating database file");
        if self.exists().await {
            tracing::info!(
                name = self.name.as_str(),
                directory = %self.directory.display(),
                "database file already exists"
            );
            return Ok(());
        }

        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await?;
        tracing::info!(path = %self.path.display(), "database file created");
        Ok(())
    }

    /// Move the file to another directory, updating the path fields.
    ///
    /// Refuses when a same-named file already exists in the target
    /// directory or when the file itself is missing; the original location
    /// is left unchanged in both cases.
    pub async fn move_to(&mut self, target_directory: impl Into<PathBuf>) -> Result<(), FileError> {
        let target_directory = target_directory.into();
        tracing::info!(
            name = self.name.as_str(),
            from = %self.directory.display(),
            to = %target_directory.display(),
            "moving database file"
        );

        let target_path = target_directory.join(&self.name);
        if tokio::fs::try_exists(&target_path).await.unwrap_or(false) {
            tracing::error!(
                name = self.name.as_str(),
                target = %target_directory.display(),
                "a file with this name already exists in the target directory"
            );
            return Err(FileError::AlreadyExists {
                name: self.name.clone(),
                directory: target_directory,
            });
        }
        if !self.exists().await {
            tracing::error!(
                name = self.name.as_str(),
                directory = %self.directory.display(),
                "database file cannot be moved because it does not exist"
            );
            return Err(FileError::NotFound {
                name: self.name.clone(),
                directory: self.directory.clone(),
            });
        }

        tokio::fs::rename(&self.path, &target_path).await?;
        self.directory = target_directory;
        self.path = target_path;
        self.abs_path = std::path::absolute(&self.path)?;
        Ok(())
    }

    /// Delete the file. Deleting a nonexistent file is a no-op.
    pub async fn delete(&self) -> Result<(), FileError> {
        if self.exists().await {
            tokio::fs::remove_file(&self.abs_path).await?;
            tracing::info!(
                name = self.name.as_str(),
                directory = %self.directory.display(),
                "database file deleted"
            );
        } else {
            tracing::warn!(
                name = self.name.as_str(),
                directory = %self.directory.display(),
                "nothing to delete, database file does not exist"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_database_file() {
        assert!(is_database_file("test.db"));
        assert!(is_database_file("TEST.DB"));
        assert!(is_database_file("app.sqlite"));
        assert!(is_database_file("app.sqlite3"));
        assert!(!is_database_file("notes.txt"));
        assert!(!is_database_file("db"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = DatabaseFile::new("notes.txt", dir.path()).unwrap_err();
        assert!(matches!(err, FileError::InvalidFileName(name) if name == "notes.txt"));
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("db_files");
        let file = DatabaseFile::new("test.db", &nested).unwrap();
        assert!(nested.exists());
        assert_eq!(file.name(), "test.db");
        assert_eq!(file.path(), nested.join("test.db"));
    }

    #[tokio::test]
    async fn test_create_then_exists() {
        let dir = tempfile::tempdir().unwrap();
        let file = DatabaseFile::new("test.db", dir.path()).unwrap();

        assert!(!file.exists().await);
        file.create().await.unwrap();
        assert!(file.exists().await);
    }

    #[tokio::test]
    async fn test_create_existing_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let file = DatabaseFile::new("test.db", dir.path()).unwrap();

        file.create().await.unwrap();
        tokio::fs::write(file.path(), b"payload").await.unwrap();
        file.create().await.unwrap();

        // Second create must not truncate.
        let content = tokio::fs::read(file.path()).await.unwrap();
        assert_eq!(content, b"payload");
    }

    #[tokio::test]
    async fn test_move_updates_paths() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("archive");
        tokio::fs::create_dir_all(&target).await.unwrap();

        let mut file = DatabaseFile::new("test.db", dir.path()).unwrap();
        file.create().await.unwrap();
        file.move_to(&target).await.unwrap();

        assert_eq!(file.directory(), target.as_path());
        assert_eq!(file.path(), target.join("test.db"));
        assert!(file.exists().await);
        assert!(!dir.path().join("test.db").exists());
    }

    #[tokio::test]
    async fn test_move_refuses_when_target_occupied() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("archive");
        tokio::fs::create_dir_all(&target).await.unwrap();
        tokio::fs::write(target.join("test.db"), b"occupied")
            .await
            .unwrap();

        let mut file = DatabaseFile::new("test.db", dir.path()).unwrap();
        file.create().await.unwrap();
        let err = file.move_to(&target).await.unwrap_err();

        assert!(matches!(err, FileError::AlreadyExists { .. }));
        // Original location unchanged.
        assert_eq!(file.directory(), dir.path());
        assert!(file.exists().await);
    }

    #[tokio::test]
    async fn test_move_refuses_when_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("archive");
        tokio::fs::create_dir_all(&target).await.unwrap();

        let mut file = DatabaseFile::new("test.db", dir.path()).unwrap();
        let err = file.move_to(&target).await.unwrap_err();
        assert!(matches!(err, FileError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let file = DatabaseFile::new("test.db", dir.path()).unwrap();
        file.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = DatabaseFile::new("test.db", dir.path()).unwrap();
        file.create().await.unwrap();
        file.delete().await.unwrap();
        assert!(!file.exists().await);
    }
}
