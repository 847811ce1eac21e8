use std::path::PathBuf;

use thiserror::Error;

use crate::schema::ColumnType;

/// Errors from database-file lifecycle operations.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("'{0}' is not a valid database file name")]
    InvalidFileName(String),

    #[error("'{name}' already exists in '{}'", directory.display())]
    AlreadyExists { name: String, directory: PathBuf },

    #[error("'{name}' does not exist in '{}'", directory.display())]
    NotFound { name: String, directory: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from validating input against a table schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown column '{column}' for table '{table}'")]
    UnknownColumn { column: String, table: String },

    #[error("column '{column}' expects {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("column '{column}' is not nullable")]
    NotNullable { column: String },

    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { column: String, table: String },

    #[error("table '{table}' declares more than one primary key")]
    MultiplePrimaryKeys { table: String },

    #[error("auto-increment on '{column}' requires an integer primary key")]
    InvalidAutoIncrement { column: String },
}

/// Errors from store operations (used by the table manager in localdb-infra).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("tabular data error: {0}")]
    Tabular(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_display() {
        let err = FileError::InvalidFileName("notes.txt".to_string());
        assert_eq!(err.to_string(), "'notes.txt' is not a valid database file name");

        let err = FileError::AlreadyExists {
            name: "app.db".to_string(),
            directory: PathBuf::from("/tmp/data"),
        };
        assert!(err.to_string().contains("app.db"));
        assert!(err.to_string().contains("/tmp/data"));
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::TypeMismatch {
            column: "age".to_string(),
            expected: ColumnType::Integer,
            actual: ColumnType::Text,
        };
        assert_eq!(err.to_string(), "column 'age' expects integer, got text");
    }

    #[test]
    fn test_store_error_wraps_schema_error() {
        let err = StoreError::from(SchemaError::NotNullable {
            column: "name".to_string(),
        });
        assert_eq!(err.to_string(), "column 'name' is not nullable");
    }

    #[test]
    fn test_conflict_display() {
        let err = StoreError::Conflict("UNIQUE constraint failed: contacts.email".to_string());
        assert!(err.to_string().starts_with("conflict:"));
    }
}
