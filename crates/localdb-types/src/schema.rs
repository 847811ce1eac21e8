//! Column types and table schemas.
//!
//! A [`TableSchema`] declares, once per table kind, the set of columns and
//! their semantic types. The schema drives input validation and the
//! `CREATE TABLE IF NOT EXISTS` statement issued when a store opens.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Semantic scalar/blob type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Blob,
}

impl ColumnType {
    /// The SQLite DDL type this column is declared with.
    ///
    /// Booleans ride on INTEGER affinity; timestamps are RFC 3339 TEXT.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Text | ColumnType::Timestamp => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Blob => "blob",
        };
        f.write_str(name)
    }
}

/// One column declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub nullable: bool,
}

impl Column {
    /// A nullable, non-key column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            auto_increment: false,
            unique: false,
            nullable: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Only valid on an integer primary key; checked at schema construction.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    fn ddl(&self) -> String {
        let mut ddl = format!("{} {}", self.name, self.ty.sql_type());
        if self.primary_key {
            ddl.push_str(" PRIMARY KEY");
            if self.auto_increment {
                ddl.push_str(" AUTOINCREMENT");
            }
        }
        if !self.nullable && !self.primary_key {
            ddl.push_str(" NOT NULL");
        }
        if self.unique {
            ddl.push_str(" UNIQUE");
        }
        ddl
    }
}

/// Declared column set for one table kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    table: String,
    columns: Vec<Column>,
}

impl TableSchema {
    /// Build a schema, enforcing its invariants: column names are unique,
    /// at most one primary key, auto-increment only on an integer primary
    /// key.
    pub fn new(
        table: impl Into<String>,
        columns: Vec<Column>,
    ) -> Result<Self, SchemaError> {
        let table = table.into();

        let mut seen = std::collections::BTreeSet::new();
        let mut primary_keys = 0usize;
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    column: column.name.clone(),
                    table,
                });
            }
            if column.primary_key {
                primary_keys += 1;
            }
            if column.auto_increment
                && !(column.primary_key && column.ty == ColumnType::Integer)
            {
                return Err(SchemaError::InvalidAutoIncrement {
                    column: column.name.clone(),
                });
            }
        }
        if primary_keys > 1 {
            return Err(SchemaError::MultiplePrimaryKeys { table });
        }

        Ok(Self { table, columns })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names, in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Mapping from column name to declared type, in declaration order.
    pub fn column_types(&self) -> Vec<(&str, ColumnType)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.ty))
            .collect()
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// The statement issued when a store opens against this schema.
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(Column::ddl).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            columns.join(", ")
        )
    }
}
