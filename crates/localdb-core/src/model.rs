//! The table-model trait.
//!
//! A [`TableModel`] maps one Rust struct onto one table schema, declared
//! once per table kind. The storage layer in `localdb-infra` is generic
//! over implementations of this trait.

use localdb_types::error::SchemaError;
use localdb_types::schema::TableSchema;
use localdb_types::value::Row;

/// Maps a record struct onto one table schema.
///
/// One column is conventionally treated as the unique identifier; it
/// defaults to `"id"` and can be overridden per model.
pub trait TableModel: Sized + Send + Sync {
    /// Name of the backing table.
    fn table_name() -> &'static str;

    /// The declared column set. Called once when a store opens; the result
    /// must be stable for the lifetime of the program.
    fn schema() -> TableSchema;

    /// The identifier column used by fetch/update/delete-by-id.
    fn id_column() -> &'static str {
        "id"
    }

    /// Project this record into a row. Columns left out of the row are
    /// filled by the database (defaults, auto-increment).
    fn to_row(&self) -> Row;

    /// Reconstruct a record from a full row as read back from the table.
    fn from_row(row: &Row) -> Result<Self, SchemaError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use localdb_types::schema::{Column, ColumnType};
    use localdb_types::value::{row, Value};

    #[derive(Debug, PartialEq)]
    struct Contact {
        id: Option<i64>,
        name: String,
        age: Option<i64>,
        email: Option<String>,
    }

    impl TableModel for Contact {
        fn table_name() -> &'static str {
            "contacts"
        }

        fn schema() -> TableSchema {
            TableSchema::new(
                Self::table_name(),
                vec![
                    Column::new("id", ColumnType::Integer)
                        .primary_key()
                        .auto_increment(),
                    Column::new("name", ColumnType::Text).not_null(),
                    Column::new("age", ColumnType::Integer),
                    Column::new("email", ColumnType::Text).unique(),
                ],
            )
            .expect("contact schema is valid")
        }

        fn to_row(&self) -> Row {
            let mut r = Row::new();
            if let Some(id) = self.id {
                r.insert("id".into(), Value::Integer(id));
            }
            r.insert("name".into(), Value::Text(self.name.clone()));
            r.insert("age".into(), Value::from(self.age));
            r.insert("email".into(), Value::from(self.email.clone()));
            r
        }

        fn from_row(row: &Row) -> Result<Self, SchemaError> {
            Ok(Self {
                id: row.get("id").and_then(Value::as_i64),
                name: row
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                age: row.get("age").and_then(Value::as_i64),
                email: row
                    .get("email")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        }
    }

    #[test]
    fn test_row_roundtrip() {
        let contact = Contact {
            id: Some(1),
            name: "John Doe".to_string(),
            age: Some(30),
            email: Some("john.doe@email.com".to_string()),
        };
        let restored = Contact::from_row(&contact.to_row()).unwrap();
        assert_eq!(restored, contact);
    }

    #[test]
    fn test_to_row_skips_unset_id() {
        let contact = Contact {
            id: None,
            name: "Jane Doe".to_string(),
            age: None,
            email: None,
        };
        let r = contact.to_row();
        assert!(!r.contains_key("id"));
        assert_eq!(r.get("age"), Some(&Value::Null));
    }

    #[test]
    fn test_default_id_column() {
        assert_eq!(Contact::id_column(), "id");
    }

    #[test]
    fn test_from_row_ignores_extra_keys() {
        let r = row([
            ("name", Value::from("Alice Smith")),
            ("nickname", Value::from("Al")),
        ]);
        let contact = Contact::from_row(&r).unwrap();
        assert_eq!(contact.name, "Alice Smith");
        assert_eq!(contact.id, None);
    }
}
