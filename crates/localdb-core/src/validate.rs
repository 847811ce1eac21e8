//! Input validation against a table schema.
//!
//! The checks mirror what the storage layer needs before building SQL:
//! input keys must be a subset of the schema's column names, and each
//! value's type must be compatible with the declared column type. Both
//! fail immediately and locally; nothing is retried.

use localdb_types::error::SchemaError;
use localdb_types::schema::{ColumnType, TableSchema};
use localdb_types::value::{Row, Value};

/// Check that every name is a declared column of the schema.
pub fn check_columns<'a, I>(schema: &TableSchema, names: I) -> Result<(), SchemaError>
where
    I: IntoIterator<Item = &'a str>,
{
    for name in names {
        if schema.column(name).is_none() {
            tracing::error!(
                table = schema.table(),
                column = name,
                "input column is not part of the table schema"
            );
            return Err(SchemaError::UnknownColumn {
                column: name.to_string(),
                table: schema.table().to_string(),
            });
        }
    }
    Ok(())
}

/// Check that each value in the row is compatible with its declared column
/// type.
///
/// `Null` is accepted only for nullable columns. An integer value is
/// accepted for a float column (widening); every other combination must
/// match exactly.
pub fn check_types(schema: &TableSchema, row: &Row) -> Result<(), SchemaError> {
    for (name, value) in row {
        let Some(column) = schema.column(name) else {
            return Err(SchemaError::UnknownColumn {
                column: name.clone(),
                table: schema.table().to_string(),
            });
        };

        match value.column_type() {
            None => {
                if !column.nullable {
                    tracing::error!(
                        table = schema.table(),
                        column = name.as_str(),
                        "null value for non-nullable column"
                    );
                    return Err(SchemaError::NotNullable {
                        column: name.clone(),
                    });
                }
            }
            Some(actual) => {
                if !type_compatible(actual, column.ty) {
                    tracing::error!(
                        table = schema.table(),
                        column = name.as_str(),
                        expected = %column.ty,
                        actual = %actual,
                        "value type does not match column type"
                    );
                    return Err(SchemaError::TypeMismatch {
                        column: name.clone(),
                        expected: column.ty,
                        actual,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Column-subset and type-compatibility checks in one call.
pub fn check_row(schema: &TableSchema, row: &Row) -> Result<(), SchemaError> {
    check_columns(schema, row.keys().map(String::as_str))?;
    check_types(schema, row)?;
    tracing::debug!(
        table = schema.table(),
        columns = row.len(),
        "row is compatible with the table schema"
    );
    Ok(())
}

fn type_compatible(actual: ColumnType, declared: ColumnType) -> bool {
    actual == declared || (actual == ColumnType::Integer && declared == ColumnType::Float)
}

/// Compatibility check for a single value against a named column.
pub fn check_value(schema: &TableSchema, name: &str, value: &Value) -> Result<(), SchemaError> {
    let mut row = Row::new();
    row.insert(name.to_string(), value.clone());
    check_types(schema, &row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use localdb_types::schema::Column;
    use localdb_types::value::row;

    fn contact_schema() -> TableSchema {
        TableSchema::new(
            "contacts",
            vec![
                Column::new("id", ColumnType::Integer)
                    .primary_key()
                    .auto_increment(),
                Column::new("name", ColumnType::Text).not_null(),
                Column::new("age", ColumnType::Integer),
                Column::new("score", ColumnType::Float),
                Column::new("active", ColumnType::Boolean),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_subset_of_columns_is_accepted() {
        let schema = contact_schema();
        let r = row([("name", Value::from("John Doe"))]);
        assert!(check_row(&schema, &r).is_ok());
    }

    #[test]
    fn test_unknown_column_rejected() {
        let schema = contact_schema();
        let r = row([("name", Value::from("John Doe")), ("nickname", Value::from("J"))]);
        let err = check_row(&schema, &r).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { column, .. } if column == "nickname"));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let schema = contact_schema();
        let r = row([
            ("name", Value::from("John Doe")),
            ("age", Value::from("thirty")),
        ]);
        let err = check_row(&schema, &r).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeMismatch {
                expected: ColumnType::Integer,
                actual: ColumnType::Text,
                ..
            }
        ));
    }

    #[test]
    fn test_null_only_for_nullable_columns() {
        let schema = contact_schema();

        let r = row([("age", Value::Null)]);
        assert!(check_row(&schema, &r).is_ok());

        let r = row([("name", Value::Null)]);
        let err = check_row(&schema, &r).unwrap_err();
        assert!(matches!(err, SchemaError::NotNullable { column } if column == "name"));
    }

    #[test]
    fn test_integer_widens_to_float() {
        let schema = contact_schema();
        let r = row([("score", Value::from(42i64))]);
        assert!(check_row(&schema, &r).is_ok());

        // The reverse direction does not narrow.
        let r = row([("age", Value::from(1.5))]);
        assert!(check_row(&schema, &r).is_err());
    }

    #[test]
    fn test_check_value_single_column() {
        let schema = contact_schema();
        assert!(check_value(&schema, "active", &Value::from(true)).is_ok());
        assert!(check_value(&schema, "active", &Value::from(1i64)).is_err());
        assert!(check_value(&schema, "ghost", &Value::from(1i64)).is_err());
    }
}
