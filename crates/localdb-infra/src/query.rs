//! SQL fragments, value binding, and row decoding.
//!
//! Translates a [`FilterSet`] into a WHERE clause plus bind values via a
//! fixed operator lookup, and converts between [`Value`]s and sqlx rows.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row as _, Sqlite};

use localdb_types::error::{SchemaError, StoreError};
use localdb_types::filter::{Combine, FilterOp, FilterSet};
use localdb_types::schema::{ColumnType, TableSchema};
use localdb_types::value::{Row, Value};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Build `(where_clause, bind_values)` for a filter set.
///
/// Returns an empty clause for an empty set. Unknown columns fail with
/// [`SchemaError::UnknownColumn`]; membership in an empty list becomes a
/// clause that matches nothing.
pub(crate) fn build_where(
    schema: &TableSchema,
    filters: &FilterSet,
) -> Result<(String, Vec<Value>), StoreError> {
    let mut clauses = Vec::with_capacity(filters.len());
    let mut binds = Vec::new();

    for filter in filters.filters() {
        if schema.column(&filter.column).is_none() {
            tracing::error!(
                table = schema.table(),
                column = filter.column.as_str(),
                "filter references a column that is not part of the table schema"
            );
            return Err(SchemaError::UnknownColumn {
                column: filter.column.clone(),
                table: schema.table().to_string(),
            }
            .into());
        }

        match &filter.op {
            FilterOp::Eq(v) => {
                clauses.push(format!("{} = ?", filter.column));
                binds.push(v.clone());
            }
            FilterOp::Ne(v) => {
                clauses.push(format!("{} != ?", filter.column));
                binds.push(v.clone());
            }
            FilterOp::Gt(v) => {
                clauses.push(format!("{} > ?", filter.column));
                binds.push(v.clone());
            }
            FilterOp::Ge(v) => {
                clauses.push(format!("{} >= ?", filter.column));
                binds.push(v.clone());
            }
            FilterOp::Lt(v) => {
                clauses.push(format!("{} < ?", filter.column));
                binds.push(v.clone());
            }
            FilterOp::Le(v) => {
                clauses.push(format!("{} <= ?", filter.column));
                binds.push(v.clone());
            }
            FilterOp::In(values) => {
                if values.is_empty() {
                    clauses.push("1 = 0".to_string());
                } else {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    clauses.push(format!("{} IN ({})", filter.column, placeholders));
                    binds.extend(values.iter().cloned());
                }
            }
            FilterOp::Like(pattern) => {
                clauses.push(format!("{} LIKE ?", filter.column));
                binds.push(Value::Text(pattern.clone()));
            }
        }
    }

    let joiner = match filters.combine() {
        Combine::And => " AND ",
        Combine::Or => " OR ",
    };

    Ok((clauses.join(joiner), binds))
}

/// Bind one value onto a query.
pub(crate) fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Boolean(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(format_datetime(v)),
        Value::Blob(v) => query.bind(v.clone()),
    }
}

/// Bind a sequence of values onto a query.
pub(crate) fn bind_values<'q>(mut query: SqliteQuery<'q>, values: &[Value]) -> SqliteQuery<'q> {
    for value in values {
        query = bind_value(query, value);
    }
    query
}

/// Decode one sqlx row into a [`Row`] following the table schema.
pub(crate) fn decode_row(schema: &TableSchema, row: &SqliteRow) -> Result<Row, StoreError> {
    let mut out = Row::new();
    for column in schema.columns() {
        let name = column.name.as_str();
        let value = match column.ty {
            ColumnType::Integer => row
                .try_get::<Option<i64>, _>(name)
                .map_err(|e| StoreError::Query(e.to_string()))?
                .map_or(Value::Null, Value::Integer),
            ColumnType::Float => row
                .try_get::<Option<f64>, _>(name)
                .map_err(|e| StoreError::Query(e.to_string()))?
                .map_or(Value::Null, Value::Float),
            ColumnType::Text => row
                .try_get::<Option<String>, _>(name)
                .map_err(|e| StoreError::Query(e.to_string()))?
                .map_or(Value::Null, Value::Text),
            ColumnType::Boolean => row
                .try_get::<Option<bool>, _>(name)
                .map_err(|e| StoreError::Query(e.to_string()))?
                .map_or(Value::Null, Value::Boolean),
            ColumnType::Timestamp => {
                let raw = row
                    .try_get::<Option<String>, _>(name)
                    .map_err(|e| StoreError::Query(e.to_string()))?;
                match raw {
                    Some(s) => Value::Timestamp(parse_datetime(&s)?),
                    None => Value::Null,
                }
            }
            ColumnType::Blob => row
                .try_get::<Option<Vec<u8>>, _>(name)
                .map_err(|e| StoreError::Query(e.to_string()))?
                .map_or(Value::Null, Value::Blob),
        };
        out.insert(column.name.clone(), value);
    }
    Ok(out)
}

/// Map sqlx errors, surfacing UNIQUE violations as conflicts.
pub(crate) fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.message().contains("UNIQUE") {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Query(e.to_string())
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use localdb_types::schema::Column;

    fn schema() -> TableSchema {
        TableSchema::new(
            "contacts",
            vec![
                Column::new("name", ColumnType::Text),
                Column::new("age", ColumnType::Integer),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_filter_set_builds_empty_clause() {
        let (clause, binds) = build_where(&schema(), &FilterSet::new()).unwrap();
        assert_eq!(clause, "");
        assert!(binds.is_empty());
    }

    #[test]
    fn test_and_clause() {
        let filters = FilterSet::new().eq("name", "John").gt("age", 21i64);
        let (clause, binds) = build_where(&schema(), &filters).unwrap();
        assert_eq!(clause, "name = ? AND age > ?");
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn test_or_clause() {
        let filters = FilterSet::any().eq("age", 30i64).eq("age", 40i64);
        let (clause, _) = build_where(&schema(), &filters).unwrap();
        assert_eq!(clause, "age = ? OR age = ?");
    }

    #[test]
    fn test_in_expands_placeholders() {
        let filters = FilterSet::new().is_in("age", [30i64, 40, 50]);
        let (clause, binds) = build_where(&schema(), &filters).unwrap();
        assert_eq!(clause, "age IN (?, ?, ?)");
        assert_eq!(binds.len(), 3);
    }

    #[test]
    fn test_in_empty_matches_nothing() {
        let filters = FilterSet::new().is_in("age", Vec::<i64>::new());
        let (clause, binds) = build_where(&schema(), &filters).unwrap();
        assert_eq!(clause, "1 = 0");
        assert!(binds.is_empty());
    }

    #[test]
    fn test_like_binds_pattern() {
        let filters = FilterSet::new().like("name", "%Doe");
        let (clause, binds) = build_where(&schema(), &filters).unwrap();
        assert_eq!(clause, "name LIKE ?");
        assert_eq!(binds, vec![Value::Text("%Doe".to_string())]);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let filters = FilterSet::new().eq("ghost", 1i64);
        let err = build_where(&schema(), &filters).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Schema(SchemaError::UnknownColumn { column, .. }) if column == "ghost"
        ));
    }

    #[test]
    fn test_datetime_roundtrip() {
        let now = Utc::now();
        let parsed = parse_datetime(&format_datetime(&now)).unwrap();
        assert_eq!(parsed, now);
    }
}
