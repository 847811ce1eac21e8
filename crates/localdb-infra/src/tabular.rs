//! Arrow tabular interchange.
//!
//! Maps table schemas to Arrow schemas and converts between rows and
//! `RecordBatch`es. Timestamps travel as RFC 3339 text, matching their
//! SQLite representation.

use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Float64Array, Int64Array, RecordBatch,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema as ArrowSchema};

use localdb_types::error::{SchemaError, StoreError};
use localdb_types::schema::{Column, ColumnType, TableSchema};
use localdb_types::value::{Row, Value};

use crate::query::{format_datetime, parse_datetime};

/// The Arrow data type a column is exported with.
pub fn arrow_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Integer => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Text | ColumnType::Timestamp => DataType::Utf8,
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::Blob => DataType::Binary,
    }
}

/// Build the Arrow schema for a table schema.
///
/// Every field is nullable on export: auto-increment keys may be absent
/// from rows that have not been written yet.
pub fn arrow_schema(schema: &TableSchema) -> ArrowSchema {
    let fields: Vec<Field> = schema
        .columns()
        .iter()
        .map(|c| Field::new(c.name.clone(), arrow_type(c.ty), true))
        .collect();
    ArrowSchema::new(fields)
}

/// Check a batch's column names and dtypes against a table schema.
///
/// Batch columns must be a subset of the schema's columns; each Arrow
/// dtype must map to the declared column type (Int64 widens to a float
/// column, Utf8 feeds both text and timestamp columns).
pub fn check_batch(schema: &TableSchema, batch_schema: &ArrowSchema) -> Result<(), StoreError> {
    for field in batch_schema.fields() {
        let Some(column) = schema.column(field.name()) else {
            tracing::error!(
                table = schema.table(),
                column = field.name().as_str(),
                "batch column is not part of the table schema"
            );
            return Err(SchemaError::UnknownColumn {
                column: field.name().clone(),
                table: schema.table().to_string(),
            }
            .into());
        };

        if !dtype_compatible(field.data_type(), column.ty) {
            tracing::error!(
                table = schema.table(),
                column = field.name().as_str(),
                dtype = %field.data_type(),
                expected = %column.ty,
                "batch dtype does not match column type"
            );
            return Err(StoreError::Tabular(format!(
                "column '{}' expects {}, batch carries {}",
                field.name(),
                column.ty,
                field.data_type()
            )));
        }
    }
    Ok(())
}

fn dtype_compatible(dt: &DataType, ty: ColumnType) -> bool {
    matches!(
        (dt, ty),
        (DataType::Int64, ColumnType::Integer)
            | (DataType::Int64, ColumnType::Float)
            | (DataType::Float64, ColumnType::Float)
            | (DataType::Utf8, ColumnType::Text)
            | (DataType::Utf8, ColumnType::Timestamp)
            | (DataType::Boolean, ColumnType::Boolean)
            | (DataType::Binary, ColumnType::Blob)
    )
}

/// Build a `RecordBatch` from rows, with one field per schema column.
///
/// Missing keys and explicit nulls both become Arrow nulls.
pub fn rows_to_batch(schema: &TableSchema, rows: &[Row]) -> Result<RecordBatch, StoreError> {
    let arrow = Arc::new(arrow_schema(schema));
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.columns().len());

    for column in schema.columns() {
        arrays.push(column_array(column, rows)?);
    }

    RecordBatch::try_new(arrow, arrays)
        .map_err(|e| StoreError::Tabular(format!("failed to build record batch: {e}")))
}

fn column_array(column: &Column, rows: &[Row]) -> Result<ArrayRef, StoreError> {
    let cell = |row: &Row| row.get(&column.name).cloned().unwrap_or(Value::Null);
    let mismatch = |value: &Value| {
        StoreError::Tabular(format!(
            "column '{}' expects {}, row carries {:?}",
            column.name, column.ty, value
        ))
    };

    let array: ArrayRef = match column.ty {
        ColumnType::Integer => {
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match cell(row) {
                    Value::Null => None,
                    Value::Integer(v) => Some(v),
                    other => return Err(mismatch(&other)),
                });
            }
            Arc::new(Int64Array::from(values))
        }
        ColumnType::Float => {
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match cell(row) {
                    Value::Null => None,
                    Value::Float(v) => Some(v),
                    Value::Integer(v) => Some(v as f64),
                    other => return Err(mismatch(&other)),
                });
            }
            Arc::new(Float64Array::from(values))
        }
        ColumnType::Text => {
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match cell(row) {
                    Value::Null => None,
                    Value::Text(v) => Some(v),
                    other => return Err(mismatch(&other)),
                });
            }
            Arc::new(StringArray::from(values))
        }
        ColumnType::Boolean => {
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match cell(row) {
                    Value::Null => None,
                    Value::Boolean(v) => Some(v),
                    other => return Err(mismatch(&other)),
                });
            }
            Arc::new(BooleanArray::from(values))
        }
        ColumnType::Timestamp => {
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match cell(row) {
                    Value::Null => None,
                    Value::Timestamp(v) => Some(format_datetime(&v)),
                    other => return Err(mismatch(&other)),
                });
            }
            Arc::new(StringArray::from(values))
        }
        ColumnType::Blob => {
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match cell(row) {
                    Value::Null => None,
                    Value::Blob(v) => Some(v),
                    other => return Err(mismatch(&other)),
                });
            }
            Arc::new(BinaryArray::from_iter(values))
        }
    };
    Ok(array)
}

/// Parse a `RecordBatch` into rows following a table schema.
///
/// The batch is validated first; nulls become [`Value::Null`].
pub fn batch_to_rows(schema: &TableSchema, batch: &RecordBatch) -> Result<Vec<Row>, StoreError> {
    let batch_schema = batch.schema();
    check_batch(schema, &batch_schema)?;

    let mut rows = vec![Row::new(); batch.num_rows()];

    for (field, array) in batch_schema.fields().iter().zip(batch.columns()) {
        // check_batch guarantees the column exists.
        let column = schema
            .column(field.name())
            .ok_or_else(|| StoreError::Tabular(format!("column '{}' vanished", field.name())))?;

        match field.data_type() {
            DataType::Int64 => {
                let array = downcast::<Int64Array>(array, field.name())?;
                for (i, row) in rows.iter_mut().enumerate() {
                    let value = if array.is_null(i) {
                        Value::Null
                    } else {
                        Value::Integer(array.value(i))
                    };
                    row.insert(column.name.clone(), value);
                }
            }
            DataType::Float64 => {
                let array = downcast::<Float64Array>(array, field.name())?;
                for (i, row) in rows.iter_mut().enumerate() {
                    let value = if array.is_null(i) {
                        Value::Null
                    } else {
                        Value::Float(array.value(i))
                    };
                    row.insert(column.name.clone(), value);
                }
            }
            DataType::Utf8 => {
                let array = downcast::<StringArray>(array, field.name())?;
                for (i, row) in rows.iter_mut().enumerate() {
                    let value = if array.is_null(i) {
                        Value::Null
                    } else if column.ty == ColumnType::Timestamp {
                        Value::Timestamp(parse_datetime(array.value(i))?)
                    } else {
                        Value::Text(array.value(i).to_string())
                    };
                    row.insert(column.name.clone(), value);
                }
            }
            DataType::Boolean => {
                let array = downcast::<BooleanArray>(array, field.name())?;
                for (i, row) in rows.iter_mut().enumerate() {
                    let value = if array.is_null(i) {
                        Value::Null
                    } else {
                        Value::Boolean(array.value(i))
                    };
                    row.insert(column.name.clone(), value);
                }
            }
            DataType::Binary => {
                let array = downcast::<BinaryArray>(array, field.name())?;
                for (i, row) in rows.iter_mut().enumerate() {
                    let value = if array.is_null(i) {
                        Value::Null
                    } else {
                        Value::Blob(array.value(i).to_vec())
                    };
                    row.insert(column.name.clone(), value);
                }
            }
            other => {
                return Err(StoreError::Tabular(format!(
                    "unsupported arrow type {other} for column '{}'",
                    field.name()
                )));
            }
        }
    }

    Ok(rows)
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a T, StoreError> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| StoreError::Tabular(format!("column '{name}' has an unexpected array type")))
}
