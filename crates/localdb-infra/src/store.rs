//! The generic table manager.
//!
//! A [`TableStore`] performs validated CRUD and tabular operations against
//! one schema's records in one database file. Input is checked against the
//! model's schema before any SQL is built; uniqueness conflicts roll back
//! and propagate; not-found conditions on read, update, and delete are
//! non-fatal.

use std::marker::PhantomData;

use arrow_array::RecordBatch;
use sqlx::sqlite::SqliteRow;

use localdb_core::model::TableModel;
use localdb_core::validate::{check_row, check_types};
use localdb_types::error::{SchemaError, StoreError};
use localdb_types::filter::{FilterOp, FilterSet};
use localdb_types::schema::TableSchema;
use localdb_types::value::{Row, Value};

use crate::config::StoreConfig;
use crate::file::DatabaseFile;
use crate::query::{bind_value, bind_values, build_where, decode_row, map_sqlx_err};
use crate::session::SessionPool;
use crate::tabular::{batch_to_rows, rows_to_batch};

/// Validated CRUD over one table in one database file.
///
/// Holds its session pool for its whole lifetime; call
/// [`TableStore::close`] when done.
pub struct TableStore<T: TableModel> {
    session: SessionPool,
    schema: TableSchema,
    _model: PhantomData<T>,
}

impl<T: TableModel> TableStore<T> {
    /// Open a store against a database file, creating the backing table
    /// when it does not exist yet.
    pub async fn open(file: &DatabaseFile) -> Result<Self, StoreError> {
        let session = SessionPool::open(file.path()).await?;
        Self::with_session(session).await
    }

    /// Open a store honoring a [`StoreConfig`].
    pub async fn open_with(file: &DatabaseFile, config: &StoreConfig) -> Result<Self, StoreError> {
        let session = SessionPool::open_with(file.path(), config).await?;
        Self::with_session(session).await
    }

    /// Wrap an already-open session.
    pub async fn with_session(session: SessionPool) -> Result<Self, StoreError> {
        let schema = T::schema();
        if schema.column(T::id_column()).is_none() {
            return Err(SchemaError::UnknownColumn {
                column: T::id_column().to_string(),
                table: schema.table().to_string(),
            }
            .into());
        }

        sqlx::query(&schema.create_table_sql())
            .execute(session.inner())
            .await
            .map_err(map_sqlx_err)?;
        tracing::info!(table = schema.table(), "table store opened");

        Ok(Self {
            session,
            schema,
            _model: PhantomData,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn session(&self) -> &SessionPool {
        &self.session
    }

    /// Close the underlying session. Idempotent.
    pub async fn close(&self) {
        self.session.close().await;
    }

    // -----------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------

    /// Insert one record given as a row.
    ///
    /// Keys must be a subset of the schema's columns and values must be
    /// compatible with the declared types. A uniqueness conflict surfaces
    /// as [`StoreError::Conflict`] and leaves the table unchanged.
    pub async fn insert(&self, row: &Row) -> Result<(), StoreError> {
        check_row(&self.schema, row)?;
        if row.is_empty() {
            return Err(StoreError::Query("cannot insert an empty row".to_string()));
        }

        let (sql, binds) = self.insert_sql(row);
        bind_values(sqlx::query(&sql), &binds)
            .execute(self.session.inner())
            .await
            .map_err(|e| self.conflict_or_query(e))?;

        tracing::info!(table = self.schema.table(), "record added");
        Ok(())
    }

    /// Insert many rows inside one transaction.
    ///
    /// Every row is validated up front; any conflict rolls the whole
    /// batch back before the error propagates.
    pub async fn insert_many(&self, rows: &[Row]) -> Result<(), StoreError> {
        for row in rows {
            check_row(&self.schema, row)?;
            if row.is_empty() {
                return Err(StoreError::Query("cannot insert an empty row".to_string()));
            }
        }

        let mut tx = self
            .session
            .inner()
            .begin()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        for row in rows {
            let (sql, binds) = self.insert_sql(row);
            bind_values(sqlx::query(&sql), &binds)
                .execute(&mut *tx)
                .await
                .map_err(|e| self.conflict_or_query(e))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        tracing::info!(
            table = self.schema.table(),
            records = rows.len(),
            "records added"
        );
        Ok(())
    }

    /// Insert one typed record.
    pub async fn insert_record(&self, record: &T) -> Result<(), StoreError> {
        self.insert(&record.to_row()).await
    }

    /// Update the record with the given identifier.
    ///
    /// Applies only attributes that exist on the schema; unknown
    /// attributes are silently ignored. Returns `false` when no record
    /// matched.
    pub async fn update(&self, id: &Value, changes: &Row) -> Result<bool, StoreError> {
        let mut known = Row::new();
        for (key, value) in changes {
            if self.schema.column(key).is_some() {
                known.insert(key.clone(), value.clone());
            } else {
                tracing::debug!(
                    table = self.schema.table(),
                    column = key.as_str(),
                    "ignoring unknown attribute on update"
                );
            }
        }
        if known.is_empty() {
            tracing::debug!(table = self.schema.table(), "no schema attributes to update");
            return Ok(false);
        }
        check_types(&self.schema, &known)?;

        let assignments: Vec<String> = known.keys().map(|k| format!("{k} = ?")).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.schema.table(),
            assignments.join(", "),
            T::id_column()
        );
        let binds: Vec<Value> = known.values().cloned().collect();
        let query = bind_value(bind_values(sqlx::query(&sql), &binds), id);
        let result = query
            .execute(self.session.inner())
            .await
            .map_err(|e| self.conflict_or_query(e))?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                table = self.schema.table(),
                "no record found to update for the given identifier"
            );
            Ok(false)
        } else {
            tracing::info!(table = self.schema.table(), "record updated");
            Ok(true)
        }
    }

    /// Delete all rows. Returns the number of deleted records.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {}", self.schema.table());
        let result = sqlx::query(&sql)
            .execute(self.session.inner())
            .await
            .map_err(map_sqlx_err)?;
        tracing::info!(
            table = self.schema.table(),
            records = result.rows_affected(),
            "table cleared"
        );
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Fetch every record, in insertion order.
    pub async fn fetch_all(&self) -> Result<Vec<T>, StoreError> {
        let sql = format!("SELECT * FROM {} ORDER BY rowid", self.schema.table());
        let rows = sqlx::query(&sql)
            .fetch_all(self.session.inner())
            .await
            .map_err(map_sqlx_err)?;
        if rows.is_empty() {
            tracing::warn!(table = self.schema.table(), "no records found");
        }
        self.decode_records(&rows)
    }

    /// Fetch the record with the given identifier.
    pub async fn fetch_by_id(&self, id: &Value) -> Result<Option<T>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ? LIMIT 1",
            self.schema.table(),
            T::id_column()
        );
        let row = bind_value(sqlx::query(&sql), id)
            .fetch_optional(self.session.inner())
            .await
            .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                tracing::debug!(table = self.schema.table(), "record found by identifier");
                let decoded = decode_row(&self.schema, &row)?;
                Ok(Some(T::from_row(&decoded)?))
            }
            None => {
                tracing::debug!(table = self.schema.table(), "no record for identifier");
                Ok(None)
            }
        }
    }

    /// Fetch records whose column equals the given value.
    pub async fn fetch_by_attribute(
        &self,
        column: &str,
        value: &Value,
    ) -> Result<Vec<T>, StoreError> {
        let filters = FilterSet::new().with(column, FilterOp::Eq(value.clone()));
        self.filter(&filters).await
    }

    /// Fetch records matching every attribute (conjunctive equality).
    pub async fn fetch_by_attributes(&self, attrs: &Row) -> Result<Vec<T>, StoreError> {
        let mut filters = FilterSet::new();
        for (column, value) in attrs {
            filters = filters.with(column.clone(), FilterOp::Eq(value.clone()));
        }
        self.filter(&filters).await
    }

    /// Fetch records matching a filter specification, in insertion order.
    ///
    /// An empty set matches everything.
    pub async fn filter(&self, filters: &FilterSet) -> Result<Vec<T>, StoreError> {
        let (clause, binds) = build_where(&self.schema, filters)?;
        let mut sql = format!("SELECT * FROM {}", self.schema.table());
        if !clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
        sql.push_str(" ORDER BY rowid");

        let rows = bind_values(sqlx::query(&sql), &binds)
            .fetch_all(self.session.inner())
            .await
            .map_err(map_sqlx_err)?;
        tracing::debug!(
            table = self.schema.table(),
            predicates = filters.len(),
            matches = rows.len(),
            "filter applied"
        );
        self.decode_records(&rows)
    }

    /// Number of records in the table.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.schema.table());
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(self.session.inner())
            .await
            .map_err(map_sqlx_err)?;
        Ok(count as u64)
    }

    // -----------------------------------------------------------------
    // Deletes
    // -----------------------------------------------------------------

    /// Delete the record with the given identifier. Returns `false` when
    /// no record matched.
    pub async fn delete(&self, id: &Value) -> Result<bool, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.schema.table(),
            T::id_column()
        );
        let result = bind_value(sqlx::query(&sql), id)
            .execute(self.session.inner())
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                table = self.schema.table(),
                "no record found to delete for the given identifier"
            );
            Ok(false)
        } else {
            tracing::info!(table = self.schema.table(), "record deleted");
            Ok(true)
        }
    }

    /// Delete records whose column equals the given value. Returns the
    /// number of deleted records.
    pub async fn delete_by_attribute(
        &self,
        column: &str,
        value: &Value,
    ) -> Result<u64, StoreError> {
        let filters = FilterSet::new().with(column, FilterOp::Eq(value.clone()));
        self.delete_by_filter(&filters).await
    }

    /// Delete records matching a filter specification. An empty set
    /// deletes everything; deleting nothing is logged, not an error.
    pub async fn delete_by_filter(&self, filters: &FilterSet) -> Result<u64, StoreError> {
        let (clause, binds) = build_where(&self.schema, filters)?;
        let mut sql = format!("DELETE FROM {}", self.schema.table());
        if !clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }

        let result = bind_values(sqlx::query(&sql), &binds)
            .execute(self.session.inner())
            .await
            .map_err(map_sqlx_err)?;

        let deleted = result.rows_affected();
        if deleted == 0 {
            tracing::warn!(table = self.schema.table(), "no records matched for deletion");
        } else {
            tracing::info!(table = self.schema.table(), records = deleted, "records deleted");
        }
        Ok(deleted)
    }

    // -----------------------------------------------------------------
    // Tabular
    // -----------------------------------------------------------------

    /// Append a record batch, validating column names and dtypes first.
    ///
    /// Rows are written inside one transaction; a conflict rolls the
    /// whole batch back. Returns the number of appended rows.
    pub async fn append_batch(&self, batch: &RecordBatch) -> Result<u64, StoreError> {
        let rows = batch_to_rows(&self.schema, batch)?;
        self.insert_many(&rows).await?;
        tracing::info!(
            table = self.schema.table(),
            rows = rows.len(),
            "record batch appended"
        );
        Ok(rows.len() as u64)
    }

    /// Export the full table as a record batch, in insertion order.
    pub async fn to_batch(&self) -> Result<RecordBatch, StoreError> {
        let sql = format!("SELECT * FROM {} ORDER BY rowid", self.schema.table());
        let rows = sqlx::query(&sql)
            .fetch_all(self.session.inner())
            .await
            .map_err(map_sqlx_err)?;

        let decoded: Vec<Row> = rows
            .iter()
            .map(|r| decode_row(&self.schema, r))
            .collect::<Result<_, _>>()?;
        rows_to_batch(&self.schema, &decoded)
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn insert_sql(&self, row: &Row) -> (String, Vec<Value>) {
        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.schema.table(),
            columns.join(", "),
            placeholders
        );
        (sql, row.values().cloned().collect())
    }

    fn conflict_or_query(&self, e: sqlx::Error) -> StoreError {
        let err = map_sqlx_err(e);
        if let StoreError::Conflict(ref message) = err {
            tracing::error!(
                table = self.schema.table(),
                message = message.as_str(),
                "integrity conflict, rolling back"
            );
        }
        err
    }

    fn decode_records(&self, rows: &[SqliteRow]) -> Result<Vec<T>, StoreError> {
        rows.iter()
            .map(|r| {
                let decoded = decode_row(&self.schema, r)?;
                T::from_row(&decoded).map_err(StoreError::from)
            })
            .collect()
    }
}
