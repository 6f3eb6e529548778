//! Query execution against pooled connections.
//!
//! Every call takes one connection from the pool for its whole duration and
//! hands it back on every exit path. Templates are translated to the pool's
//! dialect right before execution.
//!
//! With `autocommit = false` the statement runs inside an explicit
//! transaction. On failure the transaction is rolled back and the driver
//! error is returned unchanged. If the calling future is dropped mid-way,
//! the sqlx transaction guard queues the rollback before the connection is
//! reused, so a cancelled call never leaves a half-applied write behind.
//!
//! Postgres types every parameter, `NULL` included, so a `NULL` bound into a
//! text column must be a text `NULL`. `execute_typed` takes the column kind
//! of each argument for that; untyped `NULL`s bind as integers.

use futures::TryStreamExt;
use sqlx::any::{AnyArguments, AnyRow, AnyTypeInfoKind};
use sqlx::query::Query;
use sqlx::{Any, Column, Row as _, ValueRef};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::field::ColumnKind;
use crate::pool::Pool;
use crate::value::{Row, Value};

impl Pool {
    /// Run a query and return each row as a column -> value map.
    ///
    /// `size` caps the number of rows fetched; `None` (or `Some(0)`) fetches all.
    pub async fn select(&self, sql: &str, args: &[Value], size: Option<usize>) -> Result<Vec<Row>> {
        let sql = self.dialect.translate(sql);
        debug!(sql = %sql, args = args.len(), "SQL");

        let mut conn = self.acquire().await?;
        let query = bind_values(sqlx::query(&sql), args, &[]);

        let rows = match size {
            Some(limit) if limit > 0 => {
                let mut stream = query.fetch(&mut *conn);
                let mut rows = Vec::with_capacity(limit);
                while rows.len() < limit {
                    match stream.try_next().await? {
                        Some(row) => rows.push(row),
                        None => break,
                    }
                }
                rows
            }
            _ => query.fetch_all(&mut *conn).await?,
        };

        info!(rows = rows.len(), "rows returned");
        rows.iter().map(decode_row).collect()
    }

    /// Run a mutating statement and return the number of affected rows.
    ///
    /// With `autocommit = false` the statement is wrapped in begin/commit and
    /// rolled back if it fails.
    pub async fn execute(&self, sql: &str, args: &[Value], autocommit: bool) -> Result<u64> {
        self.execute_typed(sql, args, &[], autocommit).await
    }

    /// `execute` with the column kind of each argument, used to type `NULL`s.
    ///
    /// Arguments past the end of `kinds` bind untyped.
    pub async fn execute_typed(
        &self,
        sql: &str,
        args: &[Value],
        kinds: &[ColumnKind],
        autocommit: bool,
    ) -> Result<u64> {
        let sql = self.dialect.translate(sql);
        debug!(sql = %sql, args = args.len(), autocommit, "SQL");

        let mut conn = self.acquire().await?;

        if autocommit {
            let done = bind_values(sqlx::query(&sql), args, kinds)
                .execute(&mut *conn)
                .await?;
            return Ok(done.rows_affected());
        }

        let mut tx = sqlx::Connection::begin(&mut *conn).await?;
        let result = bind_values(sqlx::query(&sql), args, kinds)
            .execute(&mut *tx)
            .await;
        match result {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err.into())
            }
        }
    }

    /// Run an argument-less statement such as DDL.
    pub async fn execute_script(&self, sql: &str) -> Result<u64> {
        self.execute(sql, &[], true).await
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    args: &'q [Value],
    kinds: &[ColumnKind],
) -> Query<'q, Any, AnyArguments<'q>> {
    for (index, arg) in args.iter().enumerate() {
        query = match arg {
            Value::Null => bind_null(query, kinds.get(index).copied().unwrap_or_default()),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
        };
    }
    query
}

fn bind_null<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    kind: ColumnKind,
) -> Query<'q, Any, AnyArguments<'q>> {
    match kind {
        ColumnKind::Bool => query.bind(None::<bool>),
        ColumnKind::Int => query.bind(None::<i64>),
        ColumnKind::Float => query.bind(None::<f64>),
        ColumnKind::Text => query.bind(None::<String>),
        ColumnKind::Bytes => query.bind(None::<Vec<u8>>),
    }
}

fn decode_row(row: &AnyRow) -> Result<Row> {
    let mut decoded = Row::new();

    for column in row.columns() {
        let index = column.ordinal();
        let kind = {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                AnyTypeInfoKind::Null
            } else {
                raw.type_info().kind()
            }
        };

        let value = match kind {
            AnyTypeInfoKind::Null => Value::Null,
            AnyTypeInfoKind::Bool => Value::Bool(row.try_get(index)?),
            AnyTypeInfoKind::SmallInt => Value::Int(row.try_get::<i16, _>(index)?.into()),
            AnyTypeInfoKind::Integer => Value::Int(row.try_get::<i32, _>(index)?.into()),
            AnyTypeInfoKind::BigInt => Value::Int(row.try_get(index)?),
            AnyTypeInfoKind::Real => Value::Float(row.try_get::<f32, _>(index)?.into()),
            AnyTypeInfoKind::Double => Value::Float(row.try_get(index)?),
            AnyTypeInfoKind::Text => Value::Text(row.try_get(index)?),
            // Blob
            _ => Value::Bytes(row.try_get(index)?),
        };
        decoded.insert(column.name().to_owned(), value);
    }

    Ok(decoded)
}
