//! Record types and the CRUD surface.
//!
//! A record type is a plain struct whose attributes are `Option<T>`: `None`
//! means "absent", to be filled from the field default on first read or on
//! `save`. The `model!` macro declares such a struct together with its
//! `Model` impl.
//!
//! ```ignore
//! use webapp_orm::{model, Field, Model};
//!
//! model! {
//!     #[table("accounts")]
//!     pub struct Account {
//!         id: i64 => Field::integer().primary_key(),
//!         name: String => Field::string(),
//!         balance: f64 => Field::float(),
//!     }
//! }
//!
//! let mut account = Account { id: Some(1), name: Some("a".into()), ..Default::default() };
//! account.save(&pool).await?;
//! let found = Account::find(&pool, 1).await?;
//! ```

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::error::{OrmError, Result};
use crate::field::Field;
use crate::pool::Pool;
use crate::schema::{Declaration, Schema};
use crate::value::{Row, Value};

/// Column alias used by `find_number`
pub const NUMBER_ALIAS: &str = "_num_";

/// Row cap for `find_all`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Top-N rows
    Count(u64),
    /// `count` rows starting after `offset`
    Range { offset: u64, count: u64 },
}

impl Limit {
    /// Bound arguments, `[n]` or `[offset, count]`
    pub fn args(&self) -> Result<Vec<Value>> {
        let to_value = |n: u64| {
            i64::try_from(n)
                .map(Value::Int)
                .map_err(|_| OrmError::invalid_limit(format!("{} is out of range", n)))
        };
        match *self {
            Limit::Count(n) => Ok(vec![to_value(n)?]),
            Limit::Range { offset, count } => Ok(vec![to_value(offset)?, to_value(count)?]),
        }
    }
}

impl From<u64> for Limit {
    fn from(n: u64) -> Self {
        Limit::Count(n)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Limit::Range { offset, count }
    }
}

fn non_negative(value: &Value) -> Result<u64> {
    match value {
        Value::Int(n) => u64::try_from(*n)
            .map_err(|_| OrmError::invalid_limit(format!("negative limit {}", n))),
        other => Err(OrmError::invalid_limit(format!(
            "expected integer, got {}",
            other.kind()
        ))),
    }
}

impl TryFrom<Value> for Limit {
    type Error = OrmError;

    fn try_from(value: Value) -> Result<Self> {
        non_negative(&value).map(Limit::Count)
    }
}

impl TryFrom<&[Value]> for Limit {
    type Error = OrmError;

    fn try_from(values: &[Value]) -> Result<Self> {
        match values {
            [count] => Ok(Limit::Count(non_negative(count)?)),
            [offset, count] => Ok(Limit::Range {
                offset: non_negative(offset)?,
                count: non_negative(count)?,
            }),
            other => Err(OrmError::invalid_limit(format!(
                "expected 1 or 2 values, got {}",
                other.len()
            ))),
        }
    }
}

/// Parses `"5"` or `"10,20"` (offset, count)
impl FromStr for Limit {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| OrmError::invalid_limit(format!("'{}' is not an integer", part.trim())))
            })
            .collect::<Result<Vec<Value>>>()?;
        Limit::try_from(parts.as_slice())
    }
}

/// Optional clauses appended to the base `select`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    filter: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `where` clause (without the keyword) and its arguments
    pub fn filter(mut self, clause: impl Into<String>, args: Vec<Value>) -> Self {
        self.filter = Some(clause.into());
        self.args = args;
        self
    }

    /// `order by` clause (without the keywords)
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

/// Compose the `find_all` statement and its arguments.
pub fn build_find_all(
    schema: &Schema,
    dialect: Dialect,
    options: &FindOptions,
) -> Result<(String, Vec<Value>)> {
    let mut sql: Vec<&str> = vec![schema.select_sql()];
    let mut args = options.args.clone();

    if let Some(filter) = &options.filter {
        sql.push("where");
        sql.push(filter);
    }
    if let Some(order_by) = &options.order_by {
        sql.push("order by");
        sql.push(order_by);
    }
    if let Some(limit) = options.limit {
        sql.push(dialect.limit_clause(limit));
        args.extend(limit.args()?);
    }

    Ok((sql.join(" "), args))
}

/// Compose the `find_number` statement.
pub fn build_find_number(schema: &Schema, expr: &str, filter: Option<&str>) -> String {
    let mut sql = format!("select {} as {} from `{}`", expr, NUMBER_ALIAS, schema.table());
    if let Some(filter) = filter {
        sql.push_str(" where ");
        sql.push_str(filter);
    }
    sql
}

/// Result of a single-row write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Exactly one row changed
    Applied,
    /// No row matched
    NotFound,
    /// More than one row changed
    Mismatch { affected: u64 },
    /// Nothing to write: the primary key is the record's only column
    Unchanged,
}

impl WriteOutcome {
    pub fn from_affected(affected: u64) -> Self {
        match affected {
            1 => WriteOutcome::Applied,
            0 => WriteOutcome::NotFound,
            n => WriteOutcome::Mismatch { affected: n },
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }

    fn checked(action: &str, schema: &Schema, affected: u64) -> Self {
        let outcome = Self::from_affected(affected);
        if !outcome.is_applied() {
            warn!(table = schema.table(), affected, "failed to {} record", action);
        }
        outcome
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::Applied => f.write_str("applied"),
            WriteOutcome::NotFound => f.write_str("not found"),
            WriteOutcome::Mismatch { affected } => write!(f, "{} rows affected", affected),
            WriteOutcome::Unchanged => f.write_str("nothing to update"),
        }
    }
}

/// A record type mapped to one table.
///
/// Implement through `model!`; the provided methods are the CRUD surface.
#[async_trait]
pub trait Model: Default + Send + Sync + Sized + 'static {
    /// Field declarations, in declaration order
    fn declare() -> Declaration;

    /// Registered schema, derived from `declare` on first call and cached
    fn schema() -> Result<&'static Schema>;

    /// Raw attribute value; `None` when absent
    fn get_value(&self, attr: &str) -> Result<Option<Value>>;

    fn set_value(&mut self, attr: &str, value: Value) -> Result<()>;

    /// Build a record from a result row, mapping columns back to attributes.
    fn from_row(row: Row) -> Result<Self> {
        let schema = Self::schema()?;
        let mut record = Self::default();
        for (column, value) in row {
            let attr = schema.attribute_for_column(&column).unwrap_or(&column);
            record.set_value(attr, value)?;
        }
        Ok(record)
    }

    /// Attribute value without defaulting; absent reads as `Null`
    fn value(&self, attr: &str) -> Result<Value> {
        Ok(self.get_value(attr)?.unwrap_or(Value::Null))
    }

    /// Attribute value, resolving and storing the field default when absent.
    ///
    /// A generator default runs at most once per record: the produced value
    /// is written back, so later reads return it unchanged.
    fn value_or_default(&mut self, attr: &str) -> Result<Value> {
        if let Some(value) = self.get_value(attr)? {
            return Ok(value);
        }

        let schema = Self::schema()?;
        let Some(default) = schema.field(attr).and_then(Field::default_value) else {
            return Ok(Value::Null);
        };

        let value = default.resolve();
        debug!(attr, value = %value, "using default value");
        self.set_value(attr, value.clone())?;
        Ok(value)
    }

    /// Look up one record by primary key.
    async fn find<K>(pool: &Pool, pk: K) -> Result<Option<Self>>
    where
        K: Into<Value> + Send,
    {
        let schema = Self::schema()?;
        let sql = format!("{} where {}=?", schema.select_sql(), schema.primary_key_column());
        let rows = pool.select(&sql, &[pk.into()], Some(1)).await?;
        rows.into_iter().next().map(Self::from_row).transpose()
    }

    /// Select records with optional `where`, `order by` and `limit`.
    async fn find_all(pool: &Pool, options: FindOptions) -> Result<Vec<Self>> {
        let schema = Self::schema()?;
        let (sql, args) = build_find_all(schema, pool.dialect(), &options)?;
        let rows = pool.select(&sql, &args, None).await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    /// Single scalar such as `count(id)`; `None` when no row comes back.
    async fn find_number(
        pool: &Pool,
        expr: &str,
        filter: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let schema = Self::schema()?;
        let sql = build_find_number(schema, expr, filter);
        let mut rows = pool.select(&sql, args, Some(1)).await?;
        Ok(rows.pop().and_then(|mut row| row.remove(NUMBER_ALIAS)))
    }

    /// Insert this record, filling absent attributes from their defaults.
    async fn save(&mut self, pool: &Pool) -> Result<WriteOutcome> {
        let schema = Self::schema()?;
        let mut args = Vec::with_capacity(schema.fields().len() + 1);
        for attr in schema.argument_order() {
            args.push(self.value_or_default(attr)?);
        }
        let affected = pool
            .execute_typed(schema.insert_sql(), &args, schema.argument_kinds(), pool.autocommit())
            .await?;
        Ok(WriteOutcome::checked("insert", schema, affected))
    }

    /// Write every non-key attribute back to the row with this primary key.
    ///
    /// A record type without non-key columns has nothing to write and
    /// returns `WriteOutcome::Unchanged` without touching the database.
    async fn update(&self, pool: &Pool) -> Result<WriteOutcome> {
        let schema = Self::schema()?;
        let Some(sql) = schema.update_sql() else {
            debug!(table = schema.table(), "no columns to update");
            return Ok(WriteOutcome::Unchanged);
        };
        let args = schema
            .argument_order()
            .map(|attr| self.value(attr))
            .collect::<Result<Vec<_>>>()?;
        let affected = pool
            .execute_typed(sql, &args, schema.argument_kinds(), pool.autocommit())
            .await?;
        Ok(WriteOutcome::checked("update", schema, affected))
    }

    /// Delete the row with this record's primary key.
    async fn remove(&self, pool: &Pool) -> Result<WriteOutcome> {
        let schema = Self::schema()?;
        let args = [self.value(schema.primary_key())?];
        let kinds = [schema.primary_key_kind()];
        let affected = pool
            .execute_typed(schema.delete_sql(), &args, &kinds, pool.autocommit())
            .await?;
        Ok(WriteOutcome::checked("remove", schema, affected))
    }
}

/// Register a record type eagerly so schema errors surface at startup.
pub fn register<M: Model>() -> Result<&'static Schema> {
    M::schema()
}

/// Declare a record struct and implement `Model` for it.
///
/// Each attribute becomes `pub name: Option<T>`. The optional
/// `#[table("...")]` overrides the table name, which otherwise is the
/// struct name.
#[macro_export]
macro_rules! model {
    (
        $(#[doc = $doc:expr])*
        $(#[table($table:expr)])?
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $fdoc:expr])*
                $field:ident : $ty:ty => $desc:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[doc = $fdoc])*
                pub $field: ::std::option::Option<$ty>,
            )*
        }

        impl $crate::Model for $name {
            fn declare() -> $crate::Declaration {
                $crate::Declaration::new(stringify!($name))
                    $(.table($table))?
                    $(.field(stringify!($field), $desc))*
            }

            fn schema() -> $crate::Result<&'static $crate::Schema> {
                static SCHEMA: $crate::__private::OnceCell<
                    ::std::result::Result<$crate::Schema, $crate::SchemaError>,
                > = $crate::__private::OnceCell::new();

                SCHEMA
                    .get_or_init(|| {
                        $crate::Schema::register(&<Self as $crate::Model>::declare())
                    })
                    .as_ref()
                    .map_err(|e| $crate::OrmError::from(e.clone()))
            }

            fn get_value(
                &self,
                attr: &str,
            ) -> $crate::Result<::std::option::Option<$crate::Value>> {
                match attr {
                    $(stringify!($field) => Ok(self.$field.clone().map($crate::Value::from)),)*
                    _ => Err($crate::OrmError::attribute_lookup(stringify!($name), attr)),
                }
            }

            fn set_value(&mut self, attr: &str, value: $crate::Value) -> $crate::Result<()> {
                match attr {
                    $(stringify!($field) => {
                        self.$field = <$ty as $crate::FromValue>::from_nullable(value)?;
                        Ok(())
                    })*
                    _ => Err($crate::OrmError::attribute_lookup(stringify!($name), attr)),
                }
            }
        }
    };
}
