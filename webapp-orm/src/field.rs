//! Column descriptors.
//!
//! A `Field` only describes a column. It does not check that the SQL column
//! type agrees with the Rust attribute type; that mapping is structural and
//! belongs to the record declaration.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Zero-argument producer of a default value
pub type Generator = Arc<dyn Fn() -> Value + Send + Sync>;

/// Default applied when an attribute is absent
#[derive(Clone)]
pub enum FieldDefault {
    /// Fixed value, cloned on use
    Value(Value),
    /// Evaluated lazily, once per absent attribute
    Generator(Generator),
}

impl FieldDefault {
    /// Produce the default. Generators run here and nowhere else.
    pub fn resolve(&self) -> Value {
        match self {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Generator(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldDefault::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Value family a column stores, used to type a bound `NULL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnKind {
    Bool,
    #[default]
    Int,
    Float,
    Text,
    Bytes,
}

impl ColumnKind {
    /// Classify an SQL column type such as `varchar(50)` or `bigint`.
    pub fn of(column_type: &str) -> Self {
        let ty = column_type.to_ascii_lowercase();
        let base = ty.split('(').next().unwrap_or_default().trim();
        match base {
            "bool" | "boolean" => ColumnKind::Bool,
            "int" | "integer" | "bigint" | "smallint" | "tinyint" | "mediumint" | "serial"
            | "bigserial" => ColumnKind::Int,
            "real" | "float" | "double" | "double precision" | "decimal" | "numeric" => {
                ColumnKind::Float
            }
            "blob" | "longblob" | "bytea" | "binary" | "varbinary" => ColumnKind::Bytes,
            _ => ColumnKind::Text,
        }
    }
}

/// Mapping metadata for one column
#[derive(Debug, Clone)]
pub struct Field {
    name: Option<String>,
    column_type: String,
    primary_key: bool,
    default: Option<FieldDefault>,
}

impl Field {
    pub fn new(column_type: impl Into<String>) -> Self {
        Self {
            name: None,
            column_type: column_type.into(),
            primary_key: false,
            default: None,
        }
    }

    /// `varchar(100)`, no default
    pub fn string() -> Self {
        Self::new("varchar(100)")
    }

    /// `boolean`, defaults to `false`
    pub fn boolean() -> Self {
        Self::new("boolean").default(false)
    }

    /// `bigint`, defaults to `0`
    pub fn integer() -> Self {
        Self::new("bigint").default(0i64)
    }

    /// `real`, defaults to `0.0`
    pub fn float() -> Self {
        Self::new("real").default(0.0f64)
    }

    /// `text`, no default
    pub fn text() -> Self {
        Self::new("text")
    }

    /// Use `column` instead of the attribute name in SQL.
    pub fn name(mut self, column: impl Into<String>) -> Self {
        self.name = Some(column.into());
        self
    }

    /// Override the SQL column type.
    pub fn ddl(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    pub fn default_with<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Generator(Arc::new(generator)));
        self
    }

    pub fn no_default(mut self) -> Self {
        self.default = None;
        self
    }

    /// Explicit column name, if one was set
    pub fn column_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn column_type(&self) -> &str {
        &self.column_type
    }

    pub fn kind(&self) -> ColumnKind {
        ColumnKind::of(&self.column_type)
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default_value(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}, {}:{}>",
            if self.primary_key { "PrimaryKey" } else { "Field" },
            self.column_type,
            self.name.as_deref().unwrap_or("-")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_column_families() {
        assert_eq!(Field::string().column_type(), "varchar(100)");
        assert_eq!(Field::boolean().column_type(), "boolean");
        assert_eq!(Field::integer().column_type(), "bigint");
        assert_eq!(Field::float().column_type(), "real");
        assert_eq!(Field::text().column_type(), "text");
        assert_eq!(Field::string().ddl("varchar(50)").column_type(), "varchar(50)");
    }

    #[test]
    fn test_family_defaults() {
        let resolve = |f: Field| f.default_value().map(FieldDefault::resolve);
        assert_eq!(resolve(Field::boolean()), Some(Value::Bool(false)));
        assert_eq!(resolve(Field::integer()), Some(Value::Int(0)));
        assert_eq!(resolve(Field::float()), Some(Value::Float(0.0)));
        assert_eq!(resolve(Field::string()), None);
        assert_eq!(resolve(Field::integer().primary_key().no_default()), None);
    }

    #[test]
    fn test_generator_is_not_called_at_declaration() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let field = Field::float().default_with(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Value::Float(1.5)
        });
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        let value = field.default_value().map(FieldDefault::resolve);
        assert_eq!(value, Some(Value::Float(1.5)));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_column_kinds() {
        assert_eq!(Field::string().kind(), ColumnKind::Text);
        assert_eq!(Field::text().kind(), ColumnKind::Text);
        assert_eq!(Field::boolean().kind(), ColumnKind::Bool);
        assert_eq!(Field::integer().kind(), ColumnKind::Int);
        assert_eq!(Field::float().kind(), ColumnKind::Float);
        assert_eq!(ColumnKind::of("VARCHAR(50)"), ColumnKind::Text);
        assert_eq!(ColumnKind::of("decimal(10, 2)"), ColumnKind::Float);
        assert_eq!(ColumnKind::of("bytea"), ColumnKind::Bytes);
        assert_eq!(ColumnKind::of("timestamp"), ColumnKind::Text);
    }

    #[test]
    fn test_display() {
        let field = Field::integer().primary_key().name("user_id");
        assert_eq!(field.to_string(), "<PrimaryKey, bigint:user_id>");
    }
}
