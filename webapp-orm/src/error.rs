/// Structured error types for the persistence layer.
///
/// Schema problems are detected once, when a record type is registered, and
/// are kept in their own enum so the per-type schema cache can hold them.
/// Everything that happens afterwards (lookups, conversions, driver calls)
/// surfaces as an `OrmError`.
use thiserror::Error;

/// Failure while deriving table metadata from a record declaration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// More than one attribute is flagged as primary key
    #[error("duplicate primary key for field '{field}' in model '{model}'")]
    DuplicatePrimaryKey { model: String, field: String },

    /// No attribute is flagged as primary key
    #[error("primary key not found in model '{model}'")]
    MissingPrimaryKey { model: String },

    /// The same attribute name was declared twice
    #[error("attribute '{attr}' declared twice in model '{model}'")]
    DuplicateAttribute { model: String, attr: String },

    /// Two attributes resolve to the same column name
    #[error("column '{column}' mapped by more than one attribute in model '{model}'")]
    DuplicateColumn { model: String, column: String },
}

/// Main error type for persistence operations
#[derive(Error, Debug)]
pub enum OrmError {
    /// The record type could not be registered
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Attribute is not declared on the record type
    #[error("'{model}' object has no attribute '{attr}'")]
    AttributeLookup { model: String, attr: String },

    /// A value could not be converted to the attribute's Rust type
    #[error("cannot convert {found} value to {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// `limit` was neither a count nor an (offset, count) pair
    #[error("invalid limit: {reason}")]
    InvalidLimit { reason: String },

    /// Pool configuration is incomplete or inconsistent
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The pool was shut down before the operation started
    #[error("connection pool is closed")]
    PoolClosed,

    /// Driver-level failure, passed through unchanged
    #[error("database error: {source}")]
    Database {
        #[from]
        source: sqlx::Error,
    },
}

/// Result type alias for persistence operations
pub type Result<T> = std::result::Result<T, OrmError>;

impl OrmError {
    /// Create an attribute lookup error
    pub fn attribute_lookup(model: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::AttributeLookup {
            model: model.into(),
            attr: attr.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Create an invalid limit error
    pub fn invalid_limit(reason: impl Into<String>) -> Self {
        Self::InvalidLimit {
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
