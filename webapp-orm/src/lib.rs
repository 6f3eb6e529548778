//! Declarative record-to-table mapping over a pooled async SQL connection.
//!
//! Record types are declared with [`model!`]; registering one derives its
//! table metadata and SQL templates once. All data access goes through an
//! explicitly created [`Pool`] that is passed by reference into every call.

pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod field;
pub mod model;
pub mod pool;
pub mod schema;
pub mod value;

pub use config::{config_dir, AppConfig, PoolConfig};
pub use dialect::Dialect;
pub use error::{OrmError, Result, SchemaError};
pub use field::{ColumnKind, Field, FieldDefault, Generator};
pub use model::{
    build_find_all, build_find_number, register, FindOptions, Limit, Model, WriteOutcome,
    NUMBER_ALIAS,
};
pub use pool::Pool;
pub use schema::{Declaration, Schema};
pub use value::{FromValue, Row, Value};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::OnceCell;
}
