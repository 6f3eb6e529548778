//! SQL dialects and placeholder translation.
//!
//! All templates are written with `?` placeholders and backtick-quoted
//! identifiers. MySQL and SQLite accept that form as-is; Postgres needs
//! numbered `$n` placeholders and double-quoted identifiers.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OrmError;
use crate::model::Limit;

/// Database driver family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "mariadb")]
    MySql,
    #[serde(alias = "postgresql")]
    Postgres,
    Sqlite,
}

impl Dialect {
    /// URL scheme understood by the sqlx `Any` driver
    pub fn scheme(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Whether connecting requires user, password and database name
    pub fn requires_credentials(&self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Rewrite a neutral template into this dialect's native syntax.
    pub fn translate<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self {
            Dialect::MySql | Dialect::Sqlite => Cow::Borrowed(sql),
            Dialect::Postgres => Cow::Owned(numbered_placeholders(sql)),
        }
    }

    /// Native spelling of a declared column type.
    ///
    /// The SQLite driver cannot hand `boolean` columns back through the
    /// `Any` driver, so they are stored as `integer` (read back as 0/1).
    /// Postgres `real` is single precision, so it becomes `double precision`.
    pub fn column_type<'a>(&self, declared: &'a str) -> &'a str {
        match (self, declared.to_ascii_lowercase().as_str()) {
            (Dialect::Sqlite, "boolean" | "bool") => "integer",
            (Dialect::Postgres, "real" | "double") => "double precision",
            _ => declared,
        }
    }

    /// `limit` fragment for this dialect. Ranges always bind `[offset, count]`.
    pub fn limit_clause(&self, limit: Limit) -> &'static str {
        match (self, limit) {
            (_, Limit::Count(_)) => "limit ?",
            (Dialect::Postgres, Limit::Range { .. }) => "offset ? limit ?",
            (_, Limit::Range { .. }) => "limit ?, ?",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for Dialect {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(OrmError::config(format!("unsupported driver '{}'", other))),
        }
    }
}

/// `?` -> `$n`, backtick -> double quote; single-quoted literals untouched
fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0usize;
    let mut in_literal = false;

    for ch in sql.chars() {
        match ch {
            // '' inside a literal toggles out and straight back in
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            '`' if !in_literal => out.push('"'),
            _ => out.push(ch),
        }
    }
    out
}
