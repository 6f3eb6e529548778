//! Schema registration.
//!
//! A record type is described by a `Declaration`. Registering it scans the
//! declared fields once and produces a `Schema`: table name, primary key,
//! ordered non-key fields, and the four SQL templates used by the CRUD layer.
//!
//! Templates are dialect-neutral: `?` placeholders and backtick-quoted
//! identifiers. The executor rewrites both for the connected driver.
//!
//! Argument order for `insert_sql` and `update_sql` is the non-key fields in
//! declaration order followed by the primary key; `Schema::argument_order`
//! yields the attribute names in that order. A record type with no columns
//! besides its primary key has no update template.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::dialect::Dialect;
use crate::error::SchemaError;
use crate::field::{ColumnKind, Field};

/// Static description of a record type, in declaration order
#[derive(Debug, Clone)]
pub struct Declaration {
    model: String,
    table: Option<String>,
    attributes: Vec<(String, Field)>,
}

impl Declaration {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            table: None,
            attributes: Vec::new(),
        }
    }

    /// Override the table name (defaults to the model name)
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, attr: impl Into<String>, field: Field) -> Self {
        self.attributes.push((attr.into(), field));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn attributes(&self) -> &[(String, Field)] {
        &self.attributes
    }
}

/// Table metadata derived once per record type
#[derive(Debug, Clone)]
pub struct Schema {
    model: String,
    table: String,
    primary_key: String,
    fields: Vec<String>,
    mappings: HashMap<String, Field>,
    columns: HashMap<String, String>,
    argument_kinds: Vec<ColumnKind>,
    select_sql: String,
    insert_sql: String,
    update_sql: Option<String>,
    delete_sql: String,
}

fn quote(ident: &str) -> String {
    format!("`{}`", ident)
}

impl Schema {
    /// Scan a declaration and derive table metadata and SQL templates.
    ///
    /// # Errors
    ///
    /// Fails when zero or several attributes are flagged as primary key, or
    /// when an attribute or column name is declared twice.
    pub fn register(decl: &Declaration) -> Result<Self, SchemaError> {
        let model = decl.model.clone();
        let table = decl.table.clone().unwrap_or_else(|| model.clone());
        info!(model = %model, table = %table, "found model");

        let mut mappings = HashMap::with_capacity(decl.attributes.len());
        let mut columns = HashMap::with_capacity(decl.attributes.len());
        let mut fields = Vec::new();
        let mut primary_key: Option<String> = None;

        for (attr, field) in &decl.attributes {
            debug!(attr = %attr, field = %field, "found mapping");

            if mappings.insert(attr.clone(), field.clone()).is_some() {
                return Err(SchemaError::DuplicateAttribute {
                    model,
                    attr: attr.clone(),
                });
            }

            let column = field.column_name().unwrap_or(attr).to_string();
            if columns.insert(column.clone(), attr.clone()).is_some() {
                return Err(SchemaError::DuplicateColumn { model, column });
            }

            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        model,
                        field: attr.clone(),
                    });
                }
                primary_key = Some(attr.clone());
            } else {
                fields.push(attr.clone());
            }
        }

        let primary_key = primary_key.ok_or_else(|| SchemaError::MissingPrimaryKey {
            model: model.clone(),
        })?;

        let column_of = |attr: &String| -> String {
            quote(mappings[attr].column_name().unwrap_or(attr))
        };
        let pk_column = column_of(&primary_key);
        let escaped: Vec<String> = fields.iter().map(column_of).collect();
        let quoted_table = quote(&table);

        let select_sql = if escaped.is_empty() {
            format!("select {} from {}", pk_column, quoted_table)
        } else {
            format!("select {}, {} from {}", pk_column, escaped.join(", "), quoted_table)
        };

        let insert_columns: Vec<&str> = escaped
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(pk_column.as_str()))
            .collect();
        let insert_sql = format!(
            "insert into {} ({}) values ({})",
            quoted_table,
            insert_columns.join(", "),
            vec!["?"; insert_columns.len()].join(", ")
        );

        let assignments: Vec<String> = escaped.iter().map(|c| format!("{}=?", c)).collect();
        let update_sql = (!assignments.is_empty()).then(|| {
            format!(
                "update {} set {} where {}=?",
                quoted_table,
                assignments.join(", "),
                pk_column
            )
        });

        let argument_kinds = fields
            .iter()
            .chain(std::iter::once(&primary_key))
            .map(|attr| mappings[attr].kind())
            .collect();

        let delete_sql = format!("delete from {} where {}=?", quoted_table, pk_column);

        Ok(Self {
            model,
            table,
            primary_key,
            fields,
            mappings,
            columns,
            argument_kinds,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Attribute name of the primary key
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-key attribute names, in declaration order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, attr: &str) -> Option<&Field> {
        self.mappings.get(attr)
    }

    /// Column name an attribute is stored under
    pub fn column(&self, attr: &str) -> Option<&str> {
        self.mappings
            .get_key_value(attr)
            .map(|(name, field)| field.column_name().unwrap_or(name))
    }

    /// Attribute name a result column maps back to
    pub fn attribute_for_column(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// Backtick-quoted primary key column, for hand-built `where` clauses
    pub fn primary_key_column(&self) -> String {
        quote(self.column(&self.primary_key).unwrap_or(&self.primary_key))
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    /// `None` when the primary key is the only column
    pub fn update_sql(&self) -> Option<&str> {
        self.update_sql.as_deref()
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }

    /// Attribute names in the argument order `insert_sql` and `update_sql` expect
    pub fn argument_order(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.primary_key.as_str()))
    }

    /// Column kinds matching `argument_order`, for typing bound `NULL`s
    pub fn argument_kinds(&self) -> &[ColumnKind] {
        &self.argument_kinds
    }

    pub fn primary_key_kind(&self) -> ColumnKind {
        self.mappings[&self.primary_key].kind()
    }

    /// `create table if not exists` statement in the given dialect's column types
    pub fn create_table_sql(&self, dialect: Dialect) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.fields.len() + 2);
        for attr in std::iter::once(&self.primary_key).chain(self.fields.iter()) {
            let field = &self.mappings[attr];
            let column = quote(field.column_name().unwrap_or(attr));
            let column_type = dialect.column_type(field.column_type());
            if field.is_primary_key() {
                lines.push(format!("{} {} not null", column, column_type));
            } else {
                lines.push(format!("{} {}", column, column_type));
            }
        }
        lines.push(format!("primary key ({})", self.primary_key_column()));

        format!(
            "create table if not exists {} (\n  {}\n)",
            quote(&self.table),
            lines.join(",\n  ")
        )
    }
}
