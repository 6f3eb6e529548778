//! Table management commands
//!
//! Commands: schema, init

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;
use webapp_orm::{Dialect, Pool, Schema};

/// Print the DDL for every registered record type.
pub fn run_schema(schemas: &[&Schema], dialect: Dialect) -> Result<()> {
    for schema in schemas {
        println!("{};", dialect.translate(&schema.create_table_sql(dialect)));
    }
    Ok(())
}

/// Create every registered table that does not exist yet.
pub async fn run_init(schemas: &[&Schema], pool: &Pool) -> Result<()> {
    let mut created = Vec::with_capacity(schemas.len());
    for schema in schemas {
        pool.execute_script(&schema.create_table_sql(pool.dialect()))
            .await
            .with_context(|| format!("Failed to create table {}", schema.table()))?;
        info!(table = schema.table(), "table ready");
        created.push(schema.table());
    }

    println!("{}", serde_json::to_string_pretty(&json!({ "tables": created }))?);
    Ok(())
}
