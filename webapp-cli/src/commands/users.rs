//! User record commands
//!
//! Commands: list, get, add, update, remove, count

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use webapp_orm::{FindOptions, Limit, Model, Pool, Value, WriteOutcome};

use crate::models::{to_json, User};

#[derive(Parser, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommands,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// List users, optionally filtered, ordered and limited
    List(ListArgs),
    /// Show one user by id
    Get(IdArgs),
    /// Insert a new user
    Add(AddArgs),
    /// Change fields of an existing user
    Update(UpdateArgs),
    /// Delete a user by id
    Remove(IdArgs),
    /// Count users, optionally filtered
    Count(FilterArgs),
}

#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// SQL condition without the `where` keyword (e.g. "`admin` = ?")
    #[arg(long)]
    filter: Option<String>,

    /// Value bound to the next `?` in the filter (repeatable)
    #[arg(long = "arg", value_parser = parse_value)]
    args: Vec<Value>,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// SQL ordering without the `order by` keywords (e.g. "`id` desc")
    #[arg(long)]
    order_by: Option<String>,

    /// Row cap: N, or OFFSET,COUNT
    #[arg(long, value_parser = parse_limit)]
    limit: Option<Limit>,
}

#[derive(Parser, Debug)]
pub struct IdArgs {
    /// User id
    id: i64,
}

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// User id
    #[arg(long)]
    id: i64,

    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    /// Grant admin rights
    #[arg(long)]
    admin: bool,
}

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// User id
    id: i64,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    admin: Option<bool>,
}

/// Integers, floats and booleans bind as such; anything else binds as text.
fn parse_value(raw: &str) -> Result<Value, String> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Ok(Value::Float(f));
    }
    match raw {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Ok(Value::Text(raw.to_string())),
    }
}

fn parse_limit(raw: &str) -> Result<Limit, String> {
    raw.parse().map_err(|e: webapp_orm::OrmError| e.to_string())
}

pub async fn run_users(args: UsersArgs, pool: &Pool) -> Result<()> {
    match args.command {
        UsersCommands::List(args) => list(args, pool).await,
        UsersCommands::Get(args) => get(args, pool).await,
        UsersCommands::Add(args) => add(args, pool).await,
        UsersCommands::Update(args) => update(args, pool).await,
        UsersCommands::Remove(args) => remove(args, pool).await,
        UsersCommands::Count(args) => count(args, pool).await,
    }
}

fn print(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn load(pool: &Pool, id: i64) -> Result<User> {
    User::find(pool, id)
        .await
        .context("Failed to look up user")?
        .with_context(|| format!("User {} not found", id))
}

fn ensure_applied(outcome: WriteOutcome, action: &str, id: i64) -> Result<()> {
    if !outcome.is_applied() {
        bail!("Failed to {} user {}: {}", action, id, outcome);
    }
    Ok(())
}

async fn list(args: ListArgs, pool: &Pool) -> Result<()> {
    let mut options = FindOptions::new();
    if let Some(filter) = args.filter.filter {
        options = options.filter(filter, args.filter.args);
    }
    if let Some(order_by) = args.order_by {
        options = options.order_by(order_by);
    }
    if let Some(limit) = args.limit {
        options = options.limit(limit);
    }

    let users = User::find_all(pool, options)
        .await
        .context("Failed to list users")?;
    let rendered = users.iter().map(to_json).collect::<Result<Vec<_>>>()?;
    print(&serde_json::Value::Array(rendered))
}

async fn get(args: IdArgs, pool: &Pool) -> Result<()> {
    let user = load(pool, args.id).await?;
    print(&to_json(&user)?)
}

async fn add(args: AddArgs, pool: &Pool) -> Result<()> {
    let mut user = User {
        id: Some(args.id),
        name: Some(args.name),
        email: Some(args.email),
        admin: Some(args.admin),
        ..Default::default()
    };

    let outcome = user.save(pool).await.context("Failed to add user")?;
    ensure_applied(outcome, "add", args.id)?;
    info!(id = args.id, "user added");
    print(&to_json(&user)?)
}

async fn update(args: UpdateArgs, pool: &Pool) -> Result<()> {
    let mut user = load(pool, args.id).await?;
    if let Some(name) = args.name {
        user.name = Some(name);
    }
    if let Some(email) = args.email {
        user.email = Some(email);
    }
    if let Some(admin) = args.admin {
        user.admin = Some(admin);
    }

    let outcome = user.update(pool).await.context("Failed to update user")?;
    ensure_applied(outcome, "update", args.id)?;
    print(&to_json(&user)?)
}

async fn remove(args: IdArgs, pool: &Pool) -> Result<()> {
    let user = load(pool, args.id).await?;
    let outcome = user.remove(pool).await.context("Failed to remove user")?;
    ensure_applied(outcome, "remove", args.id)?;
    print(&json!({ "removed": args.id }))
}

async fn count(args: FilterArgs, pool: &Pool) -> Result<()> {
    let number = User::find_number(pool, "count(`id`)", args.filter.as_deref(), &args.args)
        .await
        .context("Failed to count users")?;
    let count = number.and_then(|v| v.as_i64()).unwrap_or(0);
    print(&json!({ "count": count }))
}
