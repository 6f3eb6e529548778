//! Record types served by the CLI

use webapp_orm::{Field, Model, Value};

/// Current UNIX time in seconds, with millisecond precision
fn now_seconds() -> Value {
    Value::Float(chrono::Utc::now().timestamp_millis() as f64 / 1000.0)
}

webapp_orm::model! {
    /// Registered user account
    #[table("users")]
    pub struct User {
        id: i64 => Field::integer().primary_key(),
        name: String => Field::string().ddl("varchar(50)"),
        email: String => Field::string().ddl("varchar(50)"),
        admin: bool => Field::boolean(),
        created_at: f64 => Field::float().default_with(now_seconds),
    }
}

/// Register every record type, failing fast on a bad declaration.
pub fn register_all() -> webapp_orm::Result<Vec<&'static webapp_orm::Schema>> {
    Ok(vec![webapp_orm::register::<User>()?])
}

/// Render a record as a JSON object keyed by attribute name.
pub fn to_json<M: Model>(record: &M) -> anyhow::Result<serde_json::Value> {
    let schema = M::schema()?;
    let mut object = serde_json::Map::new();
    let attrs = std::iter::once(schema.primary_key()).chain(schema.fields().iter().map(String::as_str));
    for attr in attrs {
        object.insert(attr.to_string(), serde_json::to_value(record.value(attr)?)?);
    }
    Ok(serde_json::Value::Object(object))
}
