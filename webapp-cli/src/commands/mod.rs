//! Command implementations for the webapp CLI

pub mod schema;
pub mod users;

// Re-export main dispatcher functions for flat access from main.rs
pub use schema::{run_init, run_schema};
pub use users::run_users;
