//! Durable local storage backed by SQLite.
//!
//! - `local_store`: string key/value pairs (credentials, OAuth nonce and
//!   temporary credentials, persisted language)
//! - `news_cache`: the last successful headlines categorization per language

mod credentials;
mod local_store;
mod news_cache;
mod schema;
mod types;

pub use schema::Database;
pub use types::{DatabaseError, NewsCacheEntry};
