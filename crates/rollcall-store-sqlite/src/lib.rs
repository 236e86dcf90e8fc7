//! SQLite backend for the rollcall store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The attendance uniqueness constraint
//! lives in the schema; inserts race through `ON CONFLICT DO NOTHING`.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
