//! SQLite storage for projects, chat, quotes and the client directory.
//!
//! [`Database`] wraps a single connection and exposes synchronous query
//! methods grouped by entity. [`SqliteGateway`] puts the persistence and
//! directory contracts on top of it, running every call on the blocking pool.

use std::path::Path;

use rusqlite::Connection;
use tokio::task;

use crate::error::{DatabaseResultExt, Result, TrackerError};

mod chat_queries;
mod directory_queries;
mod gateway;
mod migrations;
mod project_queries;
mod quote_queries;
mod utils;

pub use gateway::SqliteGateway;

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }
}

/// Runs blocking SQLite work on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| TrackerError::Configuration {
            message: format!("Task join error: {e}"),
        })?
}
