//! SQLite-backed durable cache.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};

use super::DurableCache;
use crate::{
    db::run_blocking,
    error::{DatabaseResultExt, Result, TrackerError},
};

const CREATE_CACHE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY NOT NULL,
    blob TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";
const SELECT_ENTRY_SQL: &str = "SELECT blob FROM cache_entries WHERE key = ?1";
const UPSERT_ENTRY_SQL: &str = "INSERT INTO cache_entries (key, blob, updated_at) VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET blob = excluded.blob, updated_at = excluded.updated_at";

/// Key/blob cache stored in its own SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteCache {
    path: PathBuf,
}

impl SqliteCache {
    /// Opens (creating if needed) the cache file at `path`.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TrackerError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let cache = Self { path };
        let check = cache.clone();
        run_blocking(move || check.connect().map(|_| ())).await?;
        Ok(cache)
    }

    /// Default location: `$XDG_CACHE_HOME/elitetrack/cache.db`.
    pub fn default_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("elitetrack")
            .place_cache_file("cache.db")
            .map_err(|e| TrackerError::XdgDirectory(e.to_string()))
    }

    fn connect(&self) -> Result<Connection> {
        let connection = Connection::open(&self.path).db_context("Failed to open cache database")?;
        connection
            .execute(CREATE_CACHE_TABLE_SQL, [])
            .db_context("Failed to create cache table")?;
        Ok(connection)
    }
}

#[async_trait]
impl DurableCache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let this = self.clone();
        let key = key.to_string();
        run_blocking(move || {
            let connection = this.connect()?;
            connection
                .query_row(SELECT_ENTRY_SQL, params![key], |row| row.get(0))
                .optional()
                .db_context("Failed to read cache entry")
        })
        .await
    }

    async fn set(&self, key: &str, blob: String) -> Result<()> {
        let this = self.clone();
        let key = key.to_string();
        run_blocking(move || {
            let connection = this.connect()?;
            connection
                .execute(
                    UPSERT_ENTRY_SQL,
                    params![key, blob, Timestamp::now().to_string()],
                )
                .db_context("Failed to write cache entry")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_sqlite_cache_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        let cache = SqliteCache::open(&path).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.set("k", "[1]".to_string()).await.unwrap();
        cache.set("k", "[1,2]".to_string()).await.unwrap();

        let reopened = SqliteCache::open(&path).await.unwrap();
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("[1,2]"));
    }
}
