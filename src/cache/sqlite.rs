//! SQLite-backed summary store.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::snapshot::{CacheEntry, CacheSnapshot, ReviewMarker};
use super::traits::SummaryStore;

/// Schema for the summary cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS summary_cache (
    handle TEXT PRIMARY KEY,
    last_reviewed_at TEXT NOT NULL,
    summary TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Summary store keeping one row per product handle.
///
/// `persist` syncs the table to the snapshot inside a single transaction, so
/// a failed write rolls back to the previous contents. `updated_at` records
/// when a row's marker or summary last changed.
pub struct SqliteStore {
  conn: Mutex<Connection>,
  location: String,
}

impl SqliteStore {
  /// Open (or create) the database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn, path.display().to_string())
  }

  /// Default database location under the user's data directory.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("review-digest").join("cache.db"))
  }

  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn, ":memory:".to_string())
  }

  fn with_connection(conn: Connection, location: String) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
      location,
    })
  }

  fn read_all(&self) -> Result<CacheSnapshot> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT handle, last_reviewed_at, summary FROM summary_cache ORDER BY handle")
      .map_err(|e| eyre!("Failed to prepare cache query: {}", e))?;

    let rows: Vec<(String, String, String)> = stmt
      .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
      .map_err(|e| eyre!("Failed to query cache: {}", e))?
      .collect::<rusqlite::Result<_>>()
      .map_err(|e| eyre!("Failed to read cache row: {}", e))?;

    let mut snapshot = CacheSnapshot::default();
    for (handle, last_reviewed_at, summary) in rows {
      let marker = ReviewMarker::parse(&last_reviewed_at)
        .map_err(|e| eyre!("Corrupt cache row for {}: {}", handle, e))?;
      snapshot.set(handle, CacheEntry::new(marker, summary));
    }

    Ok(snapshot)
  }

  fn replace_all(&self, snapshot: &CacheSnapshot) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // Dropping the transaction without commit rolls it back.
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    {
      // Rows whose content is unchanged keep their updated_at.
      let mut upsert = tx
        .prepare(
          "INSERT INTO summary_cache (handle, last_reviewed_at, summary, updated_at)
           VALUES (?1, ?2, ?3, datetime('now'))
           ON CONFLICT(handle) DO UPDATE SET
             last_reviewed_at = excluded.last_reviewed_at,
             summary = excluded.summary,
             updated_at = excluded.updated_at
           WHERE summary_cache.last_reviewed_at != excluded.last_reviewed_at
              OR summary_cache.summary != excluded.summary",
        )
        .map_err(|e| eyre!("Failed to prepare upsert: {}", e))?;

      for (handle, entry) in snapshot.iter() {
        upsert
          .execute(params![
            handle,
            entry.last_reviewed_at.to_string(),
            entry.summary
          ])
          .map_err(|e| eyre!("Failed to store summary for {}: {}", handle, e))?;
      }

      let stored: Vec<String> = tx
        .prepare("SELECT handle FROM summary_cache")
        .and_then(|mut stmt| {
          let handles = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>();
          handles
        })
        .map_err(|e| eyre!("Failed to list cached handles: {}", e))?;

      for handle in stored.iter().filter(|h| snapshot.get(h.as_str()).is_none()) {
        tx.execute("DELETE FROM summary_cache WHERE handle = ?1", params![handle])
          .map_err(|e| eyre!("Failed to remove summary for {}: {}", handle, e))?;
      }
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}

#[async_trait]
impl SummaryStore for SqliteStore {
  async fn load(&self) -> Result<CacheSnapshot> {
    self.read_all()
  }

  async fn persist(&self, snapshot: &CacheSnapshot) -> Result<()> {
    self.replace_all(snapshot)
  }

  fn describe(&self) -> String {
    format!("sqlite:{}", self.location)
  }
}
