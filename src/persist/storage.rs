//! Key/value storage backends for persisted client state.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Trait for persisted-state backends.
///
/// Calls are blocking; async callers should go through `spawn_blocking`.
pub trait KeyValueStorage: Send + Sync {
  fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

  fn set_item(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

  fn remove_item(&self, key: &str) -> Result<(), StorageError>;

  /// Whether writes survive a restart.
  fn is_durable(&self) -> bool {
    true
  }
}

/// Storage used when persistence is disabled or unavailable.
/// Reads always miss and writes are discarded.
pub struct NoopStorage;

impl KeyValueStorage for NoopStorage {
  fn get_item(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
    Ok(None)
  }

  fn set_item(&self, _key: &str, _value: &[u8]) -> Result<(), StorageError> {
    Ok(())
  }

  fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
    Ok(())
  }

  fn is_durable(&self) -> bool {
    false
  }
}

/// SQLite-backed key/value storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the database at the default location.
  pub fn open_default() -> Result<Self, StorageError> {
    Self::open(&Self::default_path()?)
  }

  /// Open (or create) the database at `path`.
  pub fn open(path: &Path) -> Result<Self, StorageError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| StorageError(format!("Failed to create state directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      StorageError(format!(
        "Failed to open state database at {}: {}",
        path.display(),
        e
      ))
    })?;
    Self::with_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self, StorageError> {
    let conn = Connection::open_in_memory()
      .map_err(|e| StorageError(format!("Failed to open in-memory database: {}", e)))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self, StorageError> {
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| StorageError(format!("Failed to run migrations: {}", e)))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf, StorageError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| StorageError("Could not determine data directory".to_string()))?;

    Ok(data_dir.join("stockdash").join("state.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
    self
      .conn
      .lock()
      .map_err(|e| StorageError(format!("Failed to lock state database: {}", e)))
  }
}

impl KeyValueStorage for SqliteStorage {
  fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| StorageError(format!("Failed to read {}: {}", key, e)))
  }

  fn set_item(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
        params![key, value, chrono::Utc::now().to_rfc3339()],
      )
      .map_err(|e| StorageError(format!("Failed to write {}: {}", key, e)))?;
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<(), StorageError> {
    let conn = self.lock()?;
    conn
      .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
      .map_err(|e| StorageError(format!("Failed to remove {}: {}", key, e)))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sqlite_set_get_remove() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    assert_eq!(storage.get_item("k").unwrap(), None);

    storage.set_item("k", b"one").unwrap();
    storage.set_item("k", b"two").unwrap();
    assert_eq!(storage.get_item("k").unwrap(), Some(b"two".to_vec()));

    storage.remove_item("k").unwrap();
    assert_eq!(storage.get_item("k").unwrap(), None);
  }

  #[test]
  fn test_sqlite_on_disk_survives_reopen() {
    let dir = std::env::temp_dir().join(format!("stockdash-test-{}", std::process::id()));
    let path = dir.join("state.db");
    {
      let storage = SqliteStorage::open(&path).unwrap();
      storage.set_item("persist:root", b"{}").unwrap();
    }
    let storage = SqliteStorage::open(&path).unwrap();
    assert_eq!(storage.get_item("persist:root").unwrap(), Some(b"{}".to_vec()));
    let _ = std::fs::remove_dir_all(dir);
  }

  #[test]
  fn test_noop_discards_writes() {
    let storage = NoopStorage;
    storage.set_item("k", b"v").unwrap();
    assert_eq!(storage.get_item("k").unwrap(), None);
    assert!(!storage.is_durable());
  }
}
