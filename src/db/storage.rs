//! Single-key storage backends behind the song store.
//!
//! The store only ever needs to read one string and overwrite it, so the
//! [`Storage`] trait is deliberately that small. Production uses a SQLite
//! key-value table; tests and the degraded startup path use
//! [`MemoryStorage`].

use std::cell::RefCell;
use std::rc::Rc;

use rusqlite::{params, Connection, OptionalExtension};

/// Failure reported by a storage backend. The song store logs these and keeps
/// going; nothing above it ever sees one.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to {op} key {key:?}: {source}")]
    Sqlite {
        op: &'static str,
        key: String,
        source: rusqlite::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A durable slot holding one serialized setlist.
pub trait Storage {
    /// Return the stored string, or `None` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored string.
    fn write(&mut self, value: &str) -> Result<(), StorageError>;
}

/// One row of the `kv_store` table.
pub struct SqliteStorage {
    conn: Connection,
    key: String,
}

impl SqliteStorage {
    /// Wrap a connection that already went through `ensure_schema`.
    pub fn new(conn: Connection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

impl Storage for SqliteStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![self.key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| StorageError::Sqlite {
                op: "read",
                key: self.key.clone(),
                source,
            })
    }

    fn write(&mut self, value: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![self.key, value],
            )
            .map(|_| ())
            .map_err(|source| StorageError::Sqlite {
                op: "write",
                key: self.key.clone(),
                source,
            })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    value: Option<String>,
    writes: usize,
    fail_writes: bool,
}

/// Process-local storage. Clones share the same slot, so a test can keep a
/// handle after moving one into a store and inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `value` already stored, as if written by an earlier session.
    pub fn with_value(value: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.state.borrow_mut().value = Some(value.into());
        storage
    }

    /// Current contents of the slot.
    pub fn value(&self) -> Option<String> {
        self.state.borrow().value.clone()
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }

    /// Make every following write fail, simulating a full or revoked store.
    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.state.borrow().value.clone())
    }

    fn write(&mut self, value: &str) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(StorageError::Unavailable("writes are disabled".to_string()));
        }
        state.value = Some(value.to_string());
        state.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_in_memory;

    #[test]
    fn sqlite_storage_reports_absent_key() {
        let storage = SqliteStorage::new(open_in_memory().unwrap(), "songs");
        assert_eq!(storage.read().unwrap(), None);
    }

    #[test]
    fn sqlite_storage_overwrites_value() {
        let mut storage = SqliteStorage::new(open_in_memory().unwrap(), "songs");
        storage.write("[]").unwrap();
        storage.write(r#"[{"id":1,"name":"Shout","tempo":94}]"#).unwrap();

        assert_eq!(
            storage.read().unwrap().as_deref(),
            Some(r#"[{"id":1,"name":"Shout","tempo":94}]"#)
        );
    }

    #[test]
    fn sqlite_storage_keys_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = SqliteStorage::new(
            crate::db::ensure_schema(dir.path()).unwrap(),
            "first",
        );
        let second = SqliteStorage::new(
            crate::db::ensure_schema(dir.path()).unwrap(),
            "second",
        );

        first.write("1").unwrap();
        assert_eq!(second.read().unwrap(), None);
    }

    #[test]
    fn memory_storage_clones_share_state() {
        let handle = MemoryStorage::new();
        let mut writer = handle.clone();
        writer.write("x").unwrap();

        assert_eq!(handle.value().as_deref(), Some("x"));
        assert_eq!(handle.writes(), 1);
    }

    #[test]
    fn memory_storage_can_refuse_writes() {
        let handle = MemoryStorage::with_value("old");
        let mut writer = handle.clone();
        handle.fail_writes(true);

        assert!(matches!(
            writer.write("new"),
            Err(StorageError::Unavailable(_))
        ));
        assert_eq!(handle.value().as_deref(), Some("old"));
        assert_eq!(handle.writes(), 0);
    }
}
