use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;

/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "setlist.sqlite";

/// Ensure the database file exists, create the key-value table, and return a
/// live connection.
pub fn ensure_schema(data_dir: &Path) -> Result<Connection> {
    let db_path = db_path(data_dir);

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(&db_path).context("failed to open SQLite database")?;
    create_tables(&conn)?;
    tracing::debug!(path = %db_path.display(), "opened setlist database");

    Ok(conn)
}

/// Open a throwaway database with the same schema. Used when the on-disk file
/// cannot be opened and by tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    create_tables(&conn)?;
    Ok(conn)
}

/// Resolve the SQLite file path beneath the data directory.
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE_NAME)
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create kv_store table")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_schema_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let conn = ensure_schema(&nested).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
            .unwrap();

        assert_eq!(count, 0);
        assert!(db_path(&nested).exists());
    }

    #[test]
    fn schema_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        ensure_schema(dir.path()).unwrap();
        ensure_schema(dir.path()).unwrap();
    }
}
