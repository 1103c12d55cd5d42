//! Persistence module split across logical submodules.

mod connection;
mod songs;
mod storage;

pub use connection::{db_path, ensure_schema, open_in_memory};
pub use songs::{
    default_songs, ClockIds, IdSource, SequentialIds, SongStore, STORAGE_KEY,
};
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageError};
