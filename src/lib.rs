//! Core library surface for the setlist metronome.
//!
//! The store (`db`) and the session controller (`controller`) carry all of
//! the behavior; `ui` is a terminal rendering of the controller's snapshot.
pub mod config;
pub mod controller;
pub mod db;
pub mod logging;
pub mod models;
pub mod ui;

/// Persistence entry points used by `main.rs` to open the setlist.
pub use db::{
    ensure_schema, open_in_memory, ClockIds, SongStore, SqliteStorage, STORAGE_KEY,
};

/// Domain types that other layers manipulate.
pub use models::{clamp_tempo, Song};

/// Session orchestration and the interactive entry point.
pub use controller::Controller;
pub use ui::{run_app, App};
