//! Binary entry point: read settings, start logging, open the setlist
//! database and drive the Ratatui event loop until the user exits.
use anyhow::{Context, Result};
use setlist_metronome::config::{self, Settings};
use setlist_metronome::{
    ensure_schema, logging, open_in_memory, run_app, App, ClockIds, Controller, SongStore,
    SqliteStorage, STORAGE_KEY,
};

/// Fatal problems (no home directory, no terminal) bubble up to the shell. A
/// database that cannot be opened is not fatal: the session runs on an
/// in-memory copy and says so in the footer.
fn main() -> Result<()> {
    let app_dir = config::app_dir()?;
    let (settings, config_error) = match Settings::load(&config::config_path(&app_dir)) {
        Ok(settings) => (settings, None),
        Err(err) => (Settings::default(), Some(err)),
    };
    let data_dir = settings.resolve_data_dir(&app_dir);

    if let Err(err) = logging::init(&data_dir, &settings.log_filter) {
        eprintln!("logging disabled: {err}");
    }
    if let Some(err) = config_error {
        tracing::warn!(error = %err, "ignoring unreadable settings");
    }

    let (conn, open_error) = match ensure_schema(&data_dir) {
        Ok(conn) => (conn, None),
        Err(err) => {
            tracing::error!(error = ?err, "falling back to in-memory setlist");
            let conn = open_in_memory().context("failed to open fallback database")?;
            (conn, Some(err))
        }
    };

    let store = SongStore::new(SqliteStorage::new(conn, STORAGE_KEY), ClockIds::new());
    let mut app = App::new(Controller::new(store, settings.coarse_step));
    if let Some(err) = open_error {
        app.report_error("Setlist changes will not be saved", &err);
    }

    run_app(&mut app)
}
