//! End-to-end checks of the setlist against the on-disk SQLite backend:
//! every session below opens the database fresh, as a relaunch would.

use setlist_metronome::controller::DEFAULT_COARSE_STEP;
use setlist_metronome::db::{default_songs, SequentialIds, Storage};
use setlist_metronome::{ensure_schema, Controller, SongStore, SqliteStorage, STORAGE_KEY};
use tempfile::TempDir;

type DiskController = Controller<SqliteStorage, SequentialIds>;

fn open_session(dir: &TempDir, first_id: i64) -> DiskController {
    let conn = ensure_schema(dir.path()).expect("schema");
    let store = SongStore::new(
        SqliteStorage::new(conn, STORAGE_KEY),
        SequentialIds::starting_at(first_id),
    );
    Controller::new(store, DEFAULT_COARSE_STEP)
}

fn stored_json(dir: &TempDir) -> Option<String> {
    let conn = ensure_schema(dir.path()).expect("schema");
    SqliteStorage::new(conn, STORAGE_KEY).read().expect("read")
}

#[test]
fn first_launch_uses_defaults_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_session(&dir, 1000);

    assert_eq!(session.songs(), default_songs().as_slice());
    assert_eq!(session.selected_song_id(), Some(1));
    assert_eq!(session.tempo(), 135);
    assert_eq!(stored_json(&dir), None);
}

#[test]
fn edits_survive_a_relaunch() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut session = open_session(&dir, 1000);
        session.draft_mut().name = "  New Song  ".to_string();
        session.draft_mut().tempo = "999".to_string();
        session.submit_draft();
        session.delete_song(2);
        session.reorder_songs(1000, 1);
        session.toggle_song_editing(3);
    }

    let session = open_session(&dir, 2000);
    let songs = session.songs();
    assert_eq!(songs.len(), 19);
    assert_eq!(songs[0].id, 1000);
    assert_eq!(songs[0].name, "New Song");
    assert_eq!(songs[0].tempo, 240);
    assert_eq!(songs[1].id, 1);
    assert!(songs.iter().all(|song| !song.editing));
    assert!(songs.iter().all(|song| song.id != 2));
    assert_eq!(session.selected_song_id(), Some(1000));
}

#[test]
fn stored_form_holds_only_id_name_and_tempo() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&dir, 1000);
    session.toggle_song_editing(4);

    let json = stored_json(&dir).expect("written");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 19);
    for entry in entries {
        let mut keys: Vec<&str> = entry
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort();
        assert_eq!(keys, ["id", "name", "tempo"]);
    }
}

#[test]
fn reset_after_custom_edits_restores_defaults() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut session = open_session(&dir, 1000);
        for id in 1..=10 {
            session.delete_song(id);
        }
        session.reset_to_default();
    }

    let session = open_session(&dir, 1000);
    assert_eq!(session.songs(), default_songs().as_slice());
}

#[test]
fn corrupt_store_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    {
        let conn = ensure_schema(dir.path()).unwrap();
        let mut storage = SqliteStorage::new(conn, STORAGE_KEY);
        storage.write("{not json").unwrap();
    }

    let session = open_session(&dir, 1000);
    assert_eq!(session.songs(), default_songs().as_slice());
}
