//! The persisted setlist.
//!
//! [`SongStore`] is the only place that changes the song list. Every
//! operation takes the current list, returns the next one and writes the
//! whole list back to storage before returning. Storage trouble is logged and
//! swallowed: the returned list is authoritative for the rest of the session
//! whether or not the write landed.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{clamp_tempo, LoadedSong, Song, SongPatch, StoredSong, DEFAULT_TEMPO};

use super::storage::Storage;

/// Storage key holding the JSON array of songs.
pub const STORAGE_KEY: &str = "gigitime-songs";

/// Built-in setlist as `(id, name, tempo)`. The first name is stored verbatim
/// as it has always shipped, so persisted lists compare equal to it.
const DEFAULT_SONGS: [(i64, &str, i64); 19] = [
    (1, "Juniors wailing \u{e2}\u{20ac}\u{201c} Status Quo", 135),
    (2, "Sharp dressed man - Nickelback", 127),
    (3, "Wiskey in the jar", 129),
    (4, "Shout", 94),
    (5, "I want to break free", 119),
    (6, "Behind blue eyes", 124),
    (7, "Pretty woman", 126),
    (8, "Eye in the sky", 122),
    (9, "What's a woman", 100),
    (10, "Ran so far away", 120),
    (11, "Summer of 69", 128),
    (12, "Don't bring me down", 119),
    (13, "Hold the line", 102),
    (14, "The best", 104),
    (15, "Every breath you take", 117),
    (16, "Beat it", 139),
    (17, "Call me", 139),
    (18, "Sweet dreams", 120),
    (19, "Livin on a prayer, Poison, The final countdown", 120),
];

/// The fixed default setlist, used on first launch and by reset.
pub fn default_songs() -> Vec<Song> {
    DEFAULT_SONGS
        .iter()
        .map(|&(id, name, tempo)| Song::new(id, name, tempo))
        .collect()
}

/// Hands out candidate ids for new songs.
pub trait IdSource {
    fn next_id(&mut self) -> i64;
}

/// Millisecond wall-clock ids, bumped so two calls never return the same
/// value even within one millisecond.
#[derive(Debug, Default)]
pub struct ClockIds {
    last: i64,
}

impl ClockIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for ClockIds {
    fn next_id(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        self.last = now.max(self.last.saturating_add(1));
        self.last
    }
}

/// Plain counter. Deterministic, so tests can predict the ids they get.
#[derive(Debug)]
pub struct SequentialIds {
    next: i64,
}

impl SequentialIds {
    pub fn starting_at(next: i64) -> Self {
        Self { next }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Owner of the persisted song list.
pub struct SongStore<S, I> {
    storage: S,
    ids: I,
}

impl<S: Storage, I: IdSource> SongStore<S, I> {
    pub fn new(storage: S, ids: I) -> Self {
        Self { storage, ids }
    }

    /// Read the stored list, falling back to the defaults when nothing is
    /// stored or the stored text cannot be understood.
    pub fn load(&mut self) -> Vec<Song> {
        let raw = match self.storage.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("no stored setlist; using defaults");
                return default_songs();
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read stored setlist; using defaults");
                return default_songs();
            }
        };

        match serde_json::from_str::<Vec<LoadedSong>>(&raw) {
            Ok(entries) => {
                let songs = self.normalize(entries);
                tracing::info!(count = songs.len(), "loaded stored setlist");
                songs
            }
            Err(err) => {
                tracing::warn!(error = %err, "stored setlist is malformed; using defaults");
                default_songs()
            }
        }
    }

    /// Append a new song with a fresh id, trimmed name and clamped tempo.
    pub fn add(&mut self, mut songs: Vec<Song>, name: &str, tempo: i64) -> Vec<Song> {
        let id = self.fresh_id(|candidate| songs.iter().any(|song| song.id == candidate));
        songs.push(Song::new(id, name.trim(), tempo));
        tracing::debug!(id, "added song");
        self.persist(&songs);
        songs
    }

    /// Merge `patch` into the song with `id`. An unknown id leaves the list as
    /// it was, but the list is still written.
    pub fn update(&mut self, mut songs: Vec<Song>, id: i64, patch: &SongPatch) -> Vec<Song> {
        match songs.iter_mut().find(|song| song.id == id) {
            Some(song) => patch.apply_to(song),
            None => tracing::debug!(id, "update for unknown song ignored"),
        }
        self.persist(&songs);
        songs
    }

    /// Drop the song with `id`, if present.
    pub fn remove(&mut self, mut songs: Vec<Song>, id: i64) -> Vec<Song> {
        let before = songs.len();
        songs.retain(|song| song.id != id);
        if songs.len() != before {
            tracing::debug!(id, "removed song");
        }
        self.persist(&songs);
        songs
    }

    /// Move `from_id` to the index `to_id` occupies. The moving song is taken
    /// out first and then inserted at that index, so moving down lands just
    /// after the target and moving up lands just before it. Unknown or equal
    /// ids return the list untouched without writing.
    pub fn reorder(&mut self, mut songs: Vec<Song>, from_id: i64, to_id: i64) -> Vec<Song> {
        if from_id == to_id {
            return songs;
        }
        let from = songs.iter().position(|song| song.id == from_id);
        let to = songs.iter().position(|song| song.id == to_id);
        let (Some(from), Some(to)) = (from, to) else {
            return songs;
        };

        let moved = songs.remove(from);
        songs.insert(to, moved);
        tracing::debug!(from_id, to_id, from, to, "reordered songs");
        self.persist(&songs);
        songs
    }

    /// Overwrite storage with the built-in list and return it.
    pub fn reset_to_default(&mut self) -> Vec<Song> {
        let songs = default_songs();
        tracing::info!("setlist reset to defaults");
        self.persist(&songs);
        songs
    }

    /// Write `id`, `name` and `tempo` of every song, in order. Failures are
    /// logged and otherwise ignored.
    pub fn persist(&mut self, songs: &[Song]) {
        let stored: Vec<StoredSong<'_>> = songs.iter().map(StoredSong::from).collect();
        let json = match serde_json::to_string(&stored) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize setlist");
                return;
            }
        };
        if let Err(err) = self.storage.write(&json) {
            tracing::error!(error = %err, "failed to persist setlist");
        }
    }

    /// Turn loosely-typed stored entries into songs. Zero or missing ids get a
    /// fresh one, as do ids already used earlier in the list.
    fn normalize(&mut self, entries: Vec<LoadedSong>) -> Vec<Song> {
        let mut seen = HashSet::with_capacity(entries.len());
        let explicit: HashSet<i64> = entries.iter().filter_map(|entry| entry.id).collect();
        let mut songs = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = match entry.id {
                Some(id) if id != 0 && !seen.contains(&id) => id,
                _ => self.fresh_id(|candidate| {
                    candidate == 0 || seen.contains(&candidate) || explicit.contains(&candidate)
                }),
            };
            seen.insert(id);

            let tempo = match entry.tempo {
                Some(tempo) if tempo != 0 => clamp_tempo(tempo),
                _ => DEFAULT_TEMPO,
            };

            songs.push(Song {
                id,
                name: entry.name.unwrap_or_default(),
                tempo,
                editing: false,
            });
        }

        songs
    }

    /// Draw ids until one is not `taken`.
    fn fresh_id(&mut self, taken: impl Fn(i64) -> bool) -> i64 {
        loop {
            let candidate = self.ids.next_id();
            if !taken(candidate) {
                return candidate;
            }
        }
    }
}
