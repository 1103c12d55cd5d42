//! Session orchestration between the song store and whatever renders it.
//!
//! The [`Controller`] keeps the state that only lives for one session (live
//! tempo, running flag, beat phase, selection, add-song draft, help overlay)
//! and turns user intents into store operations. After every mutation it
//! re-resolves the selection against the new list. Rendering code only reads
//! a [`Snapshot`].

mod clock;

use std::mem;
use std::time::{Duration, Instant};

pub use clock::{beat_interval, BeatClock, ClockState};

use crate::db::{IdSource, SongStore, Storage};
use crate::models::{clamp_tempo, Song, SongPatch, DEFAULT_TEMPO};

/// Fine tempo step used by the `+`/`-` intents.
pub const FINE_STEP: i64 = 1;
/// Coarse step used when nothing else is configured.
pub const DEFAULT_COARSE_STEP: i64 = 5;

/// Text typed into the add-song form. Tempo stays raw text until submit so a
/// half-typed number is never clamped mid-entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub tempo: String,
}

/// A single field edit on an existing song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongEdit {
    Name(String),
    Tempo(i64),
}

/// Read-only view of everything the rendering layer shows.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub tempo: i64,
    pub running: bool,
    pub current_beat: u8,
    pub songs: &'a [Song],
    pub selected_song_id: Option<i64>,
    pub draft: &'a Draft,
    pub show_help: bool,
}

/// Session state plus the store it drives.
pub struct Controller<S, I> {
    store: SongStore<S, I>,
    songs: Vec<Song>,
    tempo: i64,
    clock: BeatClock,
    selected: Option<i64>,
    draft: Draft,
    show_help: bool,
    coarse_step: i64,
}

impl<S: Storage, I: IdSource> Controller<S, I> {
    /// Load the setlist and auto-select its first song.
    pub fn new(mut store: SongStore<S, I>, coarse_step: i64) -> Self {
        let songs = store.load();
        let mut controller = Self {
            store,
            songs,
            tempo: DEFAULT_TEMPO,
            clock: BeatClock::new(DEFAULT_TEMPO),
            selected: None,
            draft: Draft {
                name: String::new(),
                tempo: DEFAULT_TEMPO.to_string(),
            },
            show_help: false,
            coarse_step: coarse_step.max(1),
        };
        controller.resolve_selection();
        controller
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tempo: self.tempo,
            running: self.clock.is_running(),
            current_beat: self.clock.beat(),
            songs: &self.songs,
            selected_song_id: self.selected,
            draft: &self.draft,
            show_help: self.show_help,
        }
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn tempo(&self) -> i64 {
        self.tempo
    }

    pub fn coarse_step(&self) -> i64 {
        self.coarse_step
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn current_beat(&self) -> u8 {
        self.clock.beat()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    // Transport

    pub fn start(&mut self) {
        self.clock.start(Instant::now());
        tracing::debug!(tempo = self.tempo, "metronome started");
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        tracing::debug!("metronome stopped");
    }

    pub fn toggle_running(&mut self) {
        if self.clock.is_running() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Advance the beat clock to `now`; returns whether the beat flipped.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.clock.tick(now)
    }

    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.clock.time_until_next_tick(now)
    }

    pub fn beat_interval(&self) -> Duration {
        self.clock.interval()
    }

    // Tempo

    pub fn set_tempo(&mut self, tempo: i64) {
        let tempo = clamp_tempo(tempo);
        if tempo == self.tempo {
            return;
        }
        self.tempo = tempo;
        self.clock.set_tempo(tempo, Instant::now());
    }

    pub fn increment_tempo(&mut self, step: i64) {
        self.set_tempo(self.tempo.saturating_add(step));
    }

    pub fn decrement_tempo(&mut self, step: i64) {
        self.set_tempo(self.tempo.saturating_sub(step));
    }

    // Selection

    pub fn selected_song_id(&self) -> Option<i64> {
        self.selected
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected?;
        self.songs.iter().position(|song| song.id == id)
    }

    pub fn selected_song(&self) -> Option<&Song> {
        self.selected_index().map(|idx| &self.songs[idx])
    }

    /// Select the song with `id` and adopt its tempo. Returns `false` when no
    /// such song exists.
    pub fn select_song(&mut self, id: i64) -> bool {
        let Some(tempo) = self.songs.iter().find(|song| song.id == id).map(|s| s.tempo) else {
            return false;
        };
        self.selected = Some(id);
        self.set_tempo(tempo);
        true
    }

    pub fn has_previous(&self) -> bool {
        matches!(self.selected_index(), Some(idx) if idx > 0)
    }

    pub fn has_next(&self) -> bool {
        matches!(self.selected_index(), Some(idx) if idx + 1 < self.songs.len())
    }

    pub fn previous_song(&mut self) {
        if let Some(idx) = self.selected_index().filter(|idx| *idx > 0) {
            let id = self.songs[idx - 1].id;
            self.select_song(id);
        }
    }

    pub fn next_song(&mut self) {
        if let Some(idx) = self.selected_index().filter(|idx| idx + 1 < self.songs.len()) {
            let id = self.songs[idx + 1].id;
            self.select_song(id);
        }
    }

    // Song list intents

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    /// Empty the name and seed the tempo with the live tempo.
    pub fn reset_draft(&mut self) {
        self.draft.name.clear();
        self.draft.tempo = self.tempo.to_string();
    }

    /// Add the drafted song. A blank name does nothing. A tempo that is not a
    /// number, or is zero, falls back to the live tempo. Returns the new id.
    pub fn submit_draft(&mut self) -> Option<i64> {
        let name = self.draft.name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        let tempo = self
            .draft
            .tempo
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|tempo| *tempo != 0)
            .unwrap_or(self.tempo);

        let songs = mem::take(&mut self.songs);
        self.songs = self.store.add(songs, &name, clamp_tempo(tempo));
        let id = self.songs.last().map(|song| song.id);
        self.reset_draft();
        self.resolve_selection();
        id
    }

    /// Flip the inline-edit flag of one song.
    pub fn toggle_song_editing(&mut self, id: i64) {
        let Some(editing) = self.songs.iter().find(|song| song.id == id).map(|s| s.editing) else {
            return;
        };
        self.update_song(id, SongPatch::editing(!editing));
    }

    /// Write one field of an existing song straight through to the store.
    pub fn edit_song(&mut self, id: i64, edit: SongEdit) {
        let patch = match edit {
            SongEdit::Name(name) => SongPatch::name(name),
            SongEdit::Tempo(tempo) => SongPatch::tempo(tempo),
        };
        self.update_song(id, patch);
    }

    pub fn delete_song(&mut self, id: i64) {
        let songs = mem::take(&mut self.songs);
        self.songs = self.store.remove(songs, id);
        self.resolve_selection();
    }

    pub fn reorder_songs(&mut self, from_id: i64, to_id: i64) {
        let songs = mem::take(&mut self.songs);
        self.songs = self.store.reorder(songs, from_id, to_id);
        self.resolve_selection();
    }

    pub fn reset_to_default(&mut self) {
        self.songs = self.store.reset_to_default();
        self.resolve_selection();
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    fn update_song(&mut self, id: i64, patch: SongPatch) {
        let songs = mem::take(&mut self.songs);
        self.songs = self.store.update(songs, id, &patch);
    }

    /// Keep the selection if its song survived; otherwise fall back to the
    /// first song, or to nothing for an empty list.
    fn resolve_selection(&mut self) {
        if self.selected_index().is_some() {
            return;
        }
        match self.songs.first().map(|song| song.id) {
            Some(id) => {
                self.select_song(id);
            }
            None => self.selected = None,
        }
    }
}
