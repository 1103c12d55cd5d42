//! Domain models for the setlist. These are plain data holders: the store in
//! `db::songs` owns every mutation, and the controller only reads them back.

use serde::{Deserialize, Deserializer, Serialize};

/// Slowest tempo the metronome accepts, in BPM.
pub const MIN_TEMPO: i64 = 30;
/// Fastest tempo the metronome accepts, in BPM.
pub const MAX_TEMPO: i64 = 240;
/// Tempo used when a stored song has none and when a session starts.
pub const DEFAULT_TEMPO: i64 = 90;

/// Restrict a tempo to the supported `[MIN_TEMPO, MAX_TEMPO]` range.
pub fn clamp_tempo(tempo: i64) -> i64 {
    tempo.clamp(MIN_TEMPO, MAX_TEMPO)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One setlist entry.
pub struct Song {
    /// Unique within a list and never changed after creation.
    pub id: i64,
    /// Display name shown in the setlist and the selected-song banner.
    pub name: String,
    /// Tempo in BPM, always within `[MIN_TEMPO, MAX_TEMPO]`.
    pub tempo: i64,
    /// Inline edit flag. Session-only: it is never written to storage and is
    /// reset to `false` whenever the list is loaded.
    pub editing: bool,
}

impl Song {
    /// Build a song that is not being edited, clamping the tempo on the way in.
    pub fn new(id: i64, name: impl Into<String>, tempo: i64) -> Self {
        Self {
            id,
            name: name.into(),
            tempo: clamp_tempo(tempo),
            editing: false,
        }
    }

    /// `Name (120 BPM)` label used by confirmation dialogs and status lines.
    pub fn display_label(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Untitled ({} BPM)", self.tempo)
        } else {
            format!("{} ({} BPM)", self.name, self.tempo)
        }
    }
}

/// Partial update applied by `SongStore::update`. Only the mutable fields of a
/// song appear here; `id` can never be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongPatch {
    pub name: Option<String>,
    pub tempo: Option<i64>,
    pub editing: Option<bool>,
}

impl SongPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn tempo(tempo: i64) -> Self {
        Self {
            tempo: Some(tempo),
            ..Self::default()
        }
    }

    pub fn editing(editing: bool) -> Self {
        Self {
            editing: Some(editing),
            ..Self::default()
        }
    }

    /// Merge the patch into `song`. Tempo is clamped so a patched song still
    /// satisfies the range invariant.
    pub(crate) fn apply_to(&self, song: &mut Song) {
        if let Some(name) = &self.name {
            song.name = name.clone();
        }
        if let Some(tempo) = self.tempo {
            song.tempo = clamp_tempo(tempo);
        }
        if let Some(editing) = self.editing {
            song.editing = editing;
        }
    }
}

/// Persisted shape of a song: exactly `id`, `name` and `tempo`, in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StoredSong<'a> {
    pub(crate) id: i64,
    pub(crate) name: &'a str,
    pub(crate) tempo: i64,
}

impl<'a> From<&'a Song> for StoredSong<'a> {
    fn from(song: &'a Song) -> Self {
        Self {
            id: song.id,
            name: &song.name,
            tempo: song.tempo,
        }
    }
}

/// Lenient shape read back from storage. Every field may be missing; extra
/// fields such as a stray `editing` are ignored. Numbers may carry a
/// fraction or an exponent (`120.5`, `1.2e2`) and are rounded.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LoadedSong {
    #[serde(default, deserialize_with = "rounded_number")]
    pub(crate) id: Option<i64>,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default, deserialize_with = "rounded_number")]
    pub(crate) tempo: Option<i64>,
}

fn rounded_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(value.and_then(|number| {
        number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_tempo_in_range() {
        assert_eq!(clamp_tempo(10), 30);
        assert_eq!(clamp_tempo(300), 240);
        assert_eq!(clamp_tempo(90), 90);
        assert_eq!(clamp_tempo(MIN_TEMPO), MIN_TEMPO);
        assert_eq!(clamp_tempo(MAX_TEMPO), MAX_TEMPO);
        assert_eq!(clamp_tempo(i64::MIN), MIN_TEMPO);
    }

    #[test]
    fn new_song_clamps_and_is_not_editing() {
        let song = Song::new(7, "Shout", 999);
        assert_eq!(song.tempo, 240);
        assert!(!song.editing);
    }

    #[test]
    fn patch_merges_only_supplied_fields() {
        let mut song = Song::new(1, "Shout", 94);
        SongPatch::editing(true).apply_to(&mut song);
        assert_eq!(song, Song { editing: true, ..Song::new(1, "Shout", 94) });

        SongPatch::tempo(12).apply_to(&mut song);
        assert_eq!(song.tempo, 30);
        assert_eq!(song.name, "Shout");
    }

    #[test]
    fn stored_song_omits_editing() {
        let mut song = Song::new(3, "Beat it", 139);
        song.editing = true;
        let json = serde_json::to_string(&StoredSong::from(&song)).unwrap();
        assert_eq!(json, r#"{"id":3,"name":"Beat it","tempo":139}"#);
    }

    #[test]
    fn loaded_song_rounds_fractional_numbers() {
        let entry: LoadedSong =
            serde_json::from_str(r#"{"id":1.7e12,"name":"Waltz","tempo":120.5}"#).unwrap();
        assert_eq!(entry.id, Some(1_700_000_000_000));
        assert_eq!(entry.tempo, Some(121));

        let entry: LoadedSong = serde_json::from_str(r#"{"tempo":null}"#).unwrap();
        assert_eq!(entry.tempo, None);
    }

    #[test]
    fn display_label_names_untitled_songs() {
        assert_eq!(Song::new(1, "  ", 100).display_label(), "Untitled (100 BPM)");
        assert_eq!(Song::new(1, "Call me", 139).display_label(), "Call me (139 BPM)");
    }
}
