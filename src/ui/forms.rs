use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::controller::Draft;
use crate::models::{Song, MAX_TEMPO};

/// Longest tempo text accepted by the numeric fields.
const TEMPO_DIGITS: usize = MAX_TEMPO.ilog10() as usize + 1;

/// Fields of the add-song and edit-song forms.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum SongField {
    #[default]
    Name,
    Tempo,
}

impl SongField {
    pub(crate) fn toggle(self) -> Self {
        match self {
            SongField::Name => SongField::Tempo,
            SongField::Tempo => SongField::Name,
        }
    }
}

/// Append `ch` to a tempo buffer if it is a digit and the buffer has room.
fn push_tempo_digit(buffer: &mut String, ch: char) -> bool {
    if ch.is_ascii_digit() && buffer.chars().count() < TEMPO_DIGITS {
        buffer.push(ch);
        true
    } else {
        false
    }
}

/// Append `ch` to a name buffer unless it is a control character.
fn push_name_char(buffer: &mut String, ch: char) -> bool {
    if ch.is_control() {
        false
    } else {
        buffer.push(ch);
        true
    }
}

/// Focus state of the add-song form. The typed text itself lives in the
/// controller's [`Draft`] so a cancelled form keeps nothing behind.
#[derive(Clone, Debug, Default)]
pub(crate) struct DraftForm {
    pub(crate) active: SongField,
}

impl DraftForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = self.active.toggle();
    }

    /// Insert a character into the active draft field.
    pub(crate) fn push_char(&self, draft: &mut Draft, ch: char) -> bool {
        match self.active {
            SongField::Name => push_name_char(&mut draft.name, ch),
            SongField::Tempo => push_tempo_digit(&mut draft.tempo, ch),
        }
    }

    pub(crate) fn backspace(&self, draft: &mut Draft) {
        match self.active {
            SongField::Name => {
                draft.name.pop();
            }
            SongField::Tempo => {
                draft.tempo.pop();
            }
        }
    }
}

/// Inline editor for an existing song. Each keystroke is written through to
/// the store; the buffers here only keep what the user typed.
#[derive(Clone, Debug)]
pub(crate) struct SongForm {
    pub(crate) name: String,
    pub(crate) tempo: String,
    pub(crate) active: SongField,
}

impl SongForm {
    pub(crate) fn from_song(song: &Song) -> Self {
        Self {
            name: song.name.clone(),
            tempo: song.tempo.to_string(),
            active: SongField::Name,
        }
    }

    pub(crate) fn toggle_field(&mut self) {
        self.active = self.active.toggle();
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            SongField::Name => push_name_char(&mut self.name, ch),
            SongField::Tempo => push_tempo_digit(&mut self.tempo, ch),
        }
    }

    /// Remove the last character of the active field. Returns whether
    /// anything changed.
    pub(crate) fn backspace(&mut self) -> bool {
        match self.active {
            SongField::Name => self.name.pop().is_some(),
            SongField::Tempo => self.tempo.pop().is_some(),
        }
    }

    /// Typed tempo, when the buffer holds a number.
    pub(crate) fn tempo_value(&self) -> Option<i64> {
        self.tempo.parse().ok()
    }
}

/// Free-form tempo entry opened with `t`.
#[derive(Clone, Debug, Default)]
pub(crate) struct TempoPrompt {
    pub(crate) value: String,
}

impl TempoPrompt {
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        push_tempo_digit(&mut self.value, ch)
    }

    pub(crate) fn backspace(&mut self) {
        self.value.pop();
    }

    pub(crate) fn parse(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }
}

/// State for confirming permanent song deletion.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmSongDelete {
    pub(crate) song: Song,
}

/// Render one `Label: value` form line, highlighting the focused field.
pub(crate) fn field_line(
    label: &str,
    value: &str,
    placeholder: &str,
    is_active: bool,
) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(display, style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_fields_accept_three_digits_only() {
        let mut prompt = TempoPrompt::default();
        assert!(prompt.push_char('1'));
        assert!(!prompt.push_char('x'));
        assert!(prompt.push_char('2'));
        assert!(prompt.push_char('0'));
        assert!(!prompt.push_char('0'));
        assert_eq!(prompt.parse(), Some(120));
    }

    #[test]
    fn draft_form_edits_active_field() {
        let mut draft = Draft::default();
        let mut form = DraftForm::default();

        for ch in "My Way".chars() {
            form.push_char(&mut draft, ch);
        }
        form.toggle_field();
        form.push_char(&mut draft, '9');
        form.push_char(&mut draft, 'b');
        form.push_char(&mut draft, '0');

        assert_eq!(draft.name, "My Way");
        assert_eq!(draft.tempo, "90");

        form.backspace(&mut draft);
        assert_eq!(draft.tempo, "9");
    }

    #[test]
    fn song_form_starts_from_song() {
        let song = Song::new(4, "Shout", 94);
        let mut form = SongForm::from_song(&song);
        assert_eq!(form.tempo_value(), Some(94));

        form.toggle_field();
        assert!(form.backspace());
        assert!(form.backspace());
        assert_eq!(form.tempo_value(), None);
        assert!(!form.backspace());
        assert!(!form.push_char('\n'));
    }
}
