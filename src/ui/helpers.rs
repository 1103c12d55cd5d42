use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::{MAX_TEMPO, MIN_TEMPO};

/// Help overlay content, one tip per line.
pub(crate) const TIPS: &[&str] = &[
    "Space toggles the metronome; s starts and x stops it.",
    "+/- nudge the tempo by 1 BPM, [ and ] by the coarse step (30-240 BPM).",
    "t types an exact tempo.",
    "Up/Down move through the setlist; Enter loads the song and its tempo.",
    "Left/Right jump to the previous or next song.",
    "a adds a song, e edits one in place, d deletes it.",
    "m picks a song up; move to another song and press Enter to drop it there.",
    "r resets the setlist to the built-in default.",
];

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Position of `tempo` within the supported range, from 0.0 to 1.0.
pub(crate) fn tempo_ratio(tempo: i64) -> f64 {
    let span = (MAX_TEMPO - MIN_TEMPO) as f64;
    ((tempo - MIN_TEMPO) as f64 / span).clamp(0.0, 1.0)
}

/// The two beat lamps. A lamp is lit only while running and on its beat.
pub(crate) fn beat_lamps(running: bool, current_beat: u8) -> Line<'static> {
    let mut spans = Vec::with_capacity(4);
    for beat in 1..=2u8 {
        let lit = running && current_beat == beat;
        let style = if lit {
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightRed)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("  {beat}  "), style));
        if beat == 1 {
            spans.push(Span::raw("   "));
        }
    }
    Line::from(spans)
}

/// `[key] label` pairs rendered in the footer.
/// Terminal cursor position after `prefix` and `value` on `row` of `inner`,
/// kept inside `inner` however long the value grows.
pub(crate) fn input_cursor(inner: Rect, prefix: &str, value: &str, row: u16) -> (u16, u16) {
    let typed = u16::try_from(prefix.chars().count() + value.chars().count()).unwrap_or(u16::MAX);
    let x = inner
        .x
        .saturating_add(typed)
        .min(inner.right().saturating_sub(1))
        .max(inner.x);
    let y = inner
        .y
        .saturating_add(row)
        .min(inner.bottom().saturating_sub(1))
        .max(inner.y);
    (x, y)
}

pub(crate) fn key_hints(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, label) in hints {
        spans.push(Span::styled(format!("[{key}]"), key_style));
        spans.push(Span::raw(format!(" {label}   ")));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_cursor_follows_typed_text() {
        let inner = Rect::new(10, 5, 40, 3);
        assert_eq!(input_cursor(inner, "BPM: ", "12", 0), (17, 5));
        assert_eq!(input_cursor(inner, "Tempo: ", "", 1), (17, 6));
    }

    #[test]
    fn input_cursor_stays_inside_for_long_values() {
        let inner = Rect::new(10, 5, 40, 3);
        let pasted = "x".repeat(70_000);
        assert_eq!(input_cursor(inner, "Song name: ", &pasted, 0), (49, 5));
        assert_eq!(input_cursor(inner, "", "", 9), (10, 7));
    }
    use anyhow::Context;

    #[test]
    fn tempo_ratio_spans_the_range() {
        assert_eq!(tempo_ratio(MIN_TEMPO), 0.0);
        assert_eq!(tempo_ratio(MAX_TEMPO), 1.0);
        assert_eq!(tempo_ratio(135), 0.5);
        assert_eq!(tempo_ratio(1000), 1.0);
    }

    #[test]
    fn lamps_are_dark_when_stopped() {
        let line = beat_lamps(false, 2);
        assert!(line
            .spans
            .iter()
            .all(|span| span.style.bg != Some(Color::LightRed)));

        let line = beat_lamps(true, 2);
        assert_eq!(line.spans[2].style.bg, Some(Color::LightRed));
        assert_eq!(line.spans[0].style.bg, None);
    }

    #[test]
    fn surface_error_prefers_root_cause() {
        let err = Err::<(), _>(std::io::Error::other("disk full"))
            .context("failed to open SQLite database")
            .unwrap_err();
        assert_eq!(surface_error(&err), "disk full");
    }
}
