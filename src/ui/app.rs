use std::mem;
use std::time::Instant;

use anyhow::Error;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::controller::{Controller, SongEdit, Snapshot, FINE_STEP};
use crate::db::{IdSource, Storage};
use crate::models::{Song, MAX_TEMPO, MIN_TEMPO};

use super::forms::{
    field_line, ConfirmSongDelete, DraftForm, SongField, SongForm, TempoPrompt,
};
use super::helpers::{
    beat_lamps, centered_rect, input_cursor, key_hints, surface_error, tempo_ratio, TIPS,
};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Width of the transport panel on the left.
const CONTROLS_WIDTH: u16 = 38;

/// Fine-grained input modes. Exactly one is active at a time.
enum Mode {
    Normal,
    AddingSong(DraftForm),
    EditingSong { id: i64, form: SongForm },
    SettingTempo(TempoPrompt),
    /// A song picked up for reordering; the cursor chooses where it lands.
    Moving { from_id: i64 },
    ConfirmSongDelete(ConfirmSongDelete),
    ConfirmReset,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Terminal front-end over a [`Controller`].
pub struct App<S, I> {
    controller: Controller<S, I>,
    /// Highlighted setlist row. Distinct from the selected song: moving the
    /// cursor does not load a tempo until Enter.
    cursor: usize,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<S: Storage, I: IdSource> App<S, I> {
    pub fn new(controller: Controller<S, I>) -> Self {
        let cursor = controller.selected_index().unwrap_or(0);
        Self {
            controller,
            cursor,
            mode: Mode::Normal,
            status: None,
        }
    }

    pub fn controller(&self) -> &Controller<S, I> {
        &self.controller
    }

    /// Show a startup problem in the footer as `summary: root cause`.
    pub fn report_error(&mut self, summary: &str, err: &Error) {
        self.set_status(format!("{summary}: {}", surface_error(err)), StatusKind::Error);
    }

    /// Advance the beat clock. Returns whether the beat changed.
    pub(crate) fn tick(&mut self, now: Instant) -> bool {
        self.controller.tick(now)
    }

    /// Route a key press to the active mode. Returns `true` when the user asked
    /// to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.controller.show_help() {
            if matches!(
                code,
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('h')
            ) {
                self.controller.toggle_help();
            }
            return false;
        }

        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::AddingSong(form) => self.handle_add_song(code, form),
            Mode::EditingSong { id, form } => self.handle_edit_song(code, id, form),
            Mode::SettingTempo(prompt) => self.handle_tempo_prompt(code, prompt),
            Mode::Moving { from_id } => self.handle_moving(code, from_id),
            Mode::ConfirmSongDelete(confirm) => self.handle_confirm_delete(code, confirm),
            Mode::ConfirmReset => self.handle_confirm_reset(code),
        };

        exit
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Char(' ') => self.controller.toggle_running(),
            KeyCode::Char('s') => self.controller.start(),
            KeyCode::Char('x') => self.controller.stop(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.controller.increment_tempo(FINE_STEP),
            KeyCode::Char('-') => self.controller.decrement_tempo(FINE_STEP),
            KeyCode::Char(']') => {
                let step = self.controller.coarse_step();
                self.controller.increment_tempo(step);
            }
            KeyCode::Char('[') => {
                let step = self.controller.coarse_step();
                self.controller.decrement_tempo(step);
            }
            KeyCode::Char('t') => {
                self.clear_status();
                return Mode::SettingTempo(TempoPrompt::default());
            }
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-5),
            KeyCode::PageDown => self.move_cursor(5),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.controller.songs().len().saturating_sub(1),
            KeyCode::Enter => {
                if let Some(song) = self.cursor_song().cloned() {
                    self.controller.select_song(song.id);
                    self.set_status(format!("Loaded {}.", song.display_label()), StatusKind::Info);
                }
            }
            KeyCode::Left => {
                self.controller.previous_song();
                self.sync_cursor_to_selection();
            }
            KeyCode::Right => {
                self.controller.next_song();
                self.sync_cursor_to_selection();
            }
            KeyCode::Char('a') => {
                self.clear_status();
                self.controller.reset_draft();
                return Mode::AddingSong(DraftForm::default());
            }
            KeyCode::Char('e') => {
                if let Some(song) = self.cursor_song().cloned() {
                    self.clear_status();
                    self.controller.toggle_song_editing(song.id);
                    return Mode::EditingSong {
                        id: song.id,
                        form: SongForm::from_song(&song),
                    };
                }
                self.set_status("No song selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(song) = self.cursor_song().cloned() {
                    self.clear_status();
                    return Mode::ConfirmSongDelete(ConfirmSongDelete { song });
                }
                self.set_status("No song selected to delete.", StatusKind::Error);
            }
            KeyCode::Char('m') => {
                if let Some(song) = self.cursor_song() {
                    let from_id = song.id;
                    let message = format!("Moving {}. Pick a spot and press Enter.", song.name);
                    self.set_status(message, StatusKind::Info);
                    return Mode::Moving { from_id };
                }
                self.set_status("No song selected to move.", StatusKind::Error);
            }
            KeyCode::Char('r') => {
                self.clear_status();
                return Mode::ConfirmReset;
            }
            KeyCode::Char('?') | KeyCode::Char('h') => self.controller.toggle_help(),
            _ => {}
        }
        Mode::Normal
    }

    fn handle_add_song(&mut self, code: KeyCode, mut form: DraftForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.controller.reset_draft();
                self.set_status("Add cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => form.toggle_field(),
            KeyCode::Backspace => form.backspace(self.controller.draft_mut()),
            KeyCode::Enter => match self.controller.submit_draft() {
                Some(id) => {
                    self.focus_song(id);
                    if let Some(song) = self.cursor_song() {
                        let message = format!("Added {}.", song.display_label());
                        self.set_status(message, StatusKind::Info);
                    }
                    return Mode::Normal;
                }
                None => self.set_status("Song name is required.", StatusKind::Error),
            },
            KeyCode::Char(ch) => {
                form.push_char(self.controller.draft_mut(), ch);
            }
            _ => {}
        }
        Mode::AddingSong(form)
    }

    fn handle_edit_song(&mut self, code: KeyCode, id: i64, mut form: SongForm) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Enter => {
                self.controller.toggle_song_editing(id);
                self.focus_song(id);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => form.toggle_field(),
            KeyCode::Backspace => {
                if form.backspace() {
                    self.write_song_field(id, &form);
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    self.write_song_field(id, &form);
                }
            }
            _ => {}
        }
        Mode::EditingSong { id, form }
    }

    fn handle_tempo_prompt(&mut self, code: KeyCode, mut prompt: TempoPrompt) -> Mode {
        match code {
            KeyCode::Esc => return Mode::Normal,
            KeyCode::Enter => {
                match prompt.parse() {
                    Some(tempo) => self.controller.set_tempo(tempo),
                    None => self.set_status("Tempo must be a number.", StatusKind::Error),
                }
                return Mode::Normal;
            }
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Char(ch) => {
                prompt.push_char(ch);
            }
            _ => {}
        }
        Mode::SettingTempo(prompt)
    }

    fn handle_moving(&mut self, code: KeyCode, from_id: i64) -> Mode {
        match code {
            KeyCode::Esc => {
                self.focus_song(from_id);
                self.set_status("Move cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.controller.songs().len().saturating_sub(1),
            KeyCode::Enter | KeyCode::Char('m') => {
                if let Some(to_id) = self.cursor_song().map(|song| song.id) {
                    self.controller.reorder_songs(from_id, to_id);
                }
                self.focus_song(from_id);
                self.clear_status();
                return Mode::Normal;
            }
            _ => {}
        }
        Mode::Moving { from_id }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmSongDelete) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.controller.delete_song(confirm.song.id);
                self.clamp_cursor();
                self.set_status(
                    format!("Deleted {}.", confirm.song.display_label()),
                    StatusKind::Info,
                );
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Mode::Normal,
            _ => Mode::ConfirmSongDelete(confirm),
        }
    }

    fn handle_confirm_reset(&mut self, code: KeyCode) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.controller.reset_to_default();
                self.sync_cursor_to_selection();
                self.set_status("Setlist reset to defaults.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Mode::Normal,
            _ => Mode::ConfirmReset,
        }
    }

    fn write_song_field(&mut self, id: i64, form: &SongForm) {
        match form.active {
            SongField::Name => self.controller.edit_song(id, SongEdit::Name(form.name.clone())),
            SongField::Tempo => {
                if let Some(tempo) = form.tempo_value() {
                    self.controller.edit_song(id, SongEdit::Tempo(tempo));
                }
            }
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(CONTROLS_WIDTH), Constraint::Min(0)])
            .split(content_area);

        let snapshot = self.controller.snapshot();
        self.draw_controls(frame, columns[0], &snapshot);
        self.draw_setlist(frame, columns[1], &snapshot);

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingSong(form) => self.draw_add_form(frame, area, form, &snapshot),
            Mode::SettingTempo(prompt) => self.draw_tempo_prompt(frame, area, prompt),
            Mode::ConfirmSongDelete(confirm) => self.draw_confirm(
                frame,
                area,
                "Delete Song",
                format!("Delete {}?", confirm.song.display_label()),
            ),
            Mode::ConfirmReset => self.draw_confirm(
                frame,
                area,
                "Reset Setlist",
                "Replace the setlist with the built-in default?".to_string(),
            ),
            Mode::Normal | Mode::EditingSong { .. } | Mode::Moving { .. } => {}
        }

        if snapshot.show_help {
            self.draw_help(frame, area);
        }
    }

    fn draw_controls(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
        let block = Block::default().borders(Borders::ALL).title("Metronome");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(inner);

        let selected_name = self
            .controller
            .selected_song()
            .map(|song| song.name.clone())
            .unwrap_or_else(|| "No song selected".to_string());
        let arrow_style = |enabled: bool| {
            if enabled {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        };
        let banner = Line::from(vec![
            Span::styled("< ", arrow_style(self.controller.has_previous())),
            Span::styled(selected_name, Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(" >", arrow_style(self.controller.has_next())),
        ]);
        frame.render_widget(
            Paragraph::new(banner).alignment(Alignment::Center),
            rows[0],
        );

        let tempo = Line::from(vec![
            Span::styled(
                snapshot.tempo.to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" BPM"),
        ]);
        frame.render_widget(Paragraph::new(tempo).alignment(Alignment::Center), rows[1]);

        let transport = if snapshot.running {
            Span::styled("RUNNING", Style::default().fg(Color::Green))
        } else {
            Span::styled("STOPPED", Style::default().fg(Color::Red))
        };
        frame.render_widget(
            Paragraph::new(Line::from(transport)).alignment(Alignment::Center),
            rows[2],
        );

        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(tempo_ratio(snapshot.tempo))
            .label(format!("{MIN_TEMPO} .. {MAX_TEMPO}"));
        frame.render_widget(gauge, rows[3]);

        frame.render_widget(
            Paragraph::new(beat_lamps(snapshot.running, snapshot.current_beat))
                .alignment(Alignment::Center),
            rows[5],
        );
    }

    fn draw_setlist(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Songs ({})", snapshot.songs.len()));

        if snapshot.songs.is_empty() {
            let message = Paragraph::new("No songs yet. Press 'a' to add one or 'r' to reset.")
                .alignment(Alignment::Center)
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(message, area);
            return;
        }

        let moving = match self.mode {
            Mode::Moving { from_id } => Some(from_id),
            _ => None,
        };
        let editing_form = match &self.mode {
            Mode::EditingSong { id, form } => Some((*id, form)),
            _ => None,
        };

        let items: Vec<ListItem> = snapshot
            .songs
            .iter()
            .map(|song| {
                let is_selected = snapshot.selected_song_id == Some(song.id);
                match editing_form {
                    Some((id, form)) if id == song.id && song.editing => {
                        self.song_edit_item(form)
                    }
                    _ => self.song_item(song, is_selected, moving == Some(song.id)),
                }
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(Some(self.cursor.min(snapshot.songs.len() - 1)));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn song_item(&self, song: &Song, is_selected: bool, is_moving: bool) -> ListItem<'static> {
        let marker = if is_moving {
            Span::styled("~ ", Style::default().fg(Color::Magenta))
        } else if is_selected {
            Span::styled("* ", Style::default().fg(Color::Yellow))
        } else {
            Span::raw("  ")
        };
        let name_style = if is_selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        ListItem::new(Line::from(vec![
            marker,
            Span::styled(song.name.clone(), name_style),
            Span::styled(
                format!("  {} BPM", song.tempo),
                Style::default().fg(Color::Gray),
            ),
        ]))
    }

    fn song_edit_item(&self, form: &SongForm) -> ListItem<'static> {
        ListItem::new(vec![
            field_line(
                "  Name",
                &form.name,
                "<empty>",
                form.active == SongField::Name,
            ),
            field_line(
                "  Tempo",
                &form.tempo,
                "<unchanged>",
                form.active == SongField::Tempo,
            ),
        ])
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        if self.controller.show_help() {
            return key_hints(&[("Esc", "Close help")]);
        }
        match &self.mode {
            Mode::Normal => key_hints(&[
                ("Space", "Start/Stop"),
                ("+/-", "Tempo"),
                ("[/]", "Coarse"),
                ("Enter", "Load"),
                ("\u{2190}\u{2192}", "Prev/Next"),
                ("a", "Add"),
                ("e", "Edit"),
                ("d", "Delete"),
                ("m", "Move"),
                ("?", "Help"),
                ("q", "Quit"),
            ]),
            Mode::AddingSong(_) | Mode::EditingSong { .. } => key_hints(&[
                ("Tab", "Switch Field"),
                ("Enter", "Save"),
                ("Esc", "Cancel"),
            ]),
            Mode::SettingTempo(_) => key_hints(&[("Enter", "Apply"), ("Esc", "Cancel")]),
            Mode::Moving { .. } => key_hints(&[
                ("\u{2191}\u{2193}", "Choose Spot"),
                ("Enter", "Drop"),
                ("Esc", "Cancel"),
            ]),
            Mode::ConfirmSongDelete(_) | Mode::ConfirmReset => {
                key_hints(&[("y", "Confirm"), ("n", "Cancel")])
            }
        }
    }

    fn draw_add_form(
        &self,
        frame: &mut Frame,
        area: Rect,
        form: &DraftForm,
        snapshot: &Snapshot<'_>,
    ) {
        let popup = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup);

        let block = Block::default().borders(Borders::ALL).title("Add Song");
        let lines = vec![
            field_line(
                "Song name",
                &snapshot.draft.name,
                "e.g., My Way",
                form.active == SongField::Name,
            ),
            field_line(
                "Tempo",
                &snapshot.draft.tempo,
                &format!("{} (current)", snapshot.tempo),
                form.active == SongField::Tempo,
            ),
        ];
        frame.render_widget(
            Paragraph::new(lines).block(block.clone()).wrap(Wrap { trim: true }),
            popup,
        );

        let inner = block.inner(popup);
        let (label, value, row) = match form.active {
            SongField::Name => ("Song name: ", &snapshot.draft.name, 0),
            SongField::Tempo => ("Tempo: ", &snapshot.draft.tempo, 1),
        };
        frame.set_cursor_position(input_cursor(inner, label, value, row));
    }

    fn draw_tempo_prompt(&self, frame: &mut Frame, area: Rect, prompt: &TempoPrompt) {
        let popup = centered_rect(40, 20, area);
        frame.render_widget(Clear, popup);

        let block = Block::default().borders(Borders::ALL).title("Set Tempo");
        let line = field_line(
            "BPM",
            &prompt.value,
            &format!("{MIN_TEMPO}-{MAX_TEMPO}"),
            true,
        );
        frame.render_widget(Paragraph::new(line).block(block.clone()), popup);

        let inner = block.inner(popup);
        frame.set_cursor_position(input_cursor(inner, "BPM: ", &prompt.value, 0));
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, title: &str, question: String) {
        let popup = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup);

        let lines = vec![
            Line::from(question),
            Line::from(""),
            Line::from(vec![
                Span::styled("[y]", Style::default().fg(Color::Cyan)),
                Span::raw(" Yes   "),
                Span::styled("[n]", Style::default().fg(Color::Cyan)),
                Span::raw(" No"),
            ]),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup);

        let bullet = Style::default().fg(Color::LightRed);
        let lines: Vec<Line> = TIPS
            .iter()
            .map(|tip| Line::from(vec![Span::styled("\u{2022} ", bullet), Span::raw(*tip)]))
            .collect();
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Quick Tips"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup);
    }

    fn set_status<T: Into<String>>(&mut self, text: T, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn cursor_song(&self) -> Option<&Song> {
        self.controller.songs().get(self.cursor)
    }

    fn move_cursor(&mut self, offset: isize) {
        let len = self.controller.songs().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = (self.cursor as isize + offset).clamp(0, len as isize - 1);
        self.cursor = next as usize;
    }

    fn clamp_cursor(&mut self) {
        let len = self.controller.songs().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    fn focus_song(&mut self, id: i64) {
        if let Some(idx) = self.controller.songs().iter().position(|song| song.id == id) {
            self.cursor = idx;
        } else {
            self.clamp_cursor();
        }
    }

    fn sync_cursor_to_selection(&mut self) {
        match self.controller.selected_index() {
            Some(idx) => self.cursor = idx,
            None => self.clamp_cursor(),
        }
    }
}
