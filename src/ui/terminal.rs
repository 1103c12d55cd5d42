use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::db::{IdSource, Storage};

use super::app::App;

/// Longest time the loop blocks waiting for input while the metronome is
/// stopped.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Spin up the terminal backend, enter the draw loop, and keep processing input
/// until the user quits.
pub fn run_app<S: Storage, I: IdSource>(app: &mut App<S, I>) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;

    let result = event_loop(&mut terminal, app);

    cleanup_terminal(&mut terminal)?;
    result
}

fn event_loop<S: Storage, I: IdSource>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<S, I>,
) -> Result<()> {
    loop {
        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")?;

        let timeout = app
            .controller()
            .time_until_next_tick(Instant::now())
            .map_or(IDLE_POLL, |until| until.min(IDLE_POLL));

        if event::poll(timeout).context("event polling failed")? {
            if let Event::Key(key_event) = event::read().context("failed to read event")? {
                match route_key(key_event) {
                    KeyRoute::Quit => return Ok(()),
                    KeyRoute::Forward(code) => {
                        if app.handle_key(code) {
                            return Ok(());
                        }
                    }
                    KeyRoute::Ignore => {}
                }
            }
        }

        app.tick(Instant::now());
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyRoute {
    Quit,
    Forward(KeyCode),
    Ignore,
}

/// Ctrl+C quits. Any other Ctrl chord is dropped so it cannot reach the plain
/// letter bindings.
fn route_key(key: KeyEvent) -> KeyRoute {
    if key.kind != KeyEventKind::Press {
        return KeyRoute::Ignore;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => KeyRoute::Quit,
            _ => KeyRoute::Ignore,
        };
    }
    KeyRoute::Forward(key.code)
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal
        .show_cursor()
        .context("failed to restore cursor visibility")
}
