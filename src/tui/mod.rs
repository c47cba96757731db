//! Full-screen terminal front end: output pane, find bar, status bar and
//! the preferences popups.

mod app;
mod keymap;
mod ui;

pub use app::{parse_geometry, App, Mode, Segment, SegmentKind};
pub use keymap::{Action, KeyChord, Keymap};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{
        self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

use crate::error::Error;
use crate::prefs::{PreferenceStore, WINDOW_GEOMETRY};

/// Run `argv` in the full-screen UI until the user quits.
pub fn run(store: PreferenceStore, load_error: Option<Error>, argv: Vec<String>) -> Result<()> {
    let geometry = store
        .prefs()
        .setting_str(WINDOW_GEOMETRY)
        .and_then(parse_geometry);

    enable_raw_mode()?;
    let mut terminal = restore_on_error(|| setup_terminal(geometry), restore_terminal)?;

    let mut app = App::new(store, load_error);
    app.start_command(&argv);

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    let size = terminal.size();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Ok(size) = size {
        match app.persist_geometry(size.width, size.height) {
            Ok(Some(path)) => tracing::info!("saved geometry to {}", path.display()),
            Ok(None) => {}
            Err(e) => eprintln!("Error saving preferences: {}", e),
        }
    }

    result
}

/// Switch to the alternate screen and build the ratatui terminal.
/// Raw mode must already be on.
fn setup_terminal(geometry: Option<(u16, u16)>) -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if let Some((cols, rows)) = geometry {
        // Not every terminal honors a resize request
        let _ = execute!(stdout, terminal::SetSize(cols, rows));
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Clear the terminal to prevent any artifacts from previous content
    terminal.clear()?;
    Ok(terminal)
}

/// Best effort: the terminal is already failing when this runs
fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Run `setup`, calling `restore` before handing back any error
fn restore_on_error<T>(setup: impl FnOnce() -> Result<T>, restore: impl FnOnce()) -> Result<T> {
    setup().inspect_err(|_| restore())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let keymap = keymap::Keymap::default();

    loop {
        // Pull in new output (non-blocking)
        app.poll_output();

        let size = terminal.size()?;
        let (width, height) = ui::output_viewport(Rect::new(0, 0, size.width, size.height));
        app.set_viewport(width, height);

        terminal.draw(|f| ui::draw(f, app))?;

        if app.should_quit() {
            return Ok(());
        }

        // Poll for events with timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            // Only handle key press events, not release or repeat
            // This fixes duplicate keypresses on Windows where both press and release are reported
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if let Some(action) = keymap.lookup(app.mode, &key) {
                    app.dispatch(action);
                } else if let KeyCode::Char(c) = key.code {
                    if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                        app.input_char(c);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_failed_setup_restores() {
        let restored = Cell::new(false);
        let result: Result<()> =
            restore_on_error(|| Err(anyhow::anyhow!("no tty")), || restored.set(true));
        assert!(result.is_err());
        assert!(restored.get());
    }

    #[test]
    fn test_successful_setup_keeps_terminal() {
        let restored = Cell::new(false);
        let result = restore_on_error(|| Ok(7), || restored.set(true));
        assert_eq!(result.unwrap(), 7);
        assert!(!restored.get());
    }
}
