use std::ops::Range;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::prefs::{
    Category, FieldValue, PreferenceStore, PreferencesForm, SettingValue, SAVE_GEOMETRY_ON_EXIT,
    WINDOW_GEOMETRY,
};
use crate::runner::{self, RunEvent, RunHandle, RunOptions};
use crate::search::{Match, SearchIndex};

use super::keymap::Action;

/// Upper bound on runner events applied per tick so input stays responsive
const MAX_EVENTS_PER_TICK: usize = 2000;

/// Columns moved per horizontal scroll step
const HORIZONTAL_STEP: usize = 8;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Output pane has focus
    Normal,
    /// Typing into the find bar
    Find,
    /// Preferences popup is open
    Preferences,
    Help,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Normal, Mode::Find, Mode::Preferences, Mode::Help];
}

/// How a piece of an output line is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Plain,
    Match,
    CurrentMatch,
}

/// Part of one output line, as byte offsets into that line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub range: Range<usize>,
    pub kind: SegmentKind,
}

/// Application state
pub struct App {
    store: PreferenceStore,
    /// Cleared when the config failed to load, so exit does not overwrite it
    persist_on_exit: bool,
    /// Everything the command printed, one `\n` per line
    output: String,
    /// Byte offset where each output line starts
    line_starts: Vec<usize>,
    run: Option<RunHandle>,
    search: SearchIndex,
    pub mode: Mode,
    /// Mode to return to when help closes
    pub previous_mode: Mode,
    pub find_input: String,
    /// `x/y matches`, or the reason the last search failed
    pub search_status: String,
    pub status_message: String,
    pub form: Option<PreferencesForm>,
    pub scroll_y: usize,
    pub scroll_x: usize,
    /// Keep the newest output in view
    pub follow: bool,
    viewport_width: usize,
    viewport_height: usize,
    should_quit: bool,
}

impl App {
    pub fn new(store: PreferenceStore, load_error: Option<Error>) -> Self {
        let status_message = match load_error {
            Some(ref e) => format!("Config not loaded, using defaults: {}", e),
            None => match store.location() {
                Some(path) => format!("Config: {}", path.display()),
                None => "Config: defaults".to_string(),
            },
        };

        Self {
            store,
            persist_on_exit: load_error.is_none(),
            output: String::new(),
            line_starts: Vec::new(),
            run: None,
            search: SearchIndex::new(),
            mode: Mode::Normal,
            previous_mode: Mode::Normal,
            find_input: String::new(),
            search_status: "0/0 matches".to_string(),
            status_message,
            form: None,
            scroll_y: 0,
            scroll_x: 0,
            follow: true,
            viewport_width: 80,
            viewport_height: 20,
            should_quit: false,
        }
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Resolve `argv` through the preferences and start it in the background
    pub fn start_command(&mut self, argv: &[String]) {
        let resolved = match runner::resolve_argv(argv, self.store.prefs()) {
            Ok(resolved) => resolved,
            Err(failure) => {
                self.append_line(&failure.to_string());
                self.status_message = "Nothing to run".to_string();
                return;
            }
        };

        let handle = runner::spawn(&resolved, RunOptions::detached());
        self.status_message = format!("Running: {}", handle.command());
        self.run = Some(handle);
    }

    /// Apply pending runner events (call this in event loop)
    pub fn poll_output(&mut self) {
        let Some(handle) = self.run.take() else {
            return;
        };

        for _ in 0..MAX_EVENTS_PER_TICK {
            match handle.try_recv() {
                Some(RunEvent::Line(line)) => {
                    tracing::trace!("{}", line);
                    self.append_line(&line);
                }
                Some(RunEvent::Finished(outcome)) => {
                    self.status_message = match outcome {
                        Ok(()) => format!("Finished: {}", handle.command()),
                        Err(failure) => {
                            self.append_line(&failure.to_string());
                            format!("Failed: {}", handle.command())
                        }
                    };
                    return;
                }
                None => break,
            }
        }

        // Still running, put the handle back
        self.run = Some(handle);
    }

    /// Append one line to the output buffer
    pub fn append_line(&mut self, line: &str) {
        self.line_starts.push(self.output.len());
        self.output.push_str(line);
        self.output.push('\n');
        if self.follow {
            self.scroll_to_bottom();
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte range of line `i`, without its newline
    fn line_range(&self, i: usize) -> Range<usize> {
        let start = self.line_starts[i];
        let end = self
            .line_starts
            .get(i + 1)
            .map_or(self.output.len(), |next| next - 1);
        start..end
    }

    pub fn line(&self, i: usize) -> &str {
        &self.output[self.line_range(i)]
    }

    /// Line that contains byte `offset`
    fn line_of_offset(&self, offset: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// Split line `i` into plain and highlighted segments
    pub fn line_segments(&self, i: usize) -> Vec<Segment> {
        let line = self.line_range(i);
        let current = self.search.current_match();
        let matches = self.search.matches();
        let first = matches.partition_point(|m| m.end <= line.start);

        let mut segments = Vec::new();
        let mut cursor = line.start;
        for m in &matches[first..] {
            if m.start >= line.end {
                break;
            }
            let start = m.start.max(line.start);
            let end = m.end.min(line.end);
            if start >= end {
                continue;
            }
            if start > cursor {
                segments.push(Segment {
                    range: cursor - line.start..start - line.start,
                    kind: SegmentKind::Plain,
                });
            }
            let kind = if Some(*m) == current {
                SegmentKind::CurrentMatch
            } else {
                SegmentKind::Match
            };
            segments.push(Segment {
                range: start - line.start..end - line.start,
                kind,
            });
            cursor = end;
        }
        if cursor < line.end || segments.is_empty() {
            segments.push(Segment {
                range: cursor - line.start..line.end - line.start,
                kind: SegmentKind::Plain,
            });
        }
        segments
    }

    pub fn search(&self) -> &SearchIndex {
        &self.search
    }

    /// Size of the output pane's text area
    pub fn set_viewport(&mut self, width: usize, height: usize) {
        self.viewport_width = width.max(1);
        self.viewport_height = height.max(1);
        if self.follow {
            self.scroll_to_bottom();
        } else {
            self.clamp_scroll();
        }
    }

    /// Run one action from the dispatch table
    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::FocusFind => self.mode = Mode::Find,
            Action::LeaveFind => self.mode = Mode::Normal,
            Action::Find => self.find(),
            Action::FindBackspace => {
                self.find_input.pop();
            }
            Action::NextMatch => {
                self.search.next();
                self.show_current_match();
            }
            Action::PrevMatch => {
                self.search.previous();
                self.show_current_match();
            }
            Action::ScrollUp => self.scroll_up(1),
            Action::ScrollDown => self.scroll_down(1),
            Action::PageUp => self.scroll_up(self.viewport_height),
            Action::PageDown => self.scroll_down(self.viewport_height),
            Action::ScrollLeft => self.scroll_x = self.scroll_x.saturating_sub(HORIZONTAL_STEP),
            Action::ScrollRight => self.scroll_x += HORIZONTAL_STEP,
            Action::Top => {
                self.follow = false;
                self.scroll_y = 0;
            }
            Action::Bottom => {
                self.follow = true;
                self.scroll_to_bottom();
            }
            Action::OpenPreferences(category) => self.open_preferences(category),
            Action::FormNext => self.with_form(PreferencesForm::select_next),
            Action::FormPrev => self.with_form(PreferencesForm::select_prev),
            Action::FormToggle => self.with_form(PreferencesForm::toggle_selected),
            Action::FormBackspace => self.with_form(PreferencesForm::pop_char),
            Action::FormClear => self.with_form(PreferencesForm::clear_selected),
            Action::FormSave => self.save_preferences(),
            Action::FormCancel => self.close_preferences(),
            Action::ShowHelp => {
                if self.mode != Mode::Help {
                    self.previous_mode = self.mode;
                    self.mode = Mode::Help;
                }
            }
            Action::HideHelp => {
                if self.mode == Mode::Help {
                    self.mode = self.previous_mode;
                }
            }
        }
    }

    /// Text typed into whatever has focus
    pub fn input_char(&mut self, c: char) {
        match self.mode {
            Mode::Find => self.find_input.push(c),
            Mode::Preferences => {
                let Some(form) = self.form.as_mut() else {
                    return;
                };
                let on_toggle = matches!(
                    form.selected_field().map(|f| &f.value),
                    Some(FieldValue::Toggle(_))
                );
                if on_toggle && c == ' ' {
                    form.toggle_selected();
                } else {
                    form.push_char(c);
                }
            }
            Mode::Normal | Mode::Help => {}
        }
    }

    /// Search the output for the find bar's pattern and select the first hit
    pub fn find(&mut self) {
        match self.search.search(&self.output, &self.find_input) {
            Ok(_) => {
                self.search.next();
                self.show_current_match();
                self.update_search_status();
            }
            Err(e) => {
                tracing::debug!("{}", e);
                self.search_status = "Invalid regex".to_string();
            }
        }
    }

    fn update_search_status(&mut self) {
        let (current, total) = self.search.status();
        self.search_status = format!("{}/{} matches", current, total);
    }

    /// Scroll so the selected match is visible
    fn show_current_match(&mut self) {
        self.update_search_status();
        let Some(m) = self.search.current_match() else {
            return;
        };
        self.follow = false;

        let line = self.line_of_offset(m.start);
        if line < self.scroll_y || line >= self.scroll_y + self.viewport_height {
            self.scroll_y = line.saturating_sub(self.viewport_height / 2);
        }

        let column = self.column_of(line, m);
        if column < self.scroll_x || column >= self.scroll_x + self.viewport_width {
            self.scroll_x = column.saturating_sub(self.viewport_width / 4);
        }
        self.clamp_scroll();
    }

    /// Character column of `m` within `line`
    fn column_of(&self, line: usize, m: Match) -> usize {
        let start = self.line_starts[line];
        self.output[start..m.start].chars().count()
    }

    fn max_scroll_y(&self) -> usize {
        self.line_count().saturating_sub(self.viewport_height)
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_y = self.max_scroll_y();
    }

    fn clamp_scroll(&mut self) {
        self.scroll_y = self.scroll_y.min(self.max_scroll_y());
    }

    fn scroll_up(&mut self, lines: usize) {
        self.follow = false;
        self.scroll_y = self.scroll_y.saturating_sub(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_y = (self.scroll_y + lines).min(self.max_scroll_y());
        self.follow = self.scroll_y == self.max_scroll_y();
    }

    fn open_preferences(&mut self, category: Category) {
        self.form = Some(PreferencesForm::new(self.store.prefs(), category));
        self.mode = Mode::Preferences;
    }

    fn close_preferences(&mut self) {
        self.form = None;
        self.mode = Mode::Normal;
    }

    fn with_form(&mut self, edit: impl FnOnce(&mut PreferencesForm)) {
        if let Some(form) = self.form.as_mut() {
            edit(form);
        }
    }

    fn save_preferences(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };
        self.status_message = match form.commit(&mut self.store) {
            Ok(path) => {
                // Saved explicitly, so the file may be rewritten on exit
                self.persist_on_exit = true;
                format!("Saved {} to {}", form.category().title(), path.display())
            }
            Err(e) => {
                tracing::error!("failed to save preferences: {}", e);
                format!("Error saving preferences: {}", e)
            }
        };
        self.mode = Mode::Normal;
    }

    /// Record the terminal size and save, if the settings ask for it.
    ///
    /// Returns the path written, or `None` when nothing was saved.
    pub fn persist_geometry(&mut self, cols: u16, rows: u16) -> Result<Option<PathBuf>> {
        if !self.persist_on_exit {
            tracing::info!("config was not loaded; not saving on exit");
            return Ok(None);
        }
        if self.store.prefs().setting_bool(SAVE_GEOMETRY_ON_EXIT) != Some(true) {
            return Ok(None);
        }

        self.store.prefs_mut().settings.insert(
            WINDOW_GEOMETRY.to_string(),
            SettingValue::Text(format!("{}x{}", cols, rows)),
        );
        self.store.save().map(Some)
    }
}

/// Parse a `<cols>x<rows>` geometry, ignoring any `+x+y` position suffix
pub fn parse_geometry(geometry: &str) -> Option<(u16, u16)> {
    let size = geometry.split(['+', '-']).next()?;
    let (cols, rows) = size.split_once('x')?;
    let cols = cols.trim().parse().ok()?;
    let rows = rows.trim().parse().ok()?;
    if cols == 0 || rows == 0 {
        return None;
    }
    Some((cols, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::Preferences;

    fn app_with_lines(lines: &[&str]) -> App {
        let mut app = App::new(PreferenceStore::new(None), None);
        app.set_viewport(40, 3);
        for line in lines {
            app.append_line(line);
        }
        app
    }

    fn find(app: &mut App, pattern: &str) {
        app.dispatch(Action::FocusFind);
        for c in pattern.chars() {
            app.input_char(c);
        }
        app.dispatch(Action::Find);
    }

    #[test]
    fn test_find_selects_first_match() {
        let mut app = app_with_lines(&["foo bar foo"]);
        find(&mut app, "foo");
        assert_eq!(app.search_status, "1/2 matches");
        assert_eq!(app.search().current(), Some(0));

        app.dispatch(Action::NextMatch);
        assert_eq!(app.search_status, "2/2 matches");
        app.dispatch(Action::NextMatch);
        assert_eq!(app.search_status, "1/2 matches");
        app.dispatch(Action::PrevMatch);
        assert_eq!(app.search_status, "2/2 matches");
    }

    #[test]
    fn test_find_empty_and_invalid() {
        let mut app = app_with_lines(&["foo"]);
        find(&mut app, "");
        assert_eq!(app.search_status, "0/0 matches");

        find(&mut app, "(");
        assert_eq!(app.search_status, "Invalid regex");
        assert!(app.search().matches().is_empty());
    }

    #[test]
    fn test_find_without_hits() {
        let mut app = app_with_lines(&["foo"]);
        find(&mut app, "zzz");
        assert_eq!(app.search_status, "0/0 matches");
    }

    #[test]
    fn test_line_segments() {
        let mut app = app_with_lines(&["plan apply", "apply"]);
        find(&mut app, "apply");

        assert_eq!(
            app.line_segments(0),
            vec![
                Segment {
                    range: 0..5,
                    kind: SegmentKind::Plain
                },
                Segment {
                    range: 5..10,
                    kind: SegmentKind::CurrentMatch
                },
            ]
        );
        assert_eq!(
            app.line_segments(1),
            vec![Segment {
                range: 0..5,
                kind: SegmentKind::Match
            }]
        );
    }

    #[test]
    fn test_match_spanning_lines_is_split() {
        // Two characters from the last "o" cover "o\n"
        let mut app = app_with_lines(&["foo", "bar"]);
        find(&mut app, "o$");
        assert_eq!(app.search().matches(), &[Match { start: 2, end: 4 }]);

        assert_eq!(
            app.line_segments(0),
            vec![
                Segment {
                    range: 0..2,
                    kind: SegmentKind::Plain
                },
                Segment {
                    range: 2..3,
                    kind: SegmentKind::CurrentMatch
                },
            ]
        );
        assert_eq!(
            app.line_segments(1),
            vec![Segment {
                range: 0..3,
                kind: SegmentKind::Plain
            }]
        );
    }

    #[test]
    fn test_empty_line_has_one_segment() {
        let app = app_with_lines(&[""]);
        assert_eq!(
            app.line_segments(0),
            vec![Segment {
                range: 0..0,
                kind: SegmentKind::Plain
            }]
        );
    }

    #[test]
    fn test_follow_and_scroll_to_match() {
        let lines: Vec<String> = (0..10).map(|i| format!("line {}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut app = app_with_lines(&refs);
        assert_eq!(app.scroll_y, 7);

        find(&mut app, "line 1");
        assert!(!app.follow);
        assert_eq!(app.scroll_y, 0);

        app.append_line("line 10");
        assert_eq!(app.scroll_y, 0);

        app.dispatch(Action::Bottom);
        assert!(app.follow);
        assert_eq!(app.scroll_y, 8);
    }

    #[test]
    fn test_help_returns_to_previous_mode() {
        let mut app = app_with_lines(&[]);
        app.dispatch(Action::FocusFind);
        app.dispatch(Action::ShowHelp);
        assert_eq!(app.mode, Mode::Help);
        app.dispatch(Action::HideHelp);
        assert_eq!(app.mode, Mode::Find);
    }

    #[test]
    fn test_preferences_edit_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let mut app = App::new(PreferenceStore::new(Some(path.clone())), None);

        app.dispatch(Action::OpenPreferences(Category::Settings));
        assert_eq!(app.mode, Mode::Preferences);
        app.input_char(' '); // toggles "Save window geometry on exit"
        app.dispatch(Action::FormNext);
        for c in "100x30".chars() {
            app.input_char(c);
        }
        app.dispatch(Action::FormSave);

        assert_eq!(app.mode, Mode::Normal);
        assert!(app.form.is_none());
        let saved = Preferences::load(&path).unwrap();
        assert_eq!(saved.setting_bool(SAVE_GEOMETRY_ON_EXIT), Some(false));
        assert_eq!(saved.setting_str(WINDOW_GEOMETRY), Some("100x30"));
    }

    #[test]
    fn test_preferences_cancel_discards() {
        let mut app = App::new(PreferenceStore::new(None), None);
        app.dispatch(Action::OpenPreferences(Category::Cmds));
        app.input_char('x');
        app.dispatch(Action::FormCancel);
        assert_eq!(app.store().prefs().cmds["git"], "git");
    }

    #[test]
    fn test_persist_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let mut app = App::new(PreferenceStore::new(Some(path.clone())), None);

        assert_eq!(app.persist_geometry(120, 40).unwrap(), Some(path.clone()));
        let saved = Preferences::load(&path).unwrap();
        assert_eq!(saved.setting_str(WINDOW_GEOMETRY), Some("120x40"));
    }

    #[test]
    fn test_no_persist_after_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = PreferenceStore::new(Some(path.clone()));
        let mut app = App::new(store, Some(Error::Shape("broken".to_string())));

        assert_eq!(app.persist_geometry(120, 40).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_no_persist_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let mut store = PreferenceStore::new(Some(path.clone()));
        store
            .prefs_mut()
            .settings
            .insert(SAVE_GEOMETRY_ON_EXIT.to_string(), SettingValue::Bool(false));
        let mut app = App::new(store, None);

        assert_eq!(app.persist_geometry(120, 40).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_resolve_failure_is_appended() {
        let mut app = App::new(PreferenceStore::new(None), None);
        app.start_command(&[]);
        assert!(!app.is_running());
        assert_eq!(app.line(0), "Unexpected error: no command given");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_output_streams_in() {
        let mut app = App::new(PreferenceStore::new(None), None);
        app.start_command(&[
            "sh".to_string(),
            "-c".to_string(),
            "echo hello; exit 4".to_string(),
        ]);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while app.is_running() && std::time::Instant::now() < deadline {
            app.poll_output();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert_eq!(app.line(0), "hello");
        assert!(app.line(1).contains("failed with return code 4"));
    }

    #[test]
    fn test_parse_geometry() {
        assert_eq!(parse_geometry("1024x768"), Some((1024, 768)));
        assert_eq!(parse_geometry("800x600+10+20"), Some((800, 600)));
        assert_eq!(parse_geometry(""), None);
        assert_eq!(parse_geometry("0x10"), None);
        assert_eq!(parse_geometry("wide"), None);
    }
}
