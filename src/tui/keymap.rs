//! Key chord to [`Action`] dispatch table.
//!
//! The event loop looks every key press up here and hands the resulting
//! action to [`App::dispatch`](super::app::App::dispatch). Keys without a
//! binding are treated as text input in the modes that take text.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use super::app::Mode;
use crate::prefs::Category;

/// Everything the user can ask the UI to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    FocusFind,
    Find,
    FindBackspace,
    LeaveFind,
    NextMatch,
    PrevMatch,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    PageUp,
    PageDown,
    Top,
    Bottom,
    OpenPreferences(Category),
    FormNext,
    FormPrev,
    FormToggle,
    FormBackspace,
    FormClear,
    FormSave,
    FormCancel,
    ShowHelp,
    HideHelp,
}

/// A key plus modifiers, normalized so `Shift+n` and `N` are the same chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyChord {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let modifiers = match code {
            // The character already carries the shift state
            KeyCode::Char(_) | KeyCode::BackTab => modifiers - KeyModifiers::SHIFT,
            _ => modifiers,
        };
        Self { code, modifiers }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

impl From<&KeyEvent> for KeyChord {
    fn from(key: &KeyEvent) -> Self {
        Self::new(key.code, key.modifiers)
    }
}

pub struct Keymap {
    bindings: HashMap<(Mode, KeyChord), Action>,
}

impl Keymap {
    /// Empty table
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, mode: Mode, chord: KeyChord, action: Action) {
        self.bindings.insert((mode, chord), action);
    }

    /// Bind `chord` in every mode
    pub fn bind_global(&mut self, chord: KeyChord, action: Action) {
        for mode in Mode::ALL {
            self.bind(mode, chord, action);
        }
    }

    pub fn lookup(&self, mode: Mode, key: &KeyEvent) -> Option<Action> {
        self.bindings.get(&(mode, KeyChord::from(key))).copied()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        use KeyCode::*;

        let mut map = Self::empty();

        map.bind_global(KeyChord::ctrl('c'), Action::Quit);
        map.bind_global(KeyChord::ctrl('q'), Action::Quit);

        // Normal: output pane has focus
        let normal = [
            (KeyChord::plain(Char('q')), Action::Quit),
            (KeyChord::plain(Char('/')), Action::FocusFind),
            (KeyChord::ctrl('f'), Action::FocusFind),
            (KeyChord::plain(Char('n')), Action::NextMatch),
            (KeyChord::plain(Char('N')), Action::PrevMatch),
            (KeyChord::plain(Char('j')), Action::ScrollDown),
            (KeyChord::plain(Down), Action::ScrollDown),
            (KeyChord::plain(Char('k')), Action::ScrollUp),
            (KeyChord::plain(Up), Action::ScrollUp),
            (KeyChord::plain(Char('h')), Action::ScrollLeft),
            (KeyChord::plain(Left), Action::ScrollLeft),
            (KeyChord::plain(Char('l')), Action::ScrollRight),
            (KeyChord::plain(Right), Action::ScrollRight),
            (KeyChord::plain(PageDown), Action::PageDown),
            (KeyChord::ctrl('d'), Action::PageDown),
            (KeyChord::plain(PageUp), Action::PageUp),
            (KeyChord::ctrl('u'), Action::PageUp),
            (KeyChord::plain(Char('g')), Action::Top),
            (KeyChord::plain(Home), Action::Top),
            (KeyChord::plain(Char('G')), Action::Bottom),
            (KeyChord::plain(End), Action::Bottom),
            (KeyChord::plain(Char('?')), Action::ShowHelp),
        ];
        for (chord, action) in normal {
            map.bind(Mode::Normal, chord, action);
        }

        // Find: typing goes into the find bar
        let find = [
            (KeyChord::plain(Enter), Action::Find),
            (KeyChord::plain(Backspace), Action::FindBackspace),
            (KeyChord::plain(Esc), Action::LeaveFind),
            (KeyChord::ctrl('n'), Action::NextMatch),
            (KeyChord::plain(Down), Action::NextMatch),
            (KeyChord::ctrl('p'), Action::PrevMatch),
            (KeyChord::plain(Up), Action::PrevMatch),
        ];
        for (chord, action) in find {
            map.bind(Mode::Find, chord, action);
        }

        // Preferences popup
        let form = [
            (KeyChord::plain(Down), Action::FormNext),
            (KeyChord::plain(Tab), Action::FormNext),
            (KeyChord::plain(Up), Action::FormPrev),
            (KeyChord::plain(BackTab), Action::FormPrev),
            (KeyChord::plain(Enter), Action::FormToggle),
            (KeyChord::plain(Backspace), Action::FormBackspace),
            (KeyChord::ctrl('u'), Action::FormClear),
            (KeyChord::ctrl('s'), Action::FormSave),
            (KeyChord::plain(Esc), Action::FormCancel),
        ];
        for (chord, action) in form {
            map.bind(Mode::Preferences, chord, action);
        }

        // Help popup
        map.bind(Mode::Help, KeyChord::plain(Esc), Action::HideHelp);
        map.bind(Mode::Help, KeyChord::plain(Char('q')), Action::HideHelp);
        map.bind(Mode::Help, KeyChord::plain(Char('?')), Action::HideHelp);

        // Function keys work from the pane and the find bar
        for mode in [Mode::Normal, Mode::Find] {
            map.bind(mode, KeyChord::plain(F(1)), Action::ShowHelp);
            map.bind(mode, KeyChord::plain(F(2)), Action::OpenPreferences(Category::Settings));
            map.bind(mode, KeyChord::plain(F(3)), Action::OpenPreferences(Category::Cmds));
            map.bind(mode, KeyChord::plain(F(4)), Action::OpenPreferences(Category::Aliases));
        }

        map
    }
}
