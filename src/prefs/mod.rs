//! Layered preference store.
//!
//! Preferences start from hard-coded defaults and are overlaid, key by key,
//! by a JSON file found through [`resolve_path`]:
//!
//! 1. `$LT_CFG`
//! 2. `./.lt_cfg.json`
//! 3. `~/.lt_cfg.json`
//!
//! ```no_run
//! use lieutenant::prefs::{PreferenceStore, WINDOW_GEOMETRY};
//!
//! let (mut store, error) = PreferenceStore::discover();
//! if let Some(e) = error {
//!     eprintln!("using defaults: {}", e);
//! }
//! println!("{:?}", store.prefs().setting_str(WINDOW_GEOMETRY));
//! store.save().unwrap();
//! ```

pub mod editor;
pub mod location;
pub mod store;

pub use editor::{Field, FieldValue, PreferencesForm};
pub use location::{resolve_from, resolve_path, CONFIG_ENV_VAR, CONFIG_FILE};
pub use store::{
    Category, PreferenceStore, Preferences, SettingValue, SAVE_GEOMETRY_ON_EXIT, WINDOW_GEOMETRY,
};
