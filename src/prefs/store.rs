use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::location::{default_save_path, resolve_path};
use crate::error::{Error, Result};

/// Setting that controls whether the terminal size is persisted on exit
pub const SAVE_GEOMETRY_ON_EXIT: &str = "Save window geometry on exit";

/// Last recorded terminal size, formatted as `<cols>x<rows>`
pub const WINDOW_GEOMETRY: &str = "Window geometry";

/// The three fixed preference categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Settings,
    Cmds,
    Aliases,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Settings, Category::Cmds, Category::Aliases];

    /// Top-level JSON key of this category
    pub fn key(self) -> &'static str {
        match self {
            Category::Settings => "settings",
            Category::Cmds => "cmds",
            Category::Aliases => "aliases",
        }
    }

    /// Human-readable title for the editor
    pub fn title(self) -> &'static str {
        match self {
            Category::Settings => "Settings",
            Category::Cmds => "Commands",
            Category::Aliases => "Aliases",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s).ok_or_else(|| {
            Error::Shape(format!(
                "unknown category `{}` (expected settings, cmds or aliases)",
                s
            ))
        })
    }
}

/// A `settings` value: a flag, free text, or any other JSON kept as found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
    Other(Value),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Text(s) => f.write_str(s),
            SettingValue::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<Value> for SettingValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => SettingValue::Bool(b),
            Value::String(s) => SettingValue::Text(s),
            other => SettingValue::Other(other),
        }
    }
}

impl From<&SettingValue> for Value {
    fn from(value: &SettingValue) -> Self {
        match value {
            SettingValue::Bool(b) => Value::Bool(*b),
            SettingValue::Text(s) => Value::String(s.clone()),
            SettingValue::Other(v) => v.clone(),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

/// The persisted preference document.
///
/// Known categories are typed; any other top-level key found in a file is
/// kept in `extra` so that saving does not drop it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preferences {
    pub aliases: BTreeMap<String, String>,
    pub cmds: BTreeMap<String, String>,
    pub settings: BTreeMap<String, SettingValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Preferences {
    fn default() -> Self {
        let cmds = [("terraform", "terraform"), ("git", "git")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut settings = BTreeMap::new();
        settings.insert(SAVE_GEOMETRY_ON_EXIT.to_string(), SettingValue::Bool(true));
        settings.insert(WINDOW_GEOMETRY.to_string(), SettingValue::Text(String::new()));

        Self {
            aliases: BTreeMap::new(),
            cmds,
            settings,
            extra: Map::new(),
        }
    }
}

impl Preferences {
    /// Load a config file and overlay it onto the defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let document: Map<String, Value> =
            serde_json::from_str(&content).map_err(|e| Error::parse(path, e))?;

        let mut prefs = Self::default();
        for (key, value) in document {
            match Category::from_key(&key) {
                Some(category) => prefs.merge_category(category, value)?,
                None => {
                    prefs.extra.insert(key, value);
                }
            }
        }
        Ok(prefs)
    }

    /// Apply a partial document.
    ///
    /// Mappings merge into existing mappings key by key; any other value
    /// replaces what was there. Known categories only accept mappings.
    /// On error `self` is left untouched.
    pub fn update(&mut self, partial: Map<String, Value>) -> Result<()> {
        let mut next = self.clone();
        for (key, value) in partial {
            if let Some(category) = Category::from_key(&key) {
                next.merge_category(category, value)?;
                continue;
            }
            match (next.extra.get_mut(&key), value) {
                (Some(Value::Object(existing)), Value::Object(incoming)) => {
                    existing.extend(incoming);
                }
                (_, value) => {
                    next.extra.insert(key, value);
                }
            }
        }
        *self = next;
        Ok(())
    }

    fn merge_category(&mut self, category: Category, value: Value) -> Result<()> {
        let Value::Object(entries) = value else {
            return Err(Error::Shape(format!("`{}` must be an object", category)));
        };

        for (key, value) in entries {
            match category {
                Category::Settings => {
                    self.settings.insert(key, SettingValue::from(value));
                }
                Category::Cmds | Category::Aliases => {
                    let Value::String(text) = value else {
                        return Err(Error::Shape(format!(
                            "{}.{}: expected a string",
                            category, key
                        )));
                    };
                    self.string_map_mut(category).insert(key, text);
                }
            }
        }
        Ok(())
    }

    fn string_map_mut(&mut self, category: Category) -> &mut BTreeMap<String, String> {
        match category {
            Category::Aliases => &mut self.aliases,
            _ => &mut self.cmds,
        }
    }

    /// Key/value view of one category, in display order
    pub fn entries(&self, category: Category) -> Vec<(String, Value)> {
        match category {
            Category::Settings => self
                .settings
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect(),
            Category::Cmds => string_entries(&self.cmds),
            Category::Aliases => string_entries(&self.aliases),
        }
    }

    /// Remove one entry; returns whether it existed
    pub fn remove(&mut self, category: Category, key: &str) -> bool {
        match category {
            Category::Settings => self.settings.remove(key).is_some(),
            Category::Cmds => self.cmds.remove(key).is_some(),
            Category::Aliases => self.aliases.remove(key).is_some(),
        }
    }

    pub fn setting_bool(&self, key: &str) -> Option<bool> {
        self.settings.get(key).and_then(SettingValue::as_bool)
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(SettingValue::as_str)
    }

    /// Value for user-typed `text`, keeping the kind of the existing entry.
    ///
    /// A flag only accepts `true`/`false` and a non-string setting only
    /// accepts JSON; anything else, and every new entry, is a string.
    pub fn value_from_text(&self, category: Category, key: &str, text: String) -> Value {
        let existing = match category {
            Category::Settings => self.settings.get(key),
            Category::Cmds | Category::Aliases => None,
        };
        match existing {
            Some(SettingValue::Bool(_)) => match text.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(text),
            },
            Some(SettingValue::Other(_)) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            _ => Value::String(text),
        }
    }

    /// Serialize as the on-disk document (four-space indented JSON)
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer).map_err(Error::Serialize)?;
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn string_entries(map: &BTreeMap<String, String>) -> Vec<(String, Value)> {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// Preferences plus the file they came from.
///
/// Built once in `main` and handed to whatever needs it.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    prefs: Preferences,
    location: Option<PathBuf>,
}

impl PreferenceStore {
    /// Store holding defaults only
    pub fn new(location: Option<PathBuf>) -> Self {
        Self {
            prefs: Preferences::default(),
            location,
        }
    }

    /// Open a store, loading `location` when one is given
    pub fn open(location: Option<PathBuf>) -> Result<Self> {
        let prefs = match location {
            Some(ref path) => Preferences::load(path)?,
            None => Preferences::default(),
        };
        Ok(Self { prefs, location })
    }

    /// Resolve the config location and load it.
    ///
    /// A load failure does not prevent startup: the store falls back to
    /// defaults (keeping the location) and the error is handed back for the
    /// caller to report.
    pub fn discover() -> (Self, Option<Error>) {
        let location = resolve_path();
        match Self::open(location.clone()) {
            Ok(store) => {
                match store.location() {
                    Some(path) => tracing::info!("loaded preferences from {}", path.display()),
                    None => tracing::info!("no config file found, using defaults"),
                }
                (store, None)
            }
            Err(e) => {
                tracing::error!("failed to load preferences: {}", e);
                (Self::new(location), Some(e))
            }
        }
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn prefs_mut(&mut self) -> &mut Preferences {
        &mut self.prefs
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Write the preferences to disk and return the path written.
    ///
    /// With no location yet, the home-directory default becomes the location.
    pub fn save(&mut self) -> Result<PathBuf> {
        let path = match self.location {
            Some(ref path) => path.clone(),
            None => {
                let path = default_save_path()?;
                self.location = Some(path.clone());
                path
            }
        };

        let content = self.prefs.to_json_pretty()?;
        fs::write(&path, content).map_err(|e| Error::io(&path, e))?;
        tracing::info!("saved preferences to {}", path.display());
        Ok(path)
    }

    /// Merge a partial document (see [`Preferences::update`]), optionally saving
    pub fn update(&mut self, partial: Map<String, Value>, save: bool) -> Result<()> {
        self.prefs.update(partial)?;
        if save {
            self.save()?;
        }
        Ok(())
    }

    /// Set a single entry, converting `value` to the category's value type
    pub fn set(&mut self, category: Category, key: &str, value: Value) -> Result<()> {
        let mut entry = Map::new();
        entry.insert(key.to_string(), value);
        let mut partial = Map::new();
        partial.insert(category.key().to_string(), Value::Object(entry));
        self.prefs.update(partial)
    }
}
