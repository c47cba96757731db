use serde_json::{Map, Value};
use std::path::PathBuf;

use super::store::{Category, PreferenceStore, Preferences};
use crate::error::Result;

/// Editable value of one preference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Boolean preference, edited as a checkbox
    Toggle(bool),
    /// String preference, edited as free text
    Text(String),
    /// Any other JSON value, edited as its JSON text
    Raw(String),
}

impl FieldValue {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(b) => FieldValue::Toggle(*b),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Raw(other.to_string()),
        }
    }

    /// Written back with the kind it was read as, so a flag stays a flag
    fn to_value(&self) -> Value {
        match self {
            FieldValue::Toggle(b) => Value::Bool(*b),
            FieldValue::Text(s) => Value::String(s.clone()),
            // Text that no longer parses is kept as a plain string
            FieldValue::Raw(s) => {
                serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

/// Form model behind the preferences popup.
///
/// Holds a copy of one category; nothing reaches the store until
/// [`PreferencesForm::commit`].
#[derive(Debug, Clone)]
pub struct PreferencesForm {
    category: Category,
    fields: Vec<Field>,
    selected: usize,
}

impl PreferencesForm {
    pub fn new(prefs: &Preferences, category: Category) -> Self {
        let fields = prefs
            .entries(category)
            .into_iter()
            .map(|(key, value)| Field {
                value: FieldValue::from_value(&value),
                key,
            })
            .collect();

        Self {
            category,
            fields,
            selected: 0,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_field(&self) -> Option<&Field> {
        self.fields.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.fields.is_empty() {
            self.selected = (self.selected + 1) % self.fields.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.fields.is_empty() {
            self.selected = (self.selected + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Flip the selected checkbox; no-op on text fields
    pub fn toggle_selected(&mut self) {
        if let Some(Field {
            value: FieldValue::Toggle(b),
            ..
        }) = self.fields.get_mut(self.selected)
        {
            *b = !*b;
        }
    }

    /// Text of the selected field, unless it is a checkbox
    fn selected_text_mut(&mut self) -> Option<&mut String> {
        match self.fields.get_mut(self.selected) {
            Some(Field {
                value: FieldValue::Text(s) | FieldValue::Raw(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    /// Append to the selected text field; no-op on checkboxes
    pub fn push_char(&mut self, c: char) {
        if let Some(s) = self.selected_text_mut() {
            s.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(s) = self.selected_text_mut() {
            s.pop();
        }
    }

    pub fn clear_selected(&mut self) {
        if let Some(s) = self.selected_text_mut() {
            s.clear();
        }
    }

    /// Partial document carrying every field of this category
    pub fn to_update(&self) -> Map<String, Value> {
        let entries: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.key.clone(), field.value.to_value()))
            .collect();

        let mut partial = Map::new();
        partial.insert(self.category.key().to_string(), Value::Object(entries));
        partial
    }

    /// Write the edited values into the store and save it
    pub fn commit(&self, store: &mut PreferenceStore) -> Result<PathBuf> {
        store.update(self.to_update(), false)?;
        store.save()
    }
}
