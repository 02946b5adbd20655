//! Typed cell values and per-row stats maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// One cell of a stats row.
///
/// `value` is the raw metric; the remaining members are optional decorations
/// that may arrive separately from the value (e.g. an `is_editable`-only
/// patch after a save).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_status: Option<String>,
}

impl StatsValue {
    /// A cell holding just a value.
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A cell with nothing in it (placeholder rows).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the incoming cell carries a value.
    #[must_use]
    pub const fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Numeric view of the value, if it is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(serde_json::Value::as_f64)
    }

    /// Display text: explicit `text` first, then the raw value.
    #[must_use]
    pub fn display(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        match &self.value {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Copy over every decoration the patch defines, leaving the rest intact.
    pub fn merge_decorations(&mut self, patch: &Self) {
        if patch.text.is_some() {
            self.text.clone_from(&patch.text);
        }
        if patch.url.is_some() {
            self.url.clone_from(&patch.url);
        }
        if patch.is_editable.is_some() {
            self.is_editable = patch.is_editable;
        }
        if patch.edit_message.is_some() {
            self.edit_message.clone_from(&patch.edit_message);
        }
        if patch.goal_status.is_some() {
            self.goal_status.clone_from(&patch.goal_status);
        }
    }
}

/// Field name → cell, in column order.
pub type StatsMap = IndexMap<String, StatsValue>;

/// A stats map shared between the tree and the display rows built from it.
///
/// Updates mutate the map in place so every holder observes them.
pub type SharedStats = Rc<RefCell<StatsMap>>;

/// Wrap a stats map for sharing.
#[must_use]
pub fn shared_stats(stats: StatsMap) -> SharedStats {
    Rc::new(RefCell::new(stats))
}

/// Merge a stats patch into `target`.
///
/// A patch field that defines `value` replaces the existing cell wholesale.
/// A patch field without `value` only contributes the decorations it
/// defines, so partial patches never erase an existing value. Returns
/// whether anything was written.
pub fn merge_stats(target: &mut StatsMap, patch: &StatsMap) -> bool {
    let mut touched = false;
    for (field, incoming) in patch {
        if incoming.has_value() {
            target.insert(field.clone(), incoming.clone());
            touched = true;
        } else if let Some(existing) = target.get_mut(field) {
            existing.merge_decorations(incoming);
            touched = true;
        } else {
            target.insert(field.clone(), incoming.clone());
            touched = true;
        }
    }
    touched
}
