//! Row selection.

use crate::parser::{ParsedGrid, RowType};
use std::collections::BTreeSet;

/// Selected rows by breakdown id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    enabled: bool,
    rows: BTreeSet<String>,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Selection {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            rows: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Select or deselect a row; returns whether the selection changed.
    pub fn set_selected(&mut self, breakdown_id: &str, selected: bool) -> bool {
        if !self.enabled {
            return false;
        }
        if selected {
            self.rows.insert(breakdown_id.to_string())
        } else {
            self.rows.remove(breakdown_id)
        }
    }

    /// Select every stats row of the grid.
    pub fn select_all(&mut self, grid: &ParsedGrid) -> bool {
        if !self.enabled {
            return false;
        }
        let before = self.rows.len();
        self.rows.extend(
            grid.rows
                .iter()
                .filter(|row| row.row_type() == RowType::Stats)
                .map(|row| row.breakdown_id().to_string()),
        );
        self.rows.len() != before
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.rows.is_empty();
        self.rows.clear();
        changed
    }

    /// Drop selected ids that no longer have a row.
    pub fn retain_rows(&mut self, grid: &ParsedGrid) -> bool {
        let present: BTreeSet<&str> = grid.rows.iter().map(|row| row.breakdown_id()).collect();
        let before = self.rows.len();
        self.rows.retain(|id| present.contains(id.as_str()));
        self.rows.len() != before
    }

    #[must_use]
    pub fn is_selected(&self, breakdown_id: &str) -> bool {
        self.rows.contains(breakdown_id)
    }

    #[must_use]
    pub const fn selected(&self) -> &BTreeSet<String> {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_rows() {
        let mut selection = Selection::new(true);
        assert!(selection.set_selected("1", true));
        assert!(!selection.set_selected("1", true));
        assert!(selection.is_selected("1"));
        assert!(selection.set_selected("1", false));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_disabled_selection_ignores_changes() {
        let mut selection = Selection::new(false);
        assert!(!selection.set_selected("1", true));
        assert!(!selection.select_all(&ParsedGrid::default()));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_retain_rows_drops_missing() {
        let mut selection = Selection::new(true);
        selection.set_selected("gone", true);
        assert!(selection.retain_rows(&ParsedGrid::default()));
        assert!(!selection.clear());
    }
}
