//! Column visibility state of one grid.

use crate::registry::{ColumnCategory, GridColumn};
use std::collections::BTreeSet;

/// Resolved columns plus their current visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnState {
    columns: Vec<GridColumn>,
    categories: Vec<ColumnCategory>,
}

impl ColumnState {
    /// Adopt freshly resolved columns.
    ///
    /// `preferred` (stored visible fields) overrides the defaults of every
    /// non-permanent column; without it default visibility stays.
    #[must_use]
    pub fn new(
        mut columns: Vec<GridColumn>,
        categories: Vec<ColumnCategory>,
        preferred: Option<&BTreeSet<String>>,
    ) -> Self {
        if let Some(preferred) = preferred {
            for column in columns.iter_mut().filter(|c| c.is_renderable()) {
                column.visible = column.permanent || preferred.contains(&column.field);
            }
        }
        Self {
            columns,
            categories,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[GridColumn] {
        &self.columns
    }

    #[must_use]
    pub fn categories(&self) -> &[ColumnCategory] {
        &self.categories
    }

    /// Columns currently displayed, in order.
    pub fn visible(&self) -> impl Iterator<Item = &GridColumn> {
        self.columns
            .iter()
            .filter(|column| column.is_renderable() && column.visible)
    }

    #[must_use]
    pub fn visible_fields(&self) -> BTreeSet<String> {
        self.visible().map(|column| column.field.clone()).collect()
    }

    #[must_use]
    pub fn column(&self, field: &str) -> Option<&GridColumn> {
        self.columns.iter().find(|column| column.field == field)
    }

    /// Show or hide a column; permanent columns cannot be hidden.
    ///
    /// Returns whether anything changed.
    pub fn set_visible(&mut self, field: &str, visible: bool) -> bool {
        let Some(column) = self
            .columns
            .iter_mut()
            .find(|column| column.field == field && column.is_renderable())
        else {
            return false;
        };
        if column.permanent || column.visible == visible {
            return false;
        }
        column.visible = visible;
        true
    }

    /// Show or hide every column of a category.
    pub fn set_category_visible(&mut self, category: &str, visible: bool) -> bool {
        let fields: Vec<String> = self
            .categories
            .iter()
            .filter(|c| c.name == category)
            .flat_map(|c| c.all_fields().map(str::to_string).collect::<Vec<_>>())
            .collect();
        fields
            .iter()
            .fold(false, |changed, field| self.set_visible(field, visible) || changed)
    }
}
