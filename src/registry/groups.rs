//! Breakdown groups per level and column picker categories.

use super::columns::CategoryKind;
use super::resolve::GridColumn;
use crate::model::{Breakdown, Level};
use serde::{Deserialize, Serialize};

/// Breakdown dimensions offered at a level, grouped for the picker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownGroups {
    /// Dimensions that may start a path.
    pub base: Vec<Breakdown>,
    /// Entity dimensions below the base.
    pub structure: Vec<Breakdown>,
    pub delivery: Vec<Breakdown>,
    pub time: Vec<Breakdown>,
}

impl BreakdownGroups {
    /// The groups offered at `level`.
    #[must_use]
    pub fn for_level(level: Level) -> Self {
        let child = level.child_breakdown();
        let mut base = vec![child, Breakdown::MediaSource];
        if level != Level::AllAccounts {
            base.extend([Breakdown::Publisher, Breakdown::Placement]);
        }
        let structure = match level {
            Level::AllAccounts => vec![Breakdown::Campaign, Breakdown::MediaSource],
            Level::Accounts => vec![Breakdown::AdGroup, Breakdown::MediaSource],
            Level::Campaigns => vec![Breakdown::ContentAd, Breakdown::MediaSource],
            Level::AdGroups => vec![Breakdown::MediaSource],
        };
        Self {
            base,
            structure,
            delivery: Breakdown::all()
                .iter()
                .copied()
                .filter(|b| b.kind() == crate::model::BreakdownKind::Delivery)
                .collect(),
            time: vec![Breakdown::Day, Breakdown::Week, Breakdown::Month],
        }
    }

    /// The base dimension a fresh grid starts with.
    #[must_use]
    pub fn default_base(&self) -> Option<Breakdown> {
        self.base.first().copied()
    }

    /// Whether `breakdown` may appear in a path at this level.
    #[must_use]
    pub fn contains(&self, breakdown: Breakdown) -> bool {
        self.base.contains(&breakdown)
            || self.structure.contains(&breakdown)
            || self.delivery.contains(&breakdown)
            || self.time.contains(&breakdown)
    }
}

// ============================================================================
// Categories
// ============================================================================

/// A column picker category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCategory {
    pub kind: CategoryKind,
    pub name: String,
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<ColumnCategory>,
}

impl ColumnCategory {
    #[must_use]
    pub fn new(kind: CategoryKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            fields: Vec::new(),
            subcategories: Vec::new(),
        }
    }

    /// Add a field, into the named subcategory when given. Existing fields
    /// are not repeated.
    pub fn add_field(&mut self, field: &str, subcategory: Option<&str>) {
        let target = match subcategory {
            Some(name) => {
                let idx = match self.subcategories.iter().position(|s| s.name == name) {
                    Some(idx) => idx,
                    None => {
                        self.subcategories.push(Self::new(self.kind, name));
                        self.subcategories.len() - 1
                    }
                };
                &mut self.subcategories[idx]
            }
            None => self,
        };
        if !target.fields.iter().any(|f| f == field) {
            target.fields.push(field.to_string());
        }
    }

    /// Every field in this category and its subcategories.
    pub fn all_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields
            .iter()
            .map(String::as_str)
            .chain(self.subcategories.iter().flat_map(|s| s.fields.iter().map(String::as_str)))
    }
}

/// Add `column` to its category, creating the category in picker order.
pub fn categorize(categories: &mut Vec<ColumnCategory>, column: &GridColumn) {
    let idx = match categories.iter().position(|c| c.kind == column.category) {
        Some(idx) => idx,
        None => {
            let at = categories
                .iter()
                .position(|c| c.kind > column.category)
                .unwrap_or(categories.len());
            categories.insert(at, ColumnCategory::new(column.category, column.category.label()));
            at
        }
    };
    categories[idx].add_field(&column.field, column.subcategory.as_deref());
}

/// Build picker categories from the columns a user may choose.
#[must_use]
pub fn build_categories(columns: &[GridColumn]) -> Vec<ColumnCategory> {
    let mut categories = Vec::new();
    for column in columns.iter().filter(|c| c.is_renderable() && !c.permanent) {
        categorize(&mut categories, column);
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::columns::{ColumnType, DynamicFamily};

    #[test]
    fn test_groups_per_level() {
        let all = BreakdownGroups::for_level(Level::AllAccounts);
        assert_eq!(all.default_base(), Some(Breakdown::Account));
        assert!(!all.base.contains(&Breakdown::Publisher));

        let ad_group = BreakdownGroups::for_level(Level::AdGroups);
        assert_eq!(ad_group.default_base(), Some(Breakdown::ContentAd));
        assert!(ad_group.contains(Breakdown::Country));
        assert!(ad_group.contains(Breakdown::Day));
    }

    #[test]
    fn test_categorize_subcategories() {
        let mut categories = Vec::new();
        let mut column = GridColumn::dynamic(
            DynamicFamily::Pixels,
            "pixel_1_24".into(),
            "Sale 1 day".into(),
            ColumnType::Number,
        );
        column.subcategory = Some("Sale".into());
        categorize(&mut categories, &column);
        categorize(&mut categories, &column);

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].subcategories[0].fields, vec!["pixel_1_24"]);
        assert_eq!(categories[0].all_fields().count(), 1);
    }
}
