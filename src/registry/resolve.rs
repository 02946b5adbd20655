//! Resolving the catalogue into the column list of one grid configuration.

use super::columns::{CategoryKind, ColumnSpec, ColumnType, DynamicFamily};
use crate::model::{Breakdown, Level};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Suffix of the refund twin generated for refund-aware columns.
pub const REFUND_SUFFIX: &str = "_refund";

/// A column as offered by one grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridColumn {
    pub field: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub column_type: ColumnType,
    pub category: CategoryKind,
    /// Offered to this user at this level and breakdown.
    pub shown: bool,
    /// Currently displayed.
    pub visible: bool,
    pub permanent: bool,
    pub orderable: bool,
    pub order_field: String,
    pub totals: bool,
    pub editable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<DynamicFamily>,
    /// Family of a runtime-generated column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<DynamicFamily>,
    /// Column picker subcategory (one per pixel).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Tracks the campaign's primary goal.
    #[serde(default)]
    pub primary_goal: bool,
}

impl GridColumn {
    fn from_spec(spec: &ColumnSpec, shown: bool) -> Self {
        Self {
            field: spec.field.clone(),
            name: spec.name.clone(),
            help: spec.help.clone(),
            column_type: spec.column_type,
            category: spec.category,
            shown,
            visible: shown && (spec.permanent || spec.default),
            permanent: spec.permanent,
            orderable: spec.orderable,
            order_field: spec.order_field().to_string(),
            totals: spec.totals,
            editable: spec.editable,
            placeholder: spec.placeholder,
            family: None,
            subcategory: None,
            primary_goal: false,
        }
    }

    /// A runtime column belonging to `family`.
    #[must_use]
    pub fn dynamic(
        family: DynamicFamily,
        field: String,
        name: String,
        column_type: ColumnType,
    ) -> Self {
        Self {
            order_field: field.clone(),
            field,
            name,
            help: None,
            column_type,
            category: family.category(),
            shown: true,
            visible: false,
            permanent: false,
            orderable: true,
            totals: true,
            editable: false,
            placeholder: None,
            family: Some(family),
            subcategory: None,
            primary_goal: false,
        }
    }

    /// Whether the column takes part in rendering (placeholders never do).
    #[must_use]
    pub const fn is_renderable(&self) -> bool {
        self.shown && self.placeholder.is_none()
    }

    fn refund_twin(&self) -> Self {
        Self {
            field: format!("{}{REFUND_SUFFIX}", self.field),
            name: format!("{} Refund", self.name),
            help: Some(format!("Refunded part of {}.", self.name)),
            visible: false,
            permanent: false,
            order_field: format!("{}{REFUND_SUFFIX}", self.order_field),
            editable: false,
            ..self.clone()
        }
    }
}

/// Filter, expand and brand the catalogue for one configuration.
///
/// Works on clones; `specs` is never modified.
#[must_use]
pub fn resolve_columns(
    specs: &[ColumnSpec],
    level: Level,
    path: &[Breakdown],
    capabilities: &BTreeSet<String>,
) -> Vec<GridColumn> {
    let base = path.first().copied();
    let mut columns = Vec::with_capacity(specs.len());

    for spec in specs.iter().filter(|spec| spec.exceptions.allows(level, path)) {
        let shown = spec
            .shown
            .resolve(level, path, |capability| capabilities.contains(capability));
        let mut column = GridColumn::from_spec(spec, shown);
        if let Some(base) = base {
            brand(&mut column, base);
        }
        let twin = spec.supports_refunds.then(|| column.refund_twin());
        columns.push(column);
        columns.extend(twin);
    }

    columns
}

/// Rename and restrict the breakdown-dependent management columns.
fn brand(column: &mut GridColumn, base: Breakdown) {
    match column.field.as_str() {
        "name" => column.name = base.label().to_string(),
        "status" => {
            if !base.is_structural() {
                column.name = format!("{} Status", base.label());
            }
            if matches!(base, Breakdown::Publisher | Breakdown::Placement) {
                column.orderable = false;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::columns::catalogue;

    fn fields(columns: &[GridColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.field.as_str()).collect()
    }

    #[test]
    fn test_state_column_availability() {
        let specs = catalogue();
        let caps = BTreeSet::new();
        let ad_groups = resolve_columns(&specs, Level::AdGroups, &[Breakdown::ContentAd], &caps);
        assert!(fields(&ad_groups).contains(&"state"));

        let all = resolve_columns(&specs, Level::AllAccounts, &[Breakdown::Account], &caps);
        assert!(!fields(&all).contains(&"state"));
    }

    #[test]
    fn test_refund_twin_follows_column() {
        let specs = catalogue();
        let columns = resolve_columns(&specs, Level::Accounts, &[Breakdown::Campaign], &BTreeSet::new());
        let idx = columns.iter().position(|c| c.field == "etfm_cost").unwrap();
        let twin = &columns[idx + 1];
        assert_eq!(twin.field, "etfm_cost_refund");
        assert!(!twin.visible);
    }

    #[test]
    fn test_status_branding() {
        let specs = catalogue();
        let caps = BTreeSet::new();
        let columns = resolve_columns(&specs, Level::AdGroups, &[Breakdown::Publisher], &caps);
        let status = columns.iter().find(|c| c.field == "status").unwrap();
        assert!(!status.orderable);
        assert_eq!(status.name, "Publisher Status");
        let name = columns.iter().find(|c| c.field == "name").unwrap();
        assert_eq!(name.name, "Publisher");
    }

    #[test]
    fn test_capability_gates_visibility() {
        let specs = catalogue();
        let path = [Breakdown::Campaign];
        let without = resolve_columns(&specs, Level::Accounts, &path, &BTreeSet::new());
        let media = without.iter().find(|c| c.field == "media_cost").unwrap();
        assert!(!media.shown);

        let caps: BTreeSet<String> = ["can_view_actual_costs".to_string()].into();
        let with = resolve_columns(&specs, Level::Accounts, &path, &caps);
        assert!(with.iter().find(|c| c.field == "media_cost").unwrap().shown);
    }
}
