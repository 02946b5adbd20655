//! Column registry resolution across levels, paths and capabilities.

use std::collections::BTreeSet;
use zem_grid::{Breakdown, ColumnRegistry, GridColumn, Level};

fn column<'a>(columns: &'a [GridColumn], field: &str) -> Option<&'a GridColumn> {
    columns.iter().find(|c| c.field == field)
}

fn capabilities(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}

#[test]
fn test_state_column_follows_base_breakdown() {
    let registry = ColumnRegistry::new();
    let none = BTreeSet::new();

    let ad_groups = registry.resolve_columns(Level::AdGroups, &[Breakdown::ContentAd], &none);
    assert!(column(&ad_groups, "state").is_some());

    let all = registry.resolve_columns(Level::AllAccounts, &[Breakdown::Account], &none);
    assert!(column(&all, "state").is_none());
}

#[test]
fn test_capability_gates_cost_columns() {
    let registry = ColumnRegistry::new();
    let path = [Breakdown::Campaign];

    let without = registry.resolve_columns(Level::Accounts, &path, &BTreeSet::new());
    assert!(!column(&without, "etf_cost").unwrap().shown);
    assert!(column(&without, "etfm_cost").unwrap().shown);

    let with = registry.resolve_columns(
        Level::Accounts,
        &path,
        &capabilities(&["can_view_platform_cost"]),
    );
    let etf = column(&with, "etf_cost").unwrap();
    assert!(etf.shown);
    // Offered but hidden until picked.
    assert!(!etf.visible);
}

#[test]
fn test_name_column_is_branded_by_base() {
    let registry = ColumnRegistry::new();
    let columns =
        registry.resolve_columns(Level::Campaigns, &[Breakdown::MediaSource], &BTreeSet::new());
    let name = column(&columns, "name").unwrap();
    assert_eq!(name.name, Breakdown::MediaSource.label());
    assert!(name.permanent);
}

#[test]
fn test_resolution_leaves_catalogue_untouched() {
    let registry = ColumnRegistry::new();
    let before = registry.specs().len();
    let _ = registry.resolve_columns(Level::Accounts, &[Breakdown::Campaign], &BTreeSet::new());
    let _ = registry.resolve_columns(Level::AdGroups, &[Breakdown::Publisher], &BTreeSet::new());
    assert_eq!(registry.specs().len(), before);
    assert_eq!(registry.spec("name").unwrap().name, "Name");
}

#[test]
fn test_breakdown_groups_per_level() {
    let registry = ColumnRegistry::new();

    let accounts = registry.breakdown_groups(Level::Accounts);
    assert_eq!(accounts.default_base(), Some(Breakdown::Campaign));
    assert!(accounts.contains(Breakdown::Day));
    assert!(accounts.contains(Breakdown::Publisher));

    let all = registry.breakdown_groups(Level::AllAccounts);
    assert_eq!(all.default_base(), Some(Breakdown::Account));
    assert!(!all.base.contains(&Breakdown::Publisher));
}
