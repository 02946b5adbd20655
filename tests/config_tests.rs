//! Config file loading, merging and persisted preferences.

use std::collections::BTreeSet;
use tempfile::TempDir;
use zem_grid::config::{
    generate_example_config, generate_json_schema, load_config_file, ConfigFileError,
    ConfigPreset, GridConfig, GridPreferences, Validatable,
};
use zem_grid::{Level, Order};

#[test]
fn test_yaml_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".zem-grid.yaml");
    std::fs::write(
        &path,
        "data:\n  page_sizes: [30, 3]\n  default_order: \"-clicks\"\ngrid:\n  save_queue: false\n",
    )
    .unwrap();

    let config = load_config_file(&path).unwrap();
    assert_eq!(config.data.page_sizes, vec![30, 3]);
    assert_eq!(config.page_size(5), 3);
    assert_eq!(config.data.order(), Order::desc("clicks"));
    assert!(!config.grid.save_queue);
    // Untouched sections keep their defaults.
    assert_eq!(config.endpoint, GridConfig::default().endpoint);
    assert!(config.is_valid());
}

#[test]
fn test_missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = load_config_file(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigFileError::NotFound(_)));
}

#[test]
fn test_cli_overrides_win_over_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grid.yaml");
    std::fs::write(&path, "data:\n  page_sizes: [30, 3]\n").unwrap();

    let overrides = GridConfig::builder().default_order("-impressions").build();
    let (config, loaded_from) = GridConfig::from_file_with_overrides(Some(&path), &overrides);
    assert_eq!(loaded_from.as_deref(), Some(path.as_path()));
    assert_eq!(config.data.page_sizes, vec![30, 3]);
    assert_eq!(config.data.default_order, "-impressions");
}

#[test]
fn test_invalid_values_are_all_listed() {
    let mut config = GridConfig::builder().page_sizes(vec![10, 0]).build();
    config.data.default_order = "-".to_string();

    let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
    assert!(fields.contains(&"data.page_sizes".to_string()));
    assert!(fields.contains(&"data.default_order".to_string()));
    assert!(config.ensure_valid().is_err());
}

#[test]
fn test_presets_are_valid() {
    for name in ["default", "compact", "deep"] {
        let preset = ConfigPreset::from_name(name).unwrap();
        assert!(GridConfig::from_preset(preset).is_valid(), "preset {name}");
    }
    assert!(ConfigPreset::from_name("nope").is_none());
}

#[test]
fn test_example_config_parses() {
    let config: GridConfig = serde_yaml::from_str(&generate_example_config()).unwrap();
    assert!(config.is_valid());
}

#[test]
fn test_schema_names_sections() {
    let schema = generate_json_schema().unwrap();
    assert!(schema.contains("page_sizes"));
    assert!(schema.contains("save_queue"));
}

#[test]
fn test_preferences_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("preferences.json");

    let mut preferences = GridPreferences::default();
    preferences.set_order(Level::Campaigns, &Order::asc("clicks"));
    preferences.set_visible_columns(
        Level::Campaigns,
        BTreeSet::from(["name".to_string(), "clicks".to_string()]),
    );
    preferences.save_to(&path).unwrap();

    let loaded = GridPreferences::load_from(&path);
    assert_eq!(loaded.order(Level::Campaigns), Some(Order::asc("clicks")));
    assert_eq!(loaded.order(Level::Accounts), None);
    assert_eq!(loaded.visible_columns(Level::Campaigns).unwrap().len(), 2);
}

#[test]
fn test_corrupt_preferences_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("preferences.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert_eq!(GridPreferences::load_from(&path), GridPreferences::default());
}
