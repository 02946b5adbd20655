//! Configuration types for zem-grid.
//!
//! Provides structured configuration for data loading, the backend endpoint
//! and grid behavior, plus persisted per-user grid preferences.

use crate::model::{Level, Order};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

// ============================================================================
// Unified Grid Configuration
// ============================================================================

/// Top-level configuration, loaded from a config file and CLI overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GridConfig {
    /// Data loading (page sizes, default order, filters)
    pub data: DataConfig,
    /// Backend endpoint
    pub endpoint: EndpointConfig,
    /// Grid behavior flags
    pub grid: GridBehaviorConfig,
    /// Where to persist grid preferences (defaults to the user config dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences_file: Option<PathBuf>,
}

impl GridConfig {
    /// Create a `GridConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `GridConfig` builder.
    pub fn builder() -> GridConfigBuilder {
        GridConfigBuilder::default()
    }

    /// Page size for a 1-based tree level.
    #[must_use]
    pub fn page_size(&self, level: usize) -> usize {
        self.data.page_size(level)
    }

    /// Resolved preferences path.
    #[must_use]
    pub fn preferences_path(&self) -> Option<PathBuf> {
        self.preferences_file
            .clone()
            .or_else(GridPreferences::default_path)
    }
}

// ============================================================================
// Builder for GridConfig
// ============================================================================

/// Builder for constructing `GridConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct GridConfigBuilder {
    config: GridConfig,
}

impl GridConfigBuilder {
    /// Set per-level page sizes.
    pub fn page_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.config.data.page_sizes = sizes;
        self
    }

    /// Set the default order (e.g. `"-clicks"`).
    pub fn default_order(mut self, order: impl Into<String>) -> Self {
        self.config.data.default_order = order.into();
        self
    }

    /// Include archived rows.
    pub const fn show_archived(mut self, show: bool) -> Self {
        self.config.data.show_archived = show;
        self
    }

    /// Set the backend base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint.base_url = url.into();
        self
    }

    /// Set the request timeout.
    pub const fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.endpoint.timeout_secs = secs;
        self
    }

    /// Enable or disable row selection.
    pub const fn selection_enabled(mut self, enabled: bool) -> Self {
        self.config.grid.selection_enabled = enabled;
        self
    }

    /// Set the preferences file.
    pub fn preferences_file(mut self, path: Option<PathBuf>) -> Self {
        self.config.preferences_file = path;
        self
    }

    /// Build the `GridConfig`.
    #[must_use]
    pub fn build(self) -> GridConfig {
        self.config
    }
}

// ============================================================================
// Sub-configuration Types
// ============================================================================

/// Data loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DataConfig {
    /// Rows fetched per page, by tree level (the last entry covers deeper levels)
    pub page_sizes: Vec<usize>,
    /// Initial sort order, `-` prefix for descending
    pub default_order: String,
    /// Include archived rows
    pub show_archived: bool,
    /// Length of the default date range, in days
    #[schemars(range(min = 1))]
    pub date_range_days: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            page_sizes: super::defaults::DEFAULT_PAGE_SIZES.to_vec(),
            default_order: super::defaults::DEFAULT_ORDER.to_string(),
            show_archived: false,
            date_range_days: super::defaults::DEFAULT_DATE_RANGE_DAYS,
        }
    }
}

impl DataConfig {
    /// Page size for a 1-based tree level.
    #[must_use]
    pub fn page_size(&self, level: usize) -> usize {
        let idx = level.saturating_sub(1);
        self.page_sizes
            .get(idx)
            .or_else(|| self.page_sizes.last())
            .copied()
            .unwrap_or(super::defaults::DEFAULT_PAGE_SIZES[0])
    }

    #[must_use]
    pub fn order(&self) -> Order {
        Order::parse(&self.default_order)
    }
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the grid backend
    pub base_url: String,
    /// Request timeout in seconds
    #[schemars(range(min = 1))]
    pub timeout_secs: u64,
    /// Retries for failed idempotent requests
    pub max_retries: u8,
    /// Route templates
    pub routes: RouteConfig,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: super::defaults::DEFAULT_TIMEOUT_SECS,
            max_retries: super::defaults::DEFAULT_MAX_RETRIES,
            routes: RouteConfig::default(),
        }
    }
}

/// Route templates relative to `base_url`.
///
/// Placeholders: `{level}`, `{id}`, `{breakdown}` (slash-joined path) and
/// `{row}` (breakdown id of the edited row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RouteConfig {
    pub metadata: String,
    pub breakdown: String,
    pub save: String,
    pub edit: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            metadata: "/api/grid/{level}/{id}/".to_string(),
            breakdown: "/api/grid/{level}/{id}/breakdown/{breakdown}/".to_string(),
            save: "/api/grid/{level}/{id}/stats/".to_string(),
            edit: "/api/grid/{level}/{id}/edit/{row}/".to_string(),
        }
    }
}

/// Grid behavior flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GridBehaviorConfig {
    /// Queue concurrent saves instead of rejecting them
    pub save_queue: bool,
    /// Allow row selection
    pub selection_enabled: bool,
    /// Newly loaded child rows start collapsed
    pub collapse_new_rows: bool,
}

impl Default for GridBehaviorConfig {
    fn default() -> Self {
        Self {
            save_queue: true,
            selection_enabled: true,
            collapse_new_rows: false,
        }
    }
}

// ============================================================================
// Grid Preferences (persisted)
// ============================================================================

/// Per-user grid preferences that persist across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GridPreferences {
    /// Visible column fields, keyed by level wire name
    pub visible_columns: BTreeMap<String, BTreeSet<String>>,
    /// Last used order, keyed by level wire name
    pub orders: BTreeMap<String, String>,
}

impl GridPreferences {
    /// Default location of the preferences file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("zem-grid").join("preferences.json"))
    }

    /// Load preferences, or defaults when the file is missing or unreadable.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save preferences, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Stored visible columns for a level.
    #[must_use]
    pub fn visible_columns(&self, level: Level) -> Option<&BTreeSet<String>> {
        self.visible_columns.get(level.name())
    }

    pub fn set_visible_columns(&mut self, level: Level, fields: BTreeSet<String>) {
        self.visible_columns.insert(level.name().to_string(), fields);
    }

    #[must_use]
    pub fn order(&self, level: Level) -> Option<Order> {
        self.orders.get(level.name()).map(|o| Order::parse(o))
    }

    pub fn set_order(&mut self, level: Level, order: &Order) {
        self.orders.insert(level.name().to_string(), order.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_page_size_falls_back_to_last() {
        let data = DataConfig::default();
        assert_eq!(data.page_size(1), 60);
        assert_eq!(data.page_size(4), 7);
        assert_eq!(data.page_size(9), 7);
    }

    #[test]
    fn test_builder() {
        let config = GridConfig::builder()
            .page_sizes(vec![10, 2])
            .default_order("name")
            .selection_enabled(false)
            .build();
        assert_eq!(config.page_size(2), 2);
        assert!(!config.data.order().descending);
        assert!(!config.grid.selection_enabled);
    }

    #[test]
    fn test_preferences_roundtrip_on_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("prefs.json");

        let mut prefs = GridPreferences::default();
        prefs.set_visible_columns(Level::Campaigns, ["clicks".to_string()].into());
        prefs.set_order(Level::Campaigns, &Order::asc("name"));
        prefs.save_to(&path).unwrap();

        let loaded = GridPreferences::load_from(&path);
        assert_eq!(loaded, prefs);
        assert_eq!(loaded.order(Level::Campaigns), Some(Order::asc("name")));
        assert_eq!(GridPreferences::load_from(&tmp.path().join("missing.json")), GridPreferences::default());
    }
}
