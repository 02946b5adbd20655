//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::types::GridConfig;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
const CONFIG_FILE_NAMES: &[&str] = &[
    ".zem-grid.yaml",
    ".zem-grid.yml",
    "zem-grid.yaml",
    "zem-grid.yml",
];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (~/.config/zem-grid/)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    let cwd = std::env::current_dir().ok();
    let candidates = [
        cwd.clone(),
        cwd.as_deref().and_then(find_git_root),
        dirs::config_dir().map(|dir| dir.join("zem-grid")),
        dirs::home_dir(),
    ];
    candidates
        .iter()
        .flatten()
        .find_map(|dir| find_config_in_dir(dir))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Find the git repository root by walking up from `start`.
fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug)]
pub enum ConfigFileError {
    /// File not found
    NotFound(PathBuf),
    /// IO error reading file
    Io(std::io::Error),
    /// YAML parsing error
    Parse(serde_yaml::Error),
}

impl std::fmt::Display for ConfigFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            Self::Io(e) => write!(f, "Failed to read config file: {e}"),
            Self::Parse(e) => write!(f, "Failed to parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigFileError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigFileError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<ConfigFileError> for crate::error::GridError {
    fn from(err: ConfigFileError) -> Self {
        match err {
            ConfigFileError::NotFound(path) => Self::config(format!("not found: {}", path.display())),
            ConfigFileError::Io(e) => e.into(),
            ConfigFileError::Parse(e) => e.into(),
        }
    }
}

/// Load a `GridConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<GridConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: GridConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (GridConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (GridConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {}", path.display());
                (config, Some(path))
            }
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (GridConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl GridConfig {
    /// Merge another config into this one, with `other` taking precedence
    /// wherever it differs from the defaults.
    ///
    /// This is useful for layering CLI args over file config.
    pub fn merge(&mut self, other: &Self) {
        let defaults = Self::default();

        // Data config
        if other.data.page_sizes != defaults.data.page_sizes {
            self.data.page_sizes.clone_from(&other.data.page_sizes);
        }
        if other.data.default_order != defaults.data.default_order {
            self.data.default_order.clone_from(&other.data.default_order);
        }
        if other.data.show_archived {
            self.data.show_archived = true;
        }
        if other.data.date_range_days != defaults.data.date_range_days {
            self.data.date_range_days = other.data.date_range_days;
        }

        // Endpoint config
        if other.endpoint.base_url != defaults.endpoint.base_url {
            self.endpoint.base_url.clone_from(&other.endpoint.base_url);
        }
        if other.endpoint.timeout_secs != defaults.endpoint.timeout_secs {
            self.endpoint.timeout_secs = other.endpoint.timeout_secs;
        }
        if other.endpoint.max_retries != defaults.endpoint.max_retries {
            self.endpoint.max_retries = other.endpoint.max_retries;
        }
        if other.endpoint.routes != defaults.endpoint.routes {
            self.endpoint.routes = other.endpoint.routes.clone();
        }

        // Grid behavior (flags that differ from their default override)
        if other.grid.save_queue != defaults.grid.save_queue {
            self.grid.save_queue = other.grid.save_queue;
        }
        if other.grid.selection_enabled != defaults.grid.selection_enabled {
            self.grid.selection_enabled = other.grid.selection_enabled;
        }
        if other.grid.collapse_new_rows {
            self.grid.collapse_new_rows = true;
        }

        if other.preferences_file.is_some() {
            self.preferences_file.clone_from(&other.preferences_file);
        }
    }

    /// Load from file and merge with CLI overrides.
    #[must_use]
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        cli_overrides: &Self,
    ) -> (Self, Option<PathBuf>) {
        let (mut config, loaded_from) = load_or_default(config_path);
        config.merge(cli_overrides);
        (config, loaded_from)
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content.
#[must_use]
pub fn generate_example_config() -> String {
    let example = GridConfig::default();
    format!(
        r"# zem-grid configuration
# Place this file at .zem-grid.yaml in your project root or ~/.config/zem-grid/

{}
",
        serde_yaml::to_string(&example).unwrap_or_default()
    )
}

// ============================================================================
// Tests
// ============================================================================
