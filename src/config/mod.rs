//! Configuration module for zem-grid.
//!
//! This module provides a unified configuration system with:
//! - Type-safe configuration structures
//! - Validation for all configuration values
//! - Named presets for common use cases
//! - YAML config file loading and discovery
//! - CLI argument merging
//! - Persisted per-user grid preferences
//!
//! # Quick Start
//!
//! ```rust
//! use zem_grid::config::{ConfigPreset, GridConfig, Validatable};
//!
//! let config = GridConfig::from_preset(ConfigPreset::Compact);
//! assert!(config.is_valid());
//!
//! let config = GridConfig::builder()
//!     .page_sizes(vec![30, 5])
//!     .default_order("-clicks")
//!     .build();
//! assert_eq!(config.page_size(2), 5);
//! ```
//!
//! # Configuration File
//!
//! Place a `.zem-grid.yaml` file in your project root or `~/.config/zem-grid/`:
//!
//! ```yaml
//! data:
//!   page_sizes: [60, 4, 5, 7]
//!   default_order: "-etfm_cost"
//! endpoint:
//!   base_url: https://grid.example.com
//!   timeout_secs: 30
//! grid:
//!   collapse_new_rows: true
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

// Re-export main types
pub use defaults::{
    ConfigPreset, DEFAULT_DATE_RANGE_DAYS, DEFAULT_MAX_RETRIES, DEFAULT_ORDER, DEFAULT_PAGE_SIZES,
    DEFAULT_TIMEOUT_SECS,
};
pub use types::{
    DataConfig, EndpointConfig, GridBehaviorConfig, GridConfig, GridConfigBuilder,
    GridPreferences, RouteConfig,
};
pub use validation::{ConfigError, Validatable};

// Re-export file utilities
pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    ConfigFileError,
};

/// Generate a JSON Schema for the `GridConfig` configuration format.
///
/// This schema documents all configuration options that can be set in
/// `.zem-grid.yaml` config files. It can be used by editors for
/// validation and autocompletion.
pub fn generate_json_schema() -> crate::error::Result<String> {
    let schema = schemars::schema_for!(GridConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}
