//! Default configurations and presets for zem-grid.
//!
//! Provides named presets for common use cases and default values.

use super::types::{DataConfig, EndpointConfig, GridBehaviorConfig, GridConfig};

/// Rows per page by tree level.
pub const DEFAULT_PAGE_SIZES: &[usize] = &[60, 4, 5, 7];

/// Initial sort order.
pub const DEFAULT_ORDER: &str = "-etfm_cost";

/// Default reporting window.
pub const DEFAULT_DATE_RANGE_DAYS: u64 = 30;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default retries for idempotent requests.
pub const DEFAULT_MAX_RETRIES: u8 = 2;

// ============================================================================
// Configuration Presets
// ============================================================================

/// Named configuration presets for common use cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Default balanced settings
    Default,
    /// Small pages, collapsed children: quick overviews
    Compact,
    /// Large pages for exploring deep breakdowns
    Deep,
}

impl ConfigPreset {
    /// Get the preset name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Compact => "compact",
            Self::Deep => "deep",
        }
    }

    /// Parse a preset from a string name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" | "balanced" => Some(Self::Default),
            "compact" | "small" => Some(Self::Compact),
            "deep" | "large" => Some(Self::Deep),
            _ => None,
        }
    }

    /// Get a description of this preset.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Default => "Balanced page sizes suitable for most grids",
            Self::Compact => "Small pages with collapsed child rows",
            Self::Deep => "Large pages for deep breakdown paths",
        }
    }

    /// Get all available presets.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Default, Self::Compact, Self::Deep]
    }
}

impl std::fmt::Display for ConfigPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Preset Implementations
// ============================================================================

impl GridConfig {
    /// Create a `GridConfig` from a named preset.
    #[must_use]
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Default => Self::default(),
            ConfigPreset::Compact => Self::compact_preset(),
            ConfigPreset::Deep => Self::deep_preset(),
        }
    }

    /// Compact preset.
    ///
    /// - Small pages at every level
    /// - Child rows start collapsed
    #[must_use]
    pub fn compact_preset() -> Self {
        Self {
            data: DataConfig {
                page_sizes: vec![20, 3, 3, 3],
                ..DataConfig::default()
            },
            endpoint: EndpointConfig::default(),
            grid: GridBehaviorConfig {
                collapse_new_rows: true,
                ..GridBehaviorConfig::default()
            },
            preferences_file: None,
        }
    }

    /// Deep preset.
    ///
    /// - Large pages at every level
    /// - Longer timeout for heavy breakdown queries
    #[must_use]
    pub fn deep_preset() -> Self {
        Self {
            data: DataConfig {
                page_sizes: vec![100, 20, 20, 20],
                ..DataConfig::default()
            },
            endpoint: EndpointConfig {
                timeout_secs: 120,
                ..EndpointConfig::default()
            },
            grid: GridBehaviorConfig::default(),
            preferences_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Validatable;

    #[test]
    fn test_preset_names() {
        for preset in ConfigPreset::all() {
            assert_eq!(ConfigPreset::from_name(preset.name()), Some(*preset));
        }
        assert_eq!(ConfigPreset::from_name("huge"), None);
    }

    #[test]
    fn test_presets_are_valid() {
        for preset in ConfigPreset::all() {
            let config = GridConfig::from_preset(*preset);
            assert!(config.is_valid(), "{preset}: {:?}", config.validate());
        }
    }

    #[test]
    fn test_compact_collapses_rows() {
        let config = GridConfig::from_preset(ConfigPreset::Compact);
        assert!(config.grid.collapse_new_rows);
        assert_eq!(config.page_size(1), 20);
    }
}
