//! Configuration validation for zem-grid.
//!
//! Provides validation traits and implementations for all configuration types.

use super::types::{DataConfig, EndpointConfig, GridBehaviorConfig, GridConfig, RouteConfig};

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validate into a single error listing every problem.
    fn ensure_valid(&self) -> crate::error::Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            return Ok(());
        }
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(crate::error::GridError::config(joined))
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for GridConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.data.validate());
        errors.extend(self.endpoint.validate());
        errors.extend(self.grid.validate());

        if let Some(ref path) = self.preferences_file {
            if path.is_dir() {
                errors.push(ConfigError::new(
                    "preferences_file",
                    format!("Expected a file, found directory: {}", path.display()),
                ));
            }
        }

        errors
    }
}

impl Validatable for DataConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.page_sizes.is_empty() {
            errors.push(ConfigError::new("data.page_sizes", "At least one page size is required"));
        }
        if let Some(level) = self.page_sizes.iter().position(|&size| size == 0) {
            errors.push(ConfigError::new(
                "data.page_sizes",
                format!("Page size for level {} must be at least 1", level + 1),
            ));
        }

        let field = self.default_order.trim().trim_start_matches('-');
        if field.is_empty() {
            errors.push(ConfigError::new("data.default_order", "Order field must not be empty"));
        }

        if self.date_range_days == 0 {
            errors.push(ConfigError::new(
                "data.date_range_days",
                "Date range must cover at least one day",
            ));
        }

        errors
    }
}

impl Validatable for EndpointConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            errors.push(ConfigError::new(
                "endpoint.base_url",
                format!("Expected an http(s) URL, got '{}'", self.base_url),
            ));
        }

        if self.timeout_secs == 0 {
            errors.push(ConfigError::new(
                "endpoint.timeout_secs",
                "Timeout must be at least 1 second",
            ));
        }

        errors.extend(self.routes.validate());
        errors
    }
}

impl Validatable for RouteConfig {
    fn validate(&self) -> Vec<ConfigError> {
        [
            ("endpoint.routes.metadata", &self.metadata),
            ("endpoint.routes.breakdown", &self.breakdown),
            ("endpoint.routes.save", &self.save),
            ("endpoint.routes.edit", &self.edit),
        ]
        .into_iter()
        .filter(|(_, route)| !route.starts_with('/'))
        .map(|(field, route)| ConfigError::new(field, format!("Route must start with '/': {route}")))
        .collect()
    }
}

impl Validatable for GridBehaviorConfig {
    fn validate(&self) -> Vec<ConfigError> {
        // GridBehaviorConfig contains only boolean flags that don't need validation
        Vec::new()
    }
}
