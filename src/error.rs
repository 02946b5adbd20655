//! Unified error types for zem-grid.
//!
//! Every variant is `Clone`: fetch futures are shared between the data source
//! and its callers, so their error has to be handed to each of them.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for zem-grid operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum GridError {
    /// Loading grid metadata failed
    #[error("Failed to load metadata: {context}")]
    MetadataFetch {
        context: String,
        #[source]
        source: EndpointErrorKind,
    },

    /// Fetching a breakdown page failed
    #[error("Failed to fetch breakdown page: {context}")]
    PageFetch {
        context: String,
        #[source]
        source: EndpointErrorKind,
    },

    /// The request was cancelled before it settled
    #[error("Request aborted")]
    Aborted,

    /// A save is already running on this data source
    #[error("Another save is already in progress")]
    SaveInProgress,

    /// The backend refused the value; the payload is passed through untouched
    #[error("Save rejected by backend")]
    SaveRejected { payload: serde_json::Value },

    /// Saving failed for a reason other than validation
    #[error("Save failed: {context}")]
    Save {
        context: String,
        #[source]
        source: EndpointErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Malformed input data (fixtures, config files, payloads)
    #[error("Failed to parse {context}")]
    Parse {
        context: String,
        #[source]
        source: ParseErrorKind,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Failure reported by a breakdown endpoint.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EndpointErrorKind {
    #[error("request aborted")]
    Aborted,

    #[error("network error: {0}")]
    Network(String),

    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Backend-side validation failure carrying the backend's payload.
    #[error("rejected by backend")]
    Rejected(serde_json::Value),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation not supported by {0}")]
    Unsupported(String),
}

/// Specific parse error kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(String),

    #[error("unknown breakdown '{0}'")]
    UnknownBreakdown(String),

    #[error("unknown level '{0}'")]
    UnknownLevel(String),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for zem-grid operations
pub type Result<T> = std::result::Result<T, GridError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl GridError {
    /// Create a metadata error, folding aborts into [`GridError::Aborted`]
    pub fn metadata(context: impl Into<String>, source: EndpointErrorKind) -> Self {
        match source {
            EndpointErrorKind::Aborted => Self::Aborted,
            source => Self::MetadataFetch {
                context: context.into(),
                source,
            },
        }
    }

    /// Create a page error, folding aborts into [`GridError::Aborted`]
    pub fn page(context: impl Into<String>, source: EndpointErrorKind) -> Self {
        match source {
            EndpointErrorKind::Aborted => Self::Aborted,
            source => Self::PageFetch {
                context: context.into(),
                source,
            },
        }
    }

    /// Create a save error; backend rejections keep their payload
    pub fn save(context: impl Into<String>, source: EndpointErrorKind) -> Self {
        match source {
            EndpointErrorKind::Rejected(payload) => Self::SaveRejected { payload },
            EndpointErrorKind::Aborted => Self::Aborted,
            source => Self::Save {
                context: context.into(),
                source,
            },
        }
    }

    /// Create a parse error with context
    pub fn parse(context: impl Into<String>, source: ParseErrorKind) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let message = format!("{source}");
        Self::Io {
            path: Some(path.into()),
            message,
            source: Arc::new(source),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the error only reports a cancellation.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for GridError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: Arc::new(err),
        }
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse("JSON document", ParseErrorKind::InvalidJson(err.to_string()))
    }
}

impl From<serde_yaml::Error> for GridError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::parse("YAML document", ParseErrorKind::InvalidYaml(err.to_string()))
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// The context string is prepended to the error's existing context, so a
/// failure deep in a fetch chain reads `"outer: inner: cause"`.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, only evaluated on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<GridError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: GridError, new_ctx: &str) -> GridError {
    match err {
        GridError::MetadataFetch { context, source } => GridError::MetadataFetch {
            context: chain_context(new_ctx, &context),
            source,
        },
        GridError::PageFetch { context, source } => GridError::PageFetch {
            context: chain_context(new_ctx, &context),
            source,
        },
        GridError::Save { context, source } => GridError::Save {
            context: chain_context(new_ctx, &context),
            source,
        },
        GridError::Parse { context, source } => GridError::Parse {
            context: chain_context(new_ctx, &context),
            source,
        },
        GridError::Io {
            path,
            message,
            source,
        } => GridError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        GridError::Config(msg) => GridError::Config(chain_context(new_ctx, &msg)),
        GridError::Validation(msg) => GridError::Validation(chain_context(new_ctx, &msg)),
        // Cancellations, single-flight refusals and rejections stay matchable as-is.
        other @ (GridError::Aborted
        | GridError::SaveInProgress
        | GridError::SaveRejected { .. }) => other,
    }
}

/// Chain two context strings together.
///
/// If the existing context is empty, returns just the new context.
/// Otherwise, returns "`new_context`: `existing_context`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to an error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;

    /// Convert None to an error with context from a closure.
    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| GridError::Validation(context.into()))
    }

    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.ok_or_else(|| GridError::Validation(f().into()))
    }
}
