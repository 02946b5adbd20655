//! **A hierarchical breakdown data source and grid pipeline for campaign analytics.**
//!
//! `zem-grid` loads statistics broken down along a path of dimensions
//! (campaign → country → day, say) into a tree, page by page, and flattens
//! that tree into display rows for a grid. Every level is paginated, stale
//! responses are cancelled, and saved cells are merged back in place.
//!
//! ## Core Concepts & Modules
//!
//! - **[`datasource`]**: [`DataSource`] owns the breakdown tree. It issues page
//!   requests level by level, cancels superseded ones, merges responses and
//!   notifies listeners.
//! - **[`parser`]**: [`Parser`] turns the tree into [`ParsedGrid`] rows, keeping
//!   row identity (and with it collapse state) stable across incremental loads.
//! - **[`grid`]**: [`GridApi`] ties the two together with column visibility,
//!   selection, a save queue and persisted preferences.
//! - **[`registry`]**: static column and breakdown rules per level.
//! - **[`endpoint`]**: the backend seam. [`FixtureBackend`] serves a JSON
//!   dataset, `HttpBackend` talks to a real service (feature `http`).
//! - **[`model`]**, **[`config`]**, **[`error`]**: shared types.
//!
//! ## Getting Started
//!
//! ```no_run
//! use std::rc::Rc;
//! use zem_grid::{EndpointAdapter, FixtureBackend, FixtureDataset, GridApi, GridConfig};
//!
//! # async fn run() -> zem_grid::Result<()> {
//! let backend = FixtureBackend::new(FixtureDataset::sample()?);
//! let grid = GridApi::new(Rc::new(EndpointAdapter::new(backend)), &GridConfig::default());
//!
//! grid.load_data().await?;
//! for row in grid.rows().visible_rows() {
//!     println!("{}{}", "  ".repeat(row.level), row.cell("name"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! All handles are single-threaded (`Rc`), so drive them from a current-thread
//! runtime or a `LocalSet`.
//!
//! ## Feature Flags
//!
//! - `http` (default): the reqwest-based `HttpBackend`.

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
// Pedantic lints: allow categories that are design choices for this codebase
#![allow(
    // Doc completeness: # Errors / # Panics sections are aspirational
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    // Configuration structs legitimately use many bools for toggle flags
    clippy::struct_excessive_bools,
    // Tree merges read best as one function
    clippy::too_many_lines,
    // Variable names like `old`/`new` are clear in context
    clippy::similar_names
)]

pub mod cli;
pub mod config;
pub mod datasource;
pub mod endpoint;
pub mod error;
pub mod grid;
pub mod model;
pub mod parser;
pub mod registry;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigPreset, GridConfig, GridConfigBuilder, Validatable};
pub use datasource::{DataSource, DataSourceListener};
#[cfg(feature = "http")]
pub use endpoint::HttpBackend;
pub use endpoint::{
    BackendApi, BreakdownEndpoint, EndpointAdapter, FixtureBackend, FixtureDataset,
};
pub use error::{ErrorContext, GridError, OptionContext, Result};
pub use grid::{GridApi, GridListener, Selection};
pub use model::{Breakdown, BreakdownRoot, Level, Order};
pub use parser::{GridRow, ParsedGrid, Parser, RowKey, RowType};
pub use registry::{ColumnRegistry, GridColumn};
