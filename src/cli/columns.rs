//! Columns command handler.
//!
//! Resolves the column set of a level and breakdown path without a backend.

use super::render::{render_columns, OutputFormat};
use super::write_output;
use crate::model::{Breakdown, Level};
use crate::registry::ColumnRegistry;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Options of the `columns` command.
#[derive(Debug, Clone)]
pub struct ColumnsOptions {
    pub level: Level,
    /// Breakdown path; the level's default base when empty
    pub path: Vec<Breakdown>,
    pub capabilities: Vec<String>,
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
}

/// Run the columns command
#[allow(clippy::needless_pass_by_value)]
pub fn run_columns(options: ColumnsOptions) -> Result<()> {
    let registry = ColumnRegistry::new();
    let path = if options.path.is_empty() {
        vec![options.level.child_breakdown()]
    } else {
        options.path.clone()
    };
    let groups = registry.breakdown_groups(options.level);
    if let Some(unsupported) = path.iter().find(|b| !groups.contains(**b)) {
        tracing::warn!(
            "Breakdown '{}' is not offered at level {}",
            unsupported.name(),
            options.level
        );
    }

    let capabilities: BTreeSet<String> = options.capabilities.iter().cloned().collect();
    let columns = registry.resolve_columns(options.level, &path, &capabilities);
    tracing::debug!(
        "Resolved {} columns for {} / {:?}",
        columns.len(),
        options.level,
        path
    );
    let text = render_columns(&columns, options.format)?;
    write_output(&text, options.output_file.as_deref())
}
