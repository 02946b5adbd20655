//! CLI command handlers.
//!
//! This module provides testable command handlers that are invoked by main.rs.
//! Each handler implements the logic for one `zem-grid` subcommand.

mod columns;
mod render;
mod show;

pub use columns::{run_columns, ColumnsOptions};
pub use render::{render_columns, render_grid, OutputFormat};
pub use show::{run_show, show_grid, ShowOptions};

use anyhow::{Context, Result};
use std::io::Write as _;
use std::path::Path;

/// Write command output to a file, or stdout when no file is given.
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    match output_file {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .context("failed to write to stdout")?;
            stdout.flush().context("failed to flush stdout")
        }
    }
}
