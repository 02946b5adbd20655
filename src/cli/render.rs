//! Plain-text and JSON rendering of grids and column lists.

use crate::parser::{GridRow, ParsedGrid, RowType};
use crate::registry::GridColumn;
use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// Output format of the inspector commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Table,
    /// JSON document
    Json,
}

const NAME_HEADER: &str = "Name";

// ============================================================================
// Grid
// ============================================================================

#[derive(Serialize)]
struct RowOutput<'a> {
    id: &'a str,
    level: usize,
    #[serde(rename = "type")]
    row_type: RowType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    archived: bool,
    values: IndexMap<String, String>,
}

#[derive(Serialize)]
struct GridOutput<'a> {
    columns: Vec<&'a str>,
    rows: Vec<RowOutput<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    totals: Option<IndexMap<String, String>>,
}

/// Render the visible rows of a grid under `columns`.
pub fn render_grid(grid: &ParsedGrid, columns: &[GridColumn], format: OutputFormat) -> Result<String> {
    let columns: Vec<&GridColumn> = columns
        .iter()
        .filter(|c| c.is_renderable() && c.visible && c.field != "name")
        .collect();
    match format {
        OutputFormat::Table => Ok(grid_table(grid, &columns)),
        OutputFormat::Json => grid_json(grid, &columns),
    }
}

fn grid_table(grid: &ParsedGrid, columns: &[&GridColumn]) -> String {
    let mut table = vec![std::iter::once(NAME_HEADER.to_string())
        .chain(columns.iter().map(|c| c.name.clone()))
        .collect::<Vec<_>>()];

    for row in grid.visible_rows() {
        let mut line = vec![row_label(row)];
        if row.row_type() != RowType::Breakdown {
            line.extend(columns.iter().map(|c| row.cell(&c.field)));
        }
        table.push(line);
    }
    if let Some(footer) = &grid.footer {
        table.push(
            std::iter::once("Total".to_string())
                .chain(columns.iter().map(|c| {
                    if c.totals {
                        footer.cell(&c.field)
                    } else {
                        String::new()
                    }
                }))
                .collect(),
        );
    }
    format_table(&table)
}

fn row_label(row: &GridRow) -> String {
    let indent = "  ".repeat(row.level.saturating_sub(1));
    let data = row.data();
    match row.row_type() {
        RowType::Breakdown => {
            let text = if data.meta.error {
                "failed to load".to_string()
            } else if data.meta.loading {
                "loading...".to_string()
            } else {
                match data.pagination {
                    Some(p) if p.is_empty_result() => "no data".to_string(),
                    Some(p) => match p.count {
                        Some(count) => format!("load more ({} of {count})", p.limit),
                        None => format!("load more ({} loaded)", p.limit),
                    },
                    None => String::new(),
                }
            };
            format!("{indent}  [{text}]")
        }
        RowType::Stats | RowType::Group => {
            let marker = if !row.is_collapsible() {
                "  "
            } else if row.collapsed.get() {
                "+ "
            } else {
                "- "
            };
            let name = row.cell("name");
            let name = if name.is_empty() {
                row.breakdown_id().to_string()
            } else {
                name
            };
            let archived = if data.archived { " (archived)" } else { "" };
            format!("{indent}{marker}{name}{archived}")
        }
    }
}

fn grid_json(grid: &ParsedGrid, columns: &[&GridColumn]) -> Result<String> {
    let values = |row: &GridRow| -> IndexMap<String, String> {
        columns
            .iter()
            .map(|c| (c.field.clone(), row.cell(&c.field)))
            .filter(|(_, value)| !value.is_empty())
            .collect()
    };
    let output = GridOutput {
        columns: columns.iter().map(|c| c.field.as_str()).collect(),
        rows: grid
            .visible_rows()
            .filter(|row| row.row_type() != RowType::Breakdown)
            .map(|row| RowOutput {
                id: row.breakdown_id(),
                level: row.level,
                row_type: row.row_type(),
                archived: row.data().archived,
                values: values(row),
            })
            .collect(),
        totals: grid.footer.as_deref().map(values),
    };
    Ok(serde_json::to_string_pretty(&output)? + "\n")
}

// ============================================================================
// Columns
// ============================================================================

/// Render a resolved column list.
pub fn render_columns(columns: &[GridColumn], format: OutputFormat) -> Result<String> {
    let columns: Vec<&GridColumn> = columns.iter().filter(|c| c.is_renderable()).collect();
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&columns)? + "\n"),
        OutputFormat::Table => {
            let mut table = vec![["Field", "Name", "Category", "Visible", "Flags"]
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()];
            for column in columns {
                let flags: Vec<&str> = [
                    (column.permanent, "permanent"),
                    (column.editable, "editable"),
                    (!column.orderable, "unordered"),
                    (!column.totals, "no-totals"),
                    (column.primary_goal, "primary-goal"),
                ]
                .iter()
                .filter(|(set, _)| *set)
                .map(|(_, flag)| *flag)
                .collect();
                table.push(vec![
                    column.field.clone(),
                    column.name.clone(),
                    column
                        .subcategory
                        .clone()
                        .unwrap_or_else(|| column.category.label().to_string()),
                    if column.visible { "yes" } else { "no" }.to_string(),
                    flags.join(","),
                ]);
            }
            Ok(format_table(&table))
        }
    }
}

// ============================================================================
// Table layout
// ============================================================================

/// Left-align every cell to its column's display width.
fn format_table(table: &[Vec<String>]) -> String {
    let columns = table.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            table
                .iter()
                .filter_map(|line| line.get(i))
                .map(|cell| UnicodeWidthStr::width(cell.as_str()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for line in table {
        let mut text = String::new();
        for (i, cell) in line.iter().enumerate() {
            if i > 0 {
                text.push_str("  ");
            }
            text.push_str(cell);
            let padding = widths[i].saturating_sub(UnicodeWidthStr::width(cell.as_str()));
            text.extend(std::iter::repeat(' ').take(padding));
        }
        out.push_str(text.trim_end());
        out.push('\n');
    }
    out
}
