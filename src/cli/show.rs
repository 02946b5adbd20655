//! Show command handler.
//!
//! Loads a grid from a fixture dataset (or an HTTP backend) and prints the
//! flattened rows.

use super::render::{render_grid, OutputFormat};
use super::write_output;
use crate::config::GridConfig;
use crate::endpoint::{BreakdownEndpoint, EndpointAdapter, FixtureBackend, FixtureDataset};
use crate::grid::GridApi;
use crate::model::{Breakdown, Level, Order};
use crate::parser::RowType;
use crate::registry::ColumnRegistry;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::rc::Rc;

/// Options of the `show` command.
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    /// Fixture dataset; the built-in sample when neither this nor `url` is set
    pub fixture: Option<PathBuf>,
    /// Backend base URL
    pub url: Option<String>,
    /// Level and entity id queried on the backend
    pub level: Option<Level>,
    pub entity_id: Option<u64>,
    /// Breakdown path; the level default when empty
    pub path: Vec<Breakdown>,
    pub order: Option<Order>,
    pub show_archived: bool,
    /// "Load more" rounds applied to every incomplete node
    pub more: usize,
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
}

/// Run the show command on a fresh current-thread runtime.
pub fn run_show(options: ShowOptions, config: GridConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let text = runtime.block_on(show_grid(&options, config))?;
    write_output(&text, options.output_file.as_deref())
}

/// Load the grid described by `options` and render it.
pub async fn show_grid(options: &ShowOptions, mut config: GridConfig) -> Result<String> {
    if options.show_archived {
        config.data.show_archived = true;
    }
    let registry = Rc::new(ColumnRegistry::new());
    let endpoint = build_endpoint(options, &config, &registry)?;
    let grid = GridApi::with_registry(endpoint, &config, registry);

    let metadata = grid.load_metadata(false).await?;
    tracing::debug!("Showing {} grid", metadata.level);
    if !options.path.is_empty() {
        grid.set_breakdown(options.path.clone(), false).await?;
    }
    // Not persisted: a one-off order should not replace the stored one.
    if let Some(order) = &options.order {
        grid.data_source().set_order(order.clone(), false).await?;
    }
    grid.load_data().await?;

    for round in 0..options.more {
        let pending: Vec<String> = grid
            .rows()
            .rows
            .iter()
            .filter(|row| row.row_type() == RowType::Breakdown)
            .filter(|row| row.data().pagination.is_some_and(|p| !p.complete))
            .map(|row| row.breakdown_id().to_string())
            .collect();
        if pending.is_empty() {
            break;
        }
        tracing::debug!("Load more round {}: {} nodes", round + 1, pending.len());
        for id in pending {
            grid.load_more(&id, None).await?;
        }
    }

    render_grid(&grid.rows(), &grid.columns(), options.format)
}

fn build_endpoint(
    options: &ShowOptions,
    config: &GridConfig,
    registry: &Rc<ColumnRegistry>,
) -> Result<Rc<dyn BreakdownEndpoint>> {
    if let Some(url) = &options.url {
        return http_endpoint(url, options, config, registry);
    }
    let backend = match &options.fixture {
        Some(path) => FixtureBackend::from_path(path)?,
        None => FixtureBackend::new(FixtureDataset::sample()?),
    };
    Ok(Rc::new(EndpointAdapter::with_registry(backend, Rc::clone(registry))))
}

#[cfg(feature = "http")]
fn http_endpoint(
    url: &str,
    options: &ShowOptions,
    config: &GridConfig,
    registry: &Rc<ColumnRegistry>,
) -> Result<Rc<dyn BreakdownEndpoint>> {
    let mut endpoint = config.endpoint.clone();
    endpoint.base_url = url.to_string();
    let backend = crate::endpoint::HttpBackend::new(
        &endpoint,
        options.level.unwrap_or(Level::AllAccounts),
        options.entity_id,
    )?;
    Ok(Rc::new(EndpointAdapter::with_registry(backend, Rc::clone(registry))))
}

#[cfg(not(feature = "http"))]
fn http_endpoint(
    _url: &str,
    _options: &ShowOptions,
    _config: &GridConfig,
    _registry: &Rc<ColumnRegistry>,
) -> Result<Rc<dyn BreakdownEndpoint>> {
    anyhow::bail!("zem-grid was built without the `http` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_show_sample_grid() {
        let options = ShowOptions {
            path: vec![Breakdown::AdGroup, Breakdown::Country],
            ..ShowOptions::default()
        };
        let text = show_grid(&options, GridConfig::default()).await.unwrap();
        assert!(text.starts_with("Name"));
        assert!(text.contains("Prospecting"));
        assert!(text.contains("Germany"));
        assert!(text.contains("Total"));
        assert!(!text.contains("Old Test"));
    }

    #[tokio::test]
    async fn test_show_archived_rows() {
        let options = ShowOptions {
            show_archived: true,
            format: OutputFormat::Json,
            ..ShowOptions::default()
        };
        let text = show_grid(&options, GridConfig::default()).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let ids: Vec<&str> = json["rows"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|row| row["id"].as_str())
            .collect();
        assert!(ids.contains(&"73"));
    }
}
