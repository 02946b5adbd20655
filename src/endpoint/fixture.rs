//! In-memory backend serving a JSON dataset.
//!
//! A dataset lists every row of every breakdown path it supports. Each row
//! carries the path it belongs to and a composite breakdown id; the parent
//! of a row is the id minus its last segment.
//!
//! ```json
//! {
//!   "metadata": {"level": "accounts", "id": 3},
//!   "totals": {"clicks": 30},
//!   "rows": [
//!     {"path": ["campaign"], "breakdown_id": "33", "breakdown_name": "Spring", "clicks": 20},
//!     {"path": ["campaign", "country"], "breakdown_id": "33||US", "clicks": 12}
//!   ]
//! }
//! ```

use super::traits::{BackendApi, EndpointResult};
use crate::error::{ErrorContext, EndpointErrorKind, Result};
use crate::model::{
    parent_id, BackendBreakdown, BackendMetadata, BackendPagination, BackendPatch, BackendQuery,
    BackendRow, Breakdown, GridFilters, Order,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRow {
    pub path: Vec<Breakdown>,
    #[serde(flatten)]
    pub row: BackendRow,
}

/// A complete fixture dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDataset {
    pub metadata: BackendMetadata,
    #[serde(default)]
    pub totals: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub rows: Vec<FixtureRow>,
}

/// Small built-in dataset: one campaign with three ad groups.
const SAMPLE_DATASET: &str = r#"{
  "metadata": {"level": "campaigns", "id": 7, "capabilities": ["can_view_platform_cost"]},
  "totals": {"clicks": 1250, "impressions": 98000, "etfm_cost": 412.5, "visits": 990},
  "rows": [
    {"path": ["ad_group"], "breakdown_id": "71", "breakdown_name": "Prospecting", "clicks": 800, "impressions": 61000, "etfm_cost": 260.0, "visits": 640},
    {"path": ["ad_group"], "breakdown_id": "72", "breakdown_name": "Retargeting", "clicks": 420, "impressions": 33000, "etfm_cost": 140.5, "visits": 330},
    {"path": ["ad_group"], "breakdown_id": "73", "breakdown_name": "Old Test", "clicks": 30, "impressions": 4000, "etfm_cost": 12.0, "visits": 20, "archived": true},
    {"path": ["ad_group", "country"], "breakdown_id": "71||US", "breakdown_name": "United States", "clicks": 500, "impressions": 40000, "etfm_cost": 170.0},
    {"path": ["ad_group", "country"], "breakdown_id": "71||DE", "breakdown_name": "Germany", "clicks": 300, "impressions": 21000, "etfm_cost": 90.0},
    {"path": ["ad_group", "country"], "breakdown_id": "72||US", "breakdown_name": "United States", "clicks": 420, "impressions": 33000, "etfm_cost": 140.5},
    {"path": ["ad_group", "day"], "breakdown_id": "71||2026-10-01", "breakdown_name": "2026-10-01", "clicks": 410},
    {"path": ["ad_group", "day"], "breakdown_id": "71||2026-10-02", "breakdown_name": "2026-10-02", "clicks": 390},
    {"path": ["source"], "breakdown_id": "b1_outbrain", "breakdown_name": "Outbrain", "clicks": 700, "daily_budget": 50.0,
     "editable_fields": {"daily_budget": {"enabled": true}}},
    {"path": ["source"], "breakdown_id": "b2_yahoo", "breakdown_name": "Yahoo", "clicks": 550, "daily_budget": 20.0,
     "editable_fields": {"daily_budget": {"enabled": false, "message": "Source is paused"}}}
  ]
}"#;

impl FixtureDataset {
    /// The built-in sample dataset.
    pub fn sample() -> Result<Self> {
        Self::from_json(SAMPLE_DATASET)
    }

    /// Parse a dataset from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("fixture dataset")
    }

    /// Load a dataset from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::GridError::io(path, e))?;
        Self::from_json(&content).with_context(|| format!("loading {}", path.display()))
    }
}

/// [`BackendApi`] over a [`FixtureDataset`].
///
/// Saves write through to the dataset. Every query is recorded so tests can
/// assert on the fetch sequence.
pub struct FixtureBackend {
    dataset: RefCell<FixtureDataset>,
    latency: Option<Duration>,
    queries: RefCell<Vec<BackendQuery>>,
    saves: Cell<usize>,
}

impl FixtureBackend {
    #[must_use]
    pub fn new(dataset: FixtureDataset) -> Self {
        Self {
            dataset: RefCell::new(dataset),
            latency: None,
            queries: RefCell::new(Vec::new()),
            saves: Cell::new(0),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        FixtureDataset::from_path(path).map(Self::new)
    }

    /// Delay every breakdown fetch, e.g. to exercise cancellation.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queries received so far, oldest first.
    #[must_use]
    pub fn queries(&self) -> Vec<BackendQuery> {
        self.queries.borrow().clone()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    fn page_for(&self, query: &BackendQuery, parent: &str) -> BackendBreakdown {
        let dataset = self.dataset.borrow();
        let mut rows: Vec<&FixtureRow> = dataset
            .rows
            .iter()
            .filter(|r| r.path == query.breakdown && parent_id(&r.row.breakdown_id) == parent)
            .filter(|r| passes_filters(&r.row, &query.filters))
            .collect();
        rows.sort_by(|a, b| compare_rows(&a.row, &b.row, &query.order));

        let count = rows.len();
        let page = rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|r| r.row.clone())
            .collect();
        let totals = (query.depth() == 1 && query.offset == 0).then(|| dataset.totals.clone());

        BackendBreakdown {
            breakdown_id: parent.to_string(),
            pagination: BackendPagination {
                offset: query.offset,
                limit: query.limit,
                count,
            },
            rows: page,
            totals,
        }
    }
}

#[async_trait(?Send)]
impl BackendApi for FixtureBackend {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_metadata(&self) -> EndpointResult<BackendMetadata> {
        Ok(self.dataset.borrow().metadata.clone())
    }

    async fn fetch_breakdowns(
        &self,
        query: &BackendQuery,
        cancel: &CancellationToken,
    ) -> EndpointResult<Vec<BackendBreakdown>> {
        self.queries.borrow_mut().push(query.clone());
        match self.latency {
            Some(latency) => {
                tokio::select! {
                    () = cancel.cancelled() => return Err(EndpointErrorKind::Aborted),
                    () = tokio::time::sleep(latency) => {}
                }
            }
            None => tokio::task::yield_now().await,
        }
        if cancel.is_cancelled() {
            return Err(EndpointErrorKind::Aborted);
        }

        let pages = if query.parents.is_empty() {
            vec![self.page_for(query, "")]
        } else {
            query
                .parents
                .iter()
                .map(|parent| self.page_for(query, parent))
                .collect()
        };
        Ok(pages)
    }

    async fn save_stats(
        &self,
        row: &crate::model::RowRef,
        request: &crate::model::SaveRequest,
    ) -> EndpointResult<BackendPatch> {
        tokio::task::yield_now().await;
        self.saves.set(self.saves.get() + 1);

        let mut dataset = self.dataset.borrow_mut();
        let target = dataset
            .rows
            .iter_mut()
            .find(|r| r.row.breakdown_id == row.breakdown_id)
            .ok_or_else(|| EndpointErrorKind::NotFound(row.breakdown_id.clone()))?;

        let mut errors = serde_json::Map::new();
        for field in request.settings.keys() {
            if let Some(editable) = target.row.editable_fields.get(field) {
                if !editable.enabled {
                    let message = editable
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("{field} is not editable"));
                    errors.insert(field.clone(), serde_json::json!([message]));
                }
            }
        }
        if !errors.is_empty() {
            return Err(EndpointErrorKind::Rejected(serde_json::json!({ "errors": errors })));
        }

        for (field, value) in &request.settings {
            target.row.stats.insert(field.clone(), value.clone());
        }
        let mut refreshed = target.row.clone();
        refreshed
            .stats
            .retain(|field, _| request.settings.contains_key(field));
        Ok(BackendPatch {
            rows: vec![refreshed],
            totals: None,
        })
    }

    async fn edit_row(&self, row: &crate::model::RowRef) -> EndpointResult<serde_json::Value> {
        let dataset = self.dataset.borrow();
        let found = dataset
            .rows
            .iter()
            .find(|r| r.row.breakdown_id == row.breakdown_id)
            .ok_or_else(|| EndpointErrorKind::NotFound(row.breakdown_id.clone()))?;
        serde_json::to_value(found).map_err(|e| EndpointErrorKind::InvalidResponse(e.to_string()))
    }
}

fn passes_filters(row: &BackendRow, filters: &GridFilters) -> bool {
    filters.show_archived || !row.archived.unwrap_or(false)
}

/// Numbers compare numerically, everything else by display text; missing
/// values sort last in either direction.
fn compare_rows(a: &BackendRow, b: &BackendRow, order: &Order) -> Ordering {
    let field = if order.field == "name" {
        super::adapter::BREAKDOWN_NAME_FIELD
    } else {
        order.field.as_str()
    };
    match (a.stats.get(field), b.stats.get(field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ordering = match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => x.to_string().cmp(&y.to_string()),
            };
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}
