//! Page and patch payloads.
//!
//! `Backend*` types mirror what a backend sends over the wire; the adapter
//! turns them into [`BreakdownPage`] and [`BreakdownPatch`], the shapes the
//! data source merges into its tree.

use super::dimensions::{Breakdown, Level};
use super::goals::{CampaignGoal, ConversionGoal, Pixel};
use super::query::{DateRange, GridFilters, Order};
use super::stats::StatsMap;
use super::tree::{Pagination, RowEntry, RowGroup};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Internal pages
// ============================================================================

/// One page of rows for one parent node.
#[derive(Debug, Clone)]
pub struct BreakdownPage {
    /// Id of the node the rows belong to (the parent row's id).
    pub breakdown_id: String,
    pub level: usize,
    pub offset: usize,
    pub limit: usize,
    pub count: usize,
    pub rows: Vec<RowEntry>,
    /// Aggregates; only sent with the first page of level 1.
    pub totals: Option<StatsMap>,
}

impl BreakdownPage {
    #[must_use]
    pub const fn pagination(&self) -> Pagination {
        Pagination::from_response(self.offset, self.limit, self.count)
    }

    /// Whether this page resets the whole tree.
    #[must_use]
    pub const fn is_base_reset(&self) -> bool {
        self.level == 1 && self.offset == 0
    }
}

/// Partial update for one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPatch {
    pub breakdown_id: String,
    pub stats: StatsMap,
    pub archived: Option<bool>,
}

/// Partial update for rows and totals, from a save or a server push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakdownPatch {
    pub rows: Vec<RowPatch>,
    pub totals: Option<StatsMap>,
}

impl BreakdownPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.totals.is_none()
    }
}

// ============================================================================
// Requests
// ============================================================================

/// One combined fetch for every parent at a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub level: usize,
    pub offset: usize,
    pub limit: usize,
    /// Breakdown path truncated to `level`.
    pub breakdown: Vec<Breakdown>,
    /// Ids of the nodes being filled; empty for level 1.
    pub parents: Vec<String>,
    pub filters: GridFilters,
    pub order: Order,
    pub date_range: DateRange,
}

/// Settings to persist for one row plus the grid state to refresh against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub settings: IndexMap<String, serde_json::Value>,
    pub config: SaveContext,
}

/// Grid state sent along with a save so the backend can return fresh stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveContext {
    pub level: usize,
    pub breakdown: Vec<Breakdown>,
    pub date_range: DateRange,
    pub filters: GridFilters,
}

/// Identifies the row being saved or edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRef {
    pub breakdown_id: String,
    pub level: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<super::dimensions::Entity>,
}

impl From<&RowEntry> for RowRef {
    fn from(row: &RowEntry) -> Self {
        Self {
            breakdown_id: row.breakdown_id.clone(),
            level: row.level,
            entity: row.entity,
        }
    }
}

/// Whatever an editor flow needs to open for a row; opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditPayload {
    pub row: RowRef,
    pub data: serde_json::Value,
}

// ============================================================================
// Backend payloads
// ============================================================================

/// Pagination as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendPagination {
    pub offset: usize,
    pub limit: usize,
    pub count: usize,
}

/// Editability of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableField {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One row as sent by the backend: flat field values plus decorations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendRow {
    pub breakdown_id: String,
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<RowGroup>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub editable_fields: IndexMap<String, EditableField>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub goal_statuses: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub stats: IndexMap<String, serde_json::Value>,
}

/// One page for one parent as sent by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendBreakdown {
    #[serde(default)]
    pub breakdown_id: String,
    pub pagination: BackendPagination,
    #[serde(default)]
    pub rows: Vec<BackendRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<IndexMap<String, serde_json::Value>>,
}

/// Query sent to a backend for one combined page fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendQuery {
    pub breakdown: Vec<Breakdown>,
    pub parents: Vec<String>,
    pub offset: usize,
    pub limit: usize,
    pub order: Order,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub filters: GridFilters,
}

impl BackendQuery {
    /// Depth of the requested rows.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.breakdown.len()
    }
}

impl From<&PageRequest> for BackendQuery {
    fn from(request: &PageRequest) -> Self {
        Self {
            breakdown: request.breakdown.clone(),
            parents: request.parents.clone(),
            offset: request.offset,
            limit: request.limit,
            order: request.order.clone(),
            start_date: request.date_range.start,
            end_date: request.date_range.end,
            filters: request.filters.clone(),
        }
    }
}

/// Rows refreshed by a save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendPatch {
    #[serde(default)]
    pub rows: Vec<BackendRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<IndexMap<String, serde_json::Value>>,
}

/// Backend description of the grid's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMetadata {
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub campaign_goals: Vec<CampaignGoal>,
    #[serde(default)]
    pub conversion_goals: Vec<ConversionGoal>,
    #[serde(default)]
    pub pixels: Vec<Pixel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backend_row_flattens_stats() {
        let row: BackendRow = serde_json::from_value(json!({
            "breakdown_id": "3||33",
            "archived": true,
            "clicks": 10,
            "name": "Campaign 33",
            "editable_fields": {"bid_cpc": {"enabled": false, "message": "Locked"}}
        }))
        .unwrap();

        assert_eq!(row.breakdown_id, "3||33");
        assert_eq!(row.archived, Some(true));
        assert_eq!(row.stats.get("clicks"), Some(&json!(10)));
        assert!(!row.stats.contains_key("editable_fields"));
        assert!(!row.editable_fields["bid_cpc"].enabled);
    }

    #[test]
    fn test_page_reset_detection() {
        let page = BreakdownPage {
            breakdown_id: String::new(),
            level: 1,
            offset: 0,
            limit: 2,
            count: 5,
            rows: Vec::new(),
            totals: None,
        };
        assert!(page.is_base_reset());
        assert!(!page.pagination().complete);
    }
}
