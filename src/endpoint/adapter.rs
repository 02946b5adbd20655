//! Converts raw backend payloads into tree rows and patches.

use super::traits::{BackendApi, BreakdownEndpoint, EndpointResult};
use crate::model::{
    BackendBreakdown, BackendPatch, BackendQuery, BackendRow, Breakdown, BreakdownPage,
    BreakdownPatch, EditPayload, Entity, Metadata, PageRequest, RowEntry, RowPatch, RowRef,
    SaveRequest, StatsMap, StatsValue,
};
use crate::registry::ColumnRegistry;
use async_trait::async_trait;
use std::rc::Rc;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

/// Backend field carrying a row's display name.
pub const BREAKDOWN_NAME_FIELD: &str = "breakdown_name";

/// Adapts a [`BackendApi`] to the [`BreakdownEndpoint`] the data source uses.
pub struct EndpointAdapter<B> {
    backend: B,
    registry: Rc<ColumnRegistry>,
}

impl<B: BackendApi> EndpointAdapter<B> {
    /// Adapter resolving columns against the built-in catalogue.
    pub fn new(backend: B) -> Self {
        Self::with_registry(backend, Rc::new(ColumnRegistry::new()))
    }

    pub fn with_registry(backend: B, registry: Rc<ColumnRegistry>) -> Self {
        Self { backend, registry }
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait(?Send)]
impl<B: BackendApi> BreakdownEndpoint for EndpointAdapter<B> {
    async fn get_metadata(&self) -> EndpointResult<Metadata> {
        let raw = self.backend.fetch_metadata().await?;
        tracing::debug!(
            "Metadata from {}: level {}, {} capabilities",
            self.backend.name(),
            raw.level,
            raw.capabilities.len()
        );
        Ok(self.registry.metadata(raw))
    }

    async fn get_page(
        &self,
        request: &PageRequest,
        cancel: &CancellationToken,
    ) -> EndpointResult<Vec<BreakdownPage>> {
        let query = BackendQuery::from(request);
        let breakdowns = self.backend.fetch_breakdowns(&query, cancel).await?;
        Ok(breakdowns
            .into_iter()
            .map(|raw| convert_breakdown(raw, &request.breakdown, request.level))
            .collect())
    }

    async fn save(&self, row: &RowRef, request: &SaveRequest) -> EndpointResult<BreakdownPatch> {
        let patch = self.backend.save_stats(row, request).await?;
        Ok(convert_patch(patch))
    }

    async fn edit_row(&self, row: &RowRef) -> EndpointResult<EditPayload> {
        let data = self.backend.edit_row(row).await?;
        Ok(EditPayload {
            row: row.clone(),
            data,
        })
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert one backend page; `path` is the breakdown path up to `level`.
#[must_use]
pub fn convert_breakdown(raw: BackendBreakdown, path: &[Breakdown], level: usize) -> BreakdownPage {
    let rows = raw
        .rows
        .into_iter()
        .map(|row| convert_row(row, path, level))
        .collect();
    BreakdownPage {
        breakdown_id: raw.breakdown_id,
        level,
        offset: raw.pagination.offset,
        limit: raw.pagination.limit,
        count: raw.pagination.count,
        rows,
        totals: raw.totals.map(convert_values),
    }
}

/// Convert one backend row into a tree row.
#[must_use]
pub fn convert_row(row: BackendRow, path: &[Breakdown], level: usize) -> RowEntry {
    let stats = row_stats(&row);
    let entity = if row.group.is_some() {
        None
    } else {
        Entity::from_breakdown(path, level, &row.breakdown_id)
    };
    let mut entry = RowEntry::new(row.breakdown_id, level, stats);
    entry.archived = row.archived.unwrap_or(false);
    entry.entity = entity;
    entry.group = row.group;
    entry
}

/// Convert a save response into a patch.
#[must_use]
pub fn convert_patch(patch: BackendPatch) -> BreakdownPatch {
    BreakdownPatch {
        rows: patch
            .rows
            .into_iter()
            .map(|row| RowPatch {
                stats: row_stats(&row),
                archived: row.archived,
                breakdown_id: row.breakdown_id,
            })
            .collect(),
        totals: patch.totals.map(convert_values),
    }
}

/// Plain field values to cells.
#[must_use]
pub fn convert_values(values: IndexMap<String, serde_json::Value>) -> StatsMap {
    values
        .into_iter()
        .map(|(field, value)| (field, StatsValue::new(value)))
        .collect()
}

fn row_stats(row: &BackendRow) -> StatsMap {
    let mut stats: StatsMap = row
        .stats
        .iter()
        .filter(|(field, _)| field.as_str() != BREAKDOWN_NAME_FIELD)
        .map(|(field, value)| (field.clone(), StatsValue::new(value.clone())))
        .collect();

    if let Some(name) = row.stats.get(BREAKDOWN_NAME_FIELD) {
        let mut cell = StatsValue::new(name.clone());
        cell.url.clone_from(&row.url);
        stats.insert("name".to_string(), cell);
    }
    if let Some(url) = &row.url {
        stats
            .entry("url".to_string())
            .or_insert_with(|| StatsValue::new(url.clone()));
    }
    for (field, editable) in &row.editable_fields {
        let cell = stats.entry(field.clone()).or_default();
        cell.is_editable = Some(editable.enabled);
        cell.edit_message.clone_from(&editable.message);
    }
    for (field, status) in &row.goal_statuses {
        stats.entry(field.clone()).or_default().goal_status = Some(status.clone());
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackendPagination, EditableField, EntityType};
    use serde_json::json;

    fn backend_row(id: &str, fields: &[(&str, serde_json::Value)]) -> BackendRow {
        BackendRow {
            breakdown_id: id.into(),
            stats: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            ..BackendRow::default()
        }
    }

    #[test]
    fn test_row_name_and_entity() {
        let mut row = backend_row("3||33", &[(BREAKDOWN_NAME_FIELD, json!("Spring")), ("clicks", json!(4))]);
        row.url = Some("https://example.com".into());

        let entry = convert_row(row, &[Breakdown::Account, Breakdown::Campaign], 2);
        let stats = entry.stats.borrow();
        assert_eq!(stats["name"].display(), "Spring");
        assert_eq!(stats["name"].url.as_deref(), Some("https://example.com"));
        assert!(!stats.contains_key(BREAKDOWN_NAME_FIELD));
        assert_eq!(entry.entity.map(|e| e.entity_type), Some(EntityType::Campaign));
    }

    #[test]
    fn test_editable_fields_become_decorations() {
        let mut row = backend_row("1", &[("bid_cpc", json!(0.4))]);
        row.editable_fields.insert(
            "bid_cpc".into(),
            EditableField {
                enabled: false,
                message: Some("Autopilot".into()),
            },
        );
        let patch = convert_patch(BackendPatch {
            rows: vec![row],
            totals: None,
        });
        let cell = &patch.rows[0].stats["bid_cpc"];
        assert_eq!(cell.value, Some(json!(0.4)));
        assert_eq!(cell.is_editable, Some(false));
        assert_eq!(cell.edit_message.as_deref(), Some("Autopilot"));
    }

    #[test]
    fn test_breakdown_pagination() {
        let page = convert_breakdown(
            BackendBreakdown {
                breakdown_id: "3".into(),
                pagination: BackendPagination {
                    offset: 0,
                    limit: 2,
                    count: 5,
                },
                rows: vec![backend_row("3||31", &[]), backend_row("3||32", &[])],
                totals: None,
            },
            &[Breakdown::Account, Breakdown::Campaign],
            2,
        );
        assert_eq!(page.rows.len(), 2);
        assert!(!page.pagination().complete);
        assert_eq!(page.rows[1].level, 2);
    }
}
