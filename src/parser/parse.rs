//! Flattening the breakdown tree into display rows.

use super::rows::{GridRow, ParsedGrid, RowData, RowKey, RowType};
use crate::error::{GridError, Result};
use crate::model::{
    shared_stats, BreakdownNode, BreakdownRoot, NodeMeta, RowEntry, StatsMap, StatsValue,
};
use crate::registry::GridColumn;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Turns a [`BreakdownRoot`] into [`ParsedGrid`] rows.
///
/// The parser keeps one display row per tree row across parses, so UI
/// state set on a row (collapse, selection keyed by [`RowKey`]) survives
/// incremental updates. Rows whose data disappeared are evicted on the
/// next parse; a new reload epoch drops the whole cache.
#[derive(Debug, Default)]
pub struct Parser {
    cache: HashMap<RowKey, Rc<GridRow>>,
    epoch: Option<u64>,
    /// Empty cells for every known column, cloned into breakdown rows.
    placeholder: StatsMap,
    collapse_new_rows: bool,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New rows with children start collapsed.
    #[must_use]
    pub fn with_collapsed_rows(mut self, collapsed: bool) -> Self {
        self.collapse_new_rows = collapsed;
        self
    }

    /// Set the columns breakdown rows get empty cells for.
    pub fn set_columns(&mut self, columns: &[GridColumn]) {
        self.placeholder = columns
            .iter()
            .map(|column| (column.field.clone(), StatsValue::empty()))
            .collect();
    }

    /// Number of cached display rows.
    #[must_use]
    pub fn cached_rows(&self) -> usize {
        self.cache.len()
    }

    /// Flatten the tree.
    ///
    /// Only the root (level 0) can be parsed.
    pub fn parse(&mut self, root: &BreakdownRoot) -> Result<ParsedGrid> {
        if root.level != 0 {
            return Err(GridError::validation(format!(
                "Parsing starts at the root (level 0), got level {}",
                root.level
            )));
        }
        if self.epoch != Some(root.epoch) {
            self.cache.clear();
            self.epoch = Some(root.epoch);
        }

        let Some(node) = root.breakdown.as_ref() else {
            self.cache.clear();
            return Ok(ParsedGrid::default());
        };

        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        self.parse_breakdown_node(None, node, &mut rows, &mut seen);

        let footer = root.stats.as_ref().map(|stats| {
            let key = RowKey::footer();
            seen.insert(key.clone());
            let data = RowData {
                stats: Rc::clone(stats),
                archived: false,
                entity: None,
                has_children: false,
                pagination: None,
                meta: root.meta,
            };
            self.cached_row(key, 0, None, false, true, data)
        });

        self.cache.retain(|key, _| seen.contains(key));
        tracing::debug!("Parsed {} rows ({} cached)", rows.len(), self.cache.len());
        Ok(ParsedGrid { rows, footer })
    }

    fn parse_breakdown_node(
        &mut self,
        parent: Option<&Rc<GridRow>>,
        node: &BreakdownNode,
        out: &mut Vec<Rc<GridRow>>,
        seen: &mut HashSet<RowKey>,
    ) {
        let parent_key = parent.map(|p| p.key.clone());
        let parent_open = parent.map_or(true, |p| p.visible.get() && !p.collapsed.get());
        let in_group = parent.is_some_and(|p| p.row_type() == RowType::Group || p.in_group);

        for entry in &node.rows {
            let row_type = if entry.is_group() {
                RowType::Group
            } else {
                RowType::Stats
            };
            let key = RowKey {
                node: node.uid,
                breakdown_id: entry.breakdown_id.clone(),
                row_type,
            };
            seen.insert(key.clone());
            let row = self.cached_row(
                key,
                entry.level,
                parent_key.clone(),
                in_group,
                parent_open,
                entry_data(entry),
            );
            out.push(Rc::clone(&row));

            if let Some(child) = entry.breakdown.as_deref() {
                self.parse_breakdown_node(Some(&row), child, out, seen);
            }
        }

        let pagination = node.pagination;
        if !node.replace_rows && (!pagination.complete || pagination.is_empty_result()) {
            let key = RowKey {
                node: node.uid,
                breakdown_id: node.breakdown_id.clone(),
                row_type: RowType::Breakdown,
            };
            seen.insert(key.clone());
            let stats = self
                .cache
                .get(&key)
                .map_or_else(|| shared_stats(self.placeholder.clone()), |row| row.stats());
            let data = RowData {
                stats,
                archived: false,
                entity: None,
                has_children: false,
                pagination: Some(pagination),
                meta: node.meta,
            };
            let row = self.cached_row(key, node.level, parent_key, in_group, parent_open, data);
            out.push(row);
        }
    }

    /// Reuse the cached row for `key` or create it.
    ///
    /// New rows are seeded visible unless their parent is collapsed or hidden.
    fn cached_row(
        &mut self,
        key: RowKey,
        level: usize,
        parent: Option<RowKey>,
        in_group: bool,
        visible: bool,
        data: RowData,
    ) -> Rc<GridRow> {
        if let Some(row) = self.cache.get(&key) {
            row.refresh(data);
            return Rc::clone(row);
        }
        let collapse = self.collapse_new_rows && data.has_children;
        let row = Rc::new(GridRow::new(key.clone(), level, parent, in_group, visible, data));
        row.collapsed.set(collapse);
        self.cache.insert(key, Rc::clone(&row));
        row
    }
}

fn entry_data(entry: &RowEntry) -> RowData {
    RowData {
        stats: Rc::clone(&entry.stats),
        archived: entry.archived,
        entity: entry.entity,
        has_children: entry.breakdown.is_some(),
        pagination: None,
        meta: NodeMeta::default(),
    }
}

// ============================================================================
// Collapse state
// ============================================================================

/// Collapse or expand a row and recompute the visibility of its
/// descendants. Returns whether the row was found.
pub fn set_collapsed(rows: &[Rc<GridRow>], key: &RowKey, collapsed: bool) -> bool {
    let Some(row) = rows.iter().find(|row| &row.key == key) else {
        return false;
    };
    row.collapsed.set(collapsed);
    update_visibility(rows);
    true
}

/// Recompute visibility from collapse state: a row is visible when its
/// parent is visible and not collapsed.
pub fn update_visibility(rows: &[Rc<GridRow>]) {
    let mut open: HashMap<&RowKey, bool> = HashMap::with_capacity(rows.len());
    for row in rows {
        let visible = row
            .parent
            .as_ref()
            .map_or(true, |parent| open.get(parent).copied().unwrap_or(true));
        row.visible.set(visible);
        if row.row_type() != RowType::Breakdown {
            open.insert(&row.key, visible && !row.collapsed.get());
        }
    }
}
