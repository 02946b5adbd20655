//! Display rows produced by the parser.

use crate::model::{Entity, NodeMeta, NodeUid, Pagination, SharedStats};
use serde::Serialize;
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

/// Kind of a display row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowType {
    /// A data row.
    Stats,
    /// A synthetic aggregate of some siblings.
    Group,
    /// "Load more" / "no data" affordance closing a node.
    Breakdown,
}

/// Stable identity of a display row.
///
/// Rows are keyed by the node they belong to and their breakdown id, so a
/// node that is replaced (full reload, changed breakdown) yields new rows
/// while incremental merges keep the old ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub node: NodeUid,
    pub breakdown_id: String,
    pub row_type: RowType,
}

impl RowKey {
    /// Key of the footer built from the root totals.
    #[must_use]
    pub const fn footer() -> Self {
        Self {
            node: 0,
            breakdown_id: String::new(),
            row_type: RowType::Stats,
        }
    }
}

/// Data a display row mirrors from the tree; refreshed on every parse.
#[derive(Debug, Clone)]
pub struct RowData {
    pub stats: SharedStats,
    pub archived: bool,
    pub entity: Option<Entity>,
    /// Whether the row owns a child node.
    pub has_children: bool,
    /// Pagination and flags of the node a breakdown row closes.
    pub pagination: Option<Pagination>,
    pub meta: NodeMeta,
}

/// One row of the flattened grid.
///
/// `collapsed` and `visible` are UI state that survives re-parses.
#[derive(Debug)]
pub struct GridRow {
    pub key: RowKey,
    pub level: usize,
    pub parent: Option<RowKey>,
    pub in_group: bool,
    pub collapsed: Cell<bool>,
    pub visible: Cell<bool>,
    data: RefCell<RowData>,
}

impl GridRow {
    pub(crate) fn new(
        key: RowKey,
        level: usize,
        parent: Option<RowKey>,
        in_group: bool,
        visible: bool,
        data: RowData,
    ) -> Self {
        Self {
            key,
            level,
            parent,
            in_group,
            collapsed: Cell::new(false),
            visible: Cell::new(visible),
            data: RefCell::new(data),
        }
    }

    #[must_use]
    pub const fn row_type(&self) -> RowType {
        self.key.row_type
    }

    #[must_use]
    pub fn breakdown_id(&self) -> &str {
        &self.key.breakdown_id
    }

    #[must_use]
    pub fn data(&self) -> Ref<'_, RowData> {
        self.data.borrow()
    }

    /// The shared stats map the row displays.
    #[must_use]
    pub fn stats(&self) -> SharedStats {
        Rc::clone(&self.data.borrow().stats)
    }

    /// Display text of one cell.
    #[must_use]
    pub fn cell(&self, field: &str) -> String {
        self.data
            .borrow()
            .stats
            .borrow()
            .get(field)
            .map(crate::model::StatsValue::display)
            .unwrap_or_default()
    }

    pub(crate) fn refresh(&self, data: RowData) {
        *self.data.borrow_mut() = data;
    }

    /// Whether the row can be collapsed.
    #[must_use]
    pub fn is_collapsible(&self) -> bool {
        self.row_type() != RowType::Breakdown && self.data.borrow().has_children
    }
}

/// Result of one parse.
#[derive(Debug, Clone, Default)]
pub struct ParsedGrid {
    /// Rows in display order (pre-order: each row followed by its children).
    pub rows: Vec<Rc<GridRow>>,
    /// Totals row; absent until the first page with totals arrived.
    pub footer: Option<Rc<GridRow>>,
}

impl ParsedGrid {
    /// Rows not hidden by a collapsed ancestor.
    pub fn visible_rows(&self) -> impl Iterator<Item = &Rc<GridRow>> {
        self.rows.iter().filter(|row| row.visible.get())
    }

    #[must_use]
    pub fn find(&self, key: &RowKey) -> Option<&Rc<GridRow>> {
        self.rows.iter().find(|row| &row.key == key)
    }

    /// First row with the given breakdown id and type.
    #[must_use]
    pub fn find_by_id(&self, breakdown_id: &str, row_type: RowType) -> Option<&Rc<GridRow>> {
        self.rows
            .iter()
            .find(|row| row.row_type() == row_type && row.breakdown_id() == breakdown_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
