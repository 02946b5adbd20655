//! The fetched-data tree.
//!
//! A [`BreakdownRoot`] anchors level 0. Its level-1 [`BreakdownNode`] holds
//! [`RowEntry`] values, each of which may own the node for the next level.
//! Nodes are mutated in place as pages arrive and carry a [`NodeUid`] so
//! that replacing a node (rather than updating it) is observable.

use super::dimensions::Entity;
use super::stats::{SharedStats, StatsMap};
use serde::{Deserialize, Serialize};

/// Identity of a node within one data source.
pub type NodeUid = u64;

/// Hands out node identities.
#[derive(Debug, Default)]
pub struct UidAllocator {
    next: NodeUid,
}

impl UidAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    pub fn next_uid(&mut self) -> NodeUid {
        self.next += 1;
        self.next
    }
}

// ============================================================================
// Pagination / meta
// ============================================================================

/// Pagination state of a node.
///
/// `count` is `None` until the first page for the node has arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
    pub count: Option<usize>,
    pub complete: bool,
}

impl Pagination {
    /// Pagination as reported by a page response.
    #[must_use]
    pub const fn from_response(offset: usize, limit: usize, count: usize) -> Self {
        Self {
            offset,
            limit,
            count: Some(count),
            complete: offset.saturating_add(limit) >= count,
        }
    }

    /// Pagination of a node that has not been fetched yet.
    #[must_use]
    pub const fn unfetched() -> Self {
        Self {
            offset: 0,
            limit: 0,
            count: None,
            complete: false,
        }
    }

    /// Pagination of a fully known, in-memory node.
    #[must_use]
    pub const fn complete_with(count: usize) -> Self {
        Self {
            offset: 0,
            limit: count,
            count: Some(count),
            complete: true,
        }
    }

    /// Whether the node is known to have no rows at all.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        self.count == Some(0)
    }
}

/// Transient UI state of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    pub loading: bool,
    pub error: bool,
}

/// Marks a row as a synthetic aggregate of the listed siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowGroup {
    pub ids: Vec<String>,
}

// ============================================================================
// Rows and nodes
// ============================================================================

/// One data row.
#[derive(Debug, Clone)]
pub struct RowEntry {
    pub breakdown_id: String,
    pub level: usize,
    pub stats: SharedStats,
    pub archived: bool,
    pub entity: Option<Entity>,
    /// Child node, once fetched or primed.
    pub breakdown: Option<Box<BreakdownNode>>,
    pub group: Option<RowGroup>,
}

impl RowEntry {
    #[must_use]
    pub fn new(breakdown_id: impl Into<String>, level: usize, stats: StatsMap) -> Self {
        Self {
            breakdown_id: breakdown_id.into(),
            level,
            stats: super::stats::shared_stats(stats),
            archived: false,
            entity: None,
            breakdown: None,
            group: None,
        }
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        self.group.is_some()
    }
}

/// A page-able list of rows at one level under one parent.
#[derive(Debug, Clone)]
pub struct BreakdownNode {
    pub uid: NodeUid,
    pub breakdown_id: String,
    pub level: usize,
    pub rows: Vec<RowEntry>,
    pub pagination: Pagination,
    pub totals: Option<StatsMap>,
    pub meta: NodeMeta,
    /// Rows are replaced wholesale; no load-more affordance.
    pub replace_rows: bool,
}

impl BreakdownNode {
    /// An empty node awaiting its first page.
    #[must_use]
    pub fn placeholder(uid: NodeUid, breakdown_id: impl Into<String>, level: usize) -> Self {
        Self {
            uid,
            breakdown_id: breakdown_id.into(),
            level,
            rows: Vec::new(),
            pagination: Pagination::unfetched(),
            totals: None,
            meta: NodeMeta::default(),
            replace_rows: false,
        }
    }

    /// Whether no page has been merged into this node yet.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.pagination.count.is_none() && self.rows.is_empty()
    }

    /// Depth-first search for the node with `breakdown_id` (self included).
    #[must_use]
    pub fn find_node(&self, breakdown_id: &str) -> Option<&Self> {
        if self.breakdown_id == breakdown_id {
            return Some(self);
        }
        self.rows
            .iter()
            .filter_map(|row| row.breakdown.as_deref())
            .find_map(|child| child.find_node(breakdown_id))
    }

    /// Mutable depth-first search for the node with `breakdown_id`.
    pub fn find_node_mut(&mut self, breakdown_id: &str) -> Option<&mut Self> {
        if self.breakdown_id == breakdown_id {
            return Some(self);
        }
        self.rows
            .iter_mut()
            .filter_map(|row| row.breakdown.as_deref_mut())
            .find_map(|child| child.find_node_mut(breakdown_id))
    }

    /// Depth-first search for a row. Group rows and their members both match.
    #[must_use]
    pub fn find_row(&self, breakdown_id: &str) -> Option<&RowEntry> {
        for row in &self.rows {
            if row.breakdown_id == breakdown_id {
                return Some(row);
            }
            if let Some(found) = row.breakdown.as_deref().and_then(|c| c.find_row(breakdown_id)) {
                return Some(found);
            }
        }
        None
    }

    /// Mutable variant of [`find_row`](Self::find_row).
    pub fn find_row_mut(&mut self, breakdown_id: &str) -> Option<&mut RowEntry> {
        let position = self
            .rows
            .iter()
            .position(|row| row.breakdown_id == breakdown_id);
        match position {
            Some(idx) => self.rows.get_mut(idx),
            None => self
                .rows
                .iter_mut()
                .filter_map(|row| row.breakdown.as_deref_mut())
                .find_map(|child| child.find_row_mut(breakdown_id)),
        }
    }

    /// Deepest level holding fetched rows in this subtree.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.is_placeholder() {
            return self.level.saturating_sub(1);
        }
        self.rows
            .iter()
            .filter_map(|row| row.breakdown.as_deref())
            .map(Self::depth)
            .fold(self.level, usize::max)
    }

    /// Visit every node of the subtree, depth-first, parents first.
    pub fn visit_nodes<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        for child in self.rows.iter().filter_map(|row| row.breakdown.as_deref()) {
            child.visit_nodes(visit);
        }
    }

    /// Total number of data rows in the subtree (group rows excluded).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| {
                let own = usize::from(!row.is_group());
                own + row.breakdown.as_deref().map_or(0, Self::row_count)
            })
            .sum()
    }
}

// ============================================================================
// Root
// ============================================================================

/// The level-0 anchor of the tree.
#[derive(Debug, Clone, Default)]
pub struct BreakdownRoot {
    pub breakdown: Option<BreakdownNode>,
    pub stats: Option<SharedStats>,
    pub level: usize,
    pub meta: NodeMeta,
    /// Bumped on every full reload.
    pub epoch: u64,
}

impl BreakdownRoot {
    /// An empty root for the given reload epoch.
    #[must_use]
    pub fn empty(epoch: u64) -> Self {
        Self {
            breakdown: None,
            stats: None,
            level: 0,
            meta: NodeMeta::default(),
            epoch,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakdown.is_none() && self.stats.is_none()
    }

    #[must_use]
    pub fn find_node(&self, breakdown_id: &str) -> Option<&BreakdownNode> {
        self.breakdown.as_ref()?.find_node(breakdown_id)
    }

    pub fn find_node_mut(&mut self, breakdown_id: &str) -> Option<&mut BreakdownNode> {
        self.breakdown.as_mut()?.find_node_mut(breakdown_id)
    }

    #[must_use]
    pub fn find_row(&self, breakdown_id: &str) -> Option<&RowEntry> {
        self.breakdown.as_ref()?.find_row(breakdown_id)
    }

    pub fn find_row_mut(&mut self, breakdown_id: &str) -> Option<&mut RowEntry> {
        self.breakdown.as_mut()?.find_row_mut(breakdown_id)
    }

    /// Deepest fetched level (0 when nothing is loaded).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.breakdown.as_ref().map_or(0, BreakdownNode::depth)
    }
}
