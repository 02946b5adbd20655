//! Tree operations: applying pages, merging rows, grouping and patching.
//!
//! Everything here is synchronous and works on a borrowed [`BreakdownRoot`];
//! the data source calls these between suspension points.

use crate::model::{
    merge_stats, shared_stats, Breakdown, BreakdownNode, BreakdownPage, BreakdownPatch,
    BreakdownRoot, NodeUid, Pagination, RowEntry, SharedStats, UidAllocator,
};
use std::collections::HashSet;

/// Outcome of applying one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The root was replaced by a first level-1 page.
    Reset { uid: NodeUid },
    /// Rows were merged into an existing node.
    Merged { breakdown_id: String, uid: NodeUid },
    /// The target node is gone (pruned or reloaded); the page was dropped.
    Missing { breakdown_id: String },
}

// ============================================================================
// Applying pages
// ============================================================================

/// Apply one page to the tree.
///
/// A first level-1 page replaces the root's breakdown and moves the totals
/// to the root. Any other page is merged into the node with the page's
/// breakdown id. `path_len` is the length of the selected breakdown path.
pub fn apply_breakdown(
    root: &mut BreakdownRoot,
    page: BreakdownPage,
    path_len: usize,
    uids: &mut UidAllocator,
) -> Applied {
    let complete = page.pagination().complete;
    let base_reset = page.is_base_reset();
    let (offset, count) = (page.offset, page.count);
    let mut rows = apply_groups(page.rows, uids);
    initialize_node_breakdown(&mut rows, path_len, uids);

    if base_reset {
        let uid = uids.next_uid();
        let mut node = BreakdownNode::placeholder(uid, page.breakdown_id, page.level);
        node.rows = rows;
        let loaded = loaded_rows(&node);
        node.pagination = Pagination {
            offset,
            limit: loaded,
            count: Some(count),
            complete,
        };
        root.stats = page.totals.map(shared_stats);
        root.breakdown = Some(node);
        tracing::debug!("Reset tree with {} of {} base rows", loaded, count);
        return Applied::Reset { uid };
    }

    let Some(node) = root.find_node_mut(&page.breakdown_id) else {
        tracing::debug!(
            "Dropping page for missing node '{}' at level {}",
            page.breakdown_id,
            page.level
        );
        return Applied::Missing {
            breakdown_id: page.breakdown_id,
        };
    };

    merge_rows(&mut node.rows, rows);
    node.pagination = Pagination {
        offset: node.pagination.offset.min(offset),
        limit: loaded_rows(node),
        count: Some(count),
        complete,
    };
    tracing::debug!(
        "Merged page into '{}' (level {}, {} of {} rows)",
        node.breakdown_id,
        node.level,
        node.pagination.limit,
        count
    );
    Applied::Merged {
        breakdown_id: node.breakdown_id.clone(),
        uid: node.uid,
    }
}

/// Number of fetched data rows a node holds, rows moved into groups included.
#[must_use]
pub fn loaded_rows(node: &BreakdownNode) -> usize {
    node.rows
        .iter()
        .map(|row| match (&row.group, row.breakdown.as_deref()) {
            (Some(_), Some(group)) => group.rows.len(),
            (Some(_), None) => 0,
            (None, _) => 1,
        })
        .sum()
}

/// Merge incoming rows into `existing`, matching by breakdown id.
///
/// A matching row is refreshed in place so its shared stats keep their
/// identity. When both rows own a child node the incoming child rows are
/// merged into the existing child (this is how group rows refresh their
/// members). Unmatched rows are appended.
pub fn merge_rows(existing: &mut Vec<RowEntry>, incoming: Vec<RowEntry>) {
    for row in incoming {
        match existing
            .iter_mut()
            .find(|current| current.breakdown_id == row.breakdown_id)
        {
            Some(current) => update_row(current, row),
            None => existing.push(row),
        }
    }
}

fn update_row(current: &mut RowEntry, mut incoming: RowEntry) {
    let fresh = std::mem::take(&mut *incoming.stats.borrow_mut());
    *current.stats.borrow_mut() = fresh;
    current.archived = incoming.archived;
    if incoming.entity.is_some() {
        current.entity = incoming.entity;
    }
    if incoming.group.is_some() {
        current.group = incoming.group.take();
    }

    let Some(update) = incoming.breakdown.take() else {
        return;
    };
    if current.breakdown.is_none() {
        current.breakdown = Some(update);
    } else if let Some(child) = current.breakdown.as_deref_mut() {
        if update.is_placeholder() {
            return;
        }
        let was_placeholder = child.is_placeholder();
        let update = *update;
        merge_rows(&mut child.rows, update.rows);
        if update.replace_rows {
            child.pagination = Pagination::complete_with(child.rows.len());
        } else if was_placeholder {
            child.pagination = update.pagination;
        }
    }
}

// ============================================================================
// Priming and grouping
// ============================================================================

/// Give every row shallower than the selected path an empty child node to
/// merge into. Group rows prime their members instead of themselves.
pub fn initialize_node_breakdown(rows: &mut [RowEntry], path_len: usize, uids: &mut UidAllocator) {
    for row in rows {
        if row.is_group() {
            if let Some(group) = row.breakdown.as_deref_mut() {
                initialize_node_breakdown(&mut group.rows, path_len, uids);
            }
        } else if row.level < path_len && row.breakdown.is_none() {
            row.breakdown = Some(Box::new(BreakdownNode::placeholder(
                uids.next_uid(),
                row.breakdown_id.clone(),
                row.level + 1,
            )));
        }
    }
}

/// Move the siblings named by each group row into that row's child node.
///
/// The group node takes the group row's id and level and is complete.
pub fn apply_groups(rows: Vec<RowEntry>, uids: &mut UidAllocator) -> Vec<RowEntry> {
    let grouped: HashSet<String> = rows
        .iter()
        .filter_map(|row| row.group.as_ref())
        .flat_map(|group| group.ids.iter().cloned())
        .collect();
    if grouped.is_empty() {
        return rows;
    }

    let (members, mut remaining): (Vec<RowEntry>, Vec<RowEntry>) = rows
        .into_iter()
        .partition(|row| !row.is_group() && grouped.contains(&row.breakdown_id));

    let mut members: Vec<Option<RowEntry>> = members.into_iter().map(Some).collect();
    for row in remaining.iter_mut().filter(|row| row.is_group()) {
        let ids = row.group.as_ref().map(|g| g.ids.clone()).unwrap_or_default();
        let mut node = BreakdownNode::placeholder(uids.next_uid(), row.breakdown_id.clone(), row.level);
        for id in &ids {
            if let Some(member) = members
                .iter_mut()
                .find(|m| m.as_ref().is_some_and(|m| &m.breakdown_id == id))
                .and_then(Option::take)
            {
                node.rows.push(member);
            }
        }
        node.pagination = Pagination::complete_with(node.rows.len());
        node.replace_rows = true;
        row.breakdown = Some(Box::new(node));
    }
    remaining
}

/// Ids of the placeholder children directly below `node`, group members
/// included. These are the parents of the next level's fetch.
#[must_use]
pub fn collect_child_breakdowns(node: &BreakdownNode) -> Vec<String> {
    let mut ids = Vec::new();
    for row in &node.rows {
        let Some(child) = row.breakdown.as_deref() else {
            continue;
        };
        if row.is_group() {
            ids.extend(collect_child_breakdowns(child));
        } else if child.is_placeholder() && !child.meta.loading {
            ids.push(child.breakdown_id.clone());
        }
    }
    ids
}

/// Ids of every placeholder node at `level`.
#[must_use]
pub fn placeholders_at_level(root: &BreakdownRoot, level: usize) -> Vec<String> {
    let mut ids = Vec::new();
    if let Some(node) = root.breakdown.as_ref() {
        node.visit_nodes(&mut |n| {
            if n.level == level && n.is_placeholder() && !n.replace_rows {
                ids.push(n.breakdown_id.clone());
            }
        });
    }
    ids
}

// ============================================================================
// Reshaping on breakdown change
// ============================================================================

/// First index where two breakdown paths differ.
///
/// `None` when they are equal; the shorter length when one is a prefix of
/// the other.
#[must_use]
pub fn find_difference(old: &[Breakdown], new: &[Breakdown]) -> Option<usize> {
    if old == new {
        return None;
    }
    Some(
        old.iter()
            .zip(new)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| old.len().min(new.len())),
    )
}

/// Re-prime or drop the children of every row at `level`.
///
/// Rows keep their data; with `reprime` their child node is replaced by a
/// fresh placeholder, otherwise it is removed.
pub fn reshape_at_level(root: &mut BreakdownRoot, level: usize, reprime: bool, uids: &mut UidAllocator) {
    if let Some(node) = root.breakdown.as_mut() {
        reshape_node(node, level, reprime, uids);
    }
}

fn reshape_node(node: &mut BreakdownNode, level: usize, reprime: bool, uids: &mut UidAllocator) {
    for row in &mut node.rows {
        if row.is_group() {
            if let Some(group) = row.breakdown.as_deref_mut() {
                reshape_node(group, level, reprime, uids);
            }
        } else if row.level == level {
            row.breakdown = reprime.then(|| {
                Box::new(BreakdownNode::placeholder(
                    uids.next_uid(),
                    row.breakdown_id.clone(),
                    level + 1,
                ))
            });
        } else if row.level < level {
            if let Some(child) = row.breakdown.as_deref_mut() {
                reshape_node(child, level, reprime, uids);
            }
        }
    }
}

// ============================================================================
// Patches
// ============================================================================

/// What a patch touched.
#[derive(Debug, Default)]
pub struct PatchOutcome {
    /// Stats maps written to, rows first, then totals.
    pub stats: Vec<SharedStats>,
    /// Ids of rows whose archived flag changed.
    pub archived_changed: Vec<String>,
    /// Patch rows with no live counterpart.
    pub missing: Vec<String>,
}

/// Merge a patch into the tree.
///
/// Rows are found tree-wide by id. Only incoming fields that carry a value
/// replace existing cells; the rest merge their decorations.
pub fn update_data(root: &mut BreakdownRoot, patch: BreakdownPatch) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();

    for row_patch in patch.rows {
        let Some(row) = root.find_row_mut(&row_patch.breakdown_id) else {
            outcome.missing.push(row_patch.breakdown_id);
            continue;
        };
        if let Some(archived) = row_patch.archived {
            if row.archived != archived {
                row.archived = archived;
                outcome.archived_changed.push(row.breakdown_id.clone());
            }
        }
        merge_stats(&mut row.stats.borrow_mut(), &row_patch.stats);
        outcome.stats.push(row.stats.clone());
    }

    if let Some(totals) = patch.totals {
        match &root.stats {
            Some(stats) => {
                merge_stats(&mut stats.borrow_mut(), &totals);
                outcome.stats.push(stats.clone());
            }
            None => {
                let stats = shared_stats(totals);
                outcome.stats.push(stats.clone());
                root.stats = Some(stats);
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RowGroup, RowPatch, StatsMap, StatsValue};
    use serde_json::json;

    fn row(id: &str, level: usize, clicks: i64) -> RowEntry {
        let mut stats = StatsMap::new();
        stats.insert("clicks".into(), StatsValue::new(clicks));
        RowEntry::new(id, level, stats)
    }

    fn page(id: &str, level: usize, offset: usize, count: usize, rows: Vec<RowEntry>) -> BreakdownPage {
        BreakdownPage {
            breakdown_id: id.into(),
            level,
            offset,
            limit: rows.len(),
            count,
            rows,
            totals: None,
        }
    }

    fn loaded_root(uids: &mut UidAllocator, path_len: usize) -> BreakdownRoot {
        let mut root = BreakdownRoot::empty(1);
        let mut first = page("", 1, 0, 3, vec![row("1", 1, 10), row("2", 1, 20)]);
        first.totals = Some([("clicks".to_string(), StatsValue::new(30))].into_iter().collect());
        apply_breakdown(&mut root, first, path_len, uids);
        root
    }

    #[test]
    fn test_base_page_resets_root() {
        let mut uids = UidAllocator::new();
        let root = loaded_root(&mut uids, 2);

        let node = root.breakdown.as_ref().unwrap();
        assert_eq!(node.rows.len(), 2);
        assert_eq!(node.pagination.limit, 2);
        assert_eq!(node.pagination.count, Some(3));
        assert!(!node.pagination.complete);
        assert!(node.totals.is_none());
        assert_eq!(root.stats.as_ref().unwrap().borrow()["clicks"].value, Some(json!(30)));
        // Rows shallower than the path are primed.
        assert!(node.rows.iter().all(|r| r.breakdown.as_ref().is_some_and(|b| b.is_placeholder())));
    }

    #[test]
    fn test_load_more_appends_and_updates_pagination() {
        let mut uids = UidAllocator::new();
        let mut root = loaded_root(&mut uids, 1);

        let applied = apply_breakdown(&mut root, page("", 1, 2, 3, vec![row("3", 1, 5)]), 1, &mut uids);
        assert!(matches!(applied, Applied::Merged { .. }));

        let node = root.breakdown.as_ref().unwrap();
        assert_eq!(node.rows.len(), 3);
        assert_eq!(node.pagination.limit, 3);
        assert!(node.pagination.complete);
    }

    #[test]
    fn test_merge_same_page_twice_is_idempotent() {
        let mut uids = UidAllocator::new();
        let mut root = loaded_root(&mut uids, 2);
        let child = || page("1", 2, 0, 2, vec![row("1||a", 2, 1), row("1||b", 2, 2)]);

        apply_breakdown(&mut root, child(), 2, &mut uids);
        let stats_before = root.find_row("1||a").unwrap().stats.clone();
        apply_breakdown(&mut root, child(), 2, &mut uids);

        let node = root.find_node("1").unwrap();
        assert_eq!(node.rows.len(), 2);
        assert_eq!(node.pagination.limit, 2);
        assert!(std::rc::Rc::ptr_eq(&stats_before, &root.find_row("1||a").unwrap().stats));
    }

    #[test]
    fn test_page_for_missing_node_is_dropped() {
        let mut uids = UidAllocator::new();
        let mut root = loaded_root(&mut uids, 2);
        let applied = apply_breakdown(&mut root, page("9", 2, 0, 1, vec![row("9||a", 2, 1)]), 2, &mut uids);
        assert_eq!(applied, Applied::Missing { breakdown_id: "9".into() });
    }

    #[test]
    fn test_group_row_takes_members() {
        let mut uids = UidAllocator::new();
        let mut group = row("group", 1, 6);
        group.group = Some(RowGroup { ids: vec!["2".into(), "4".into()] });
        let rows = vec![group, row("1", 1, 1), row("2", 1, 2), row("3", 1, 3), row("4", 1, 4)];

        let rows = apply_groups(rows, &mut uids);
        let ids: Vec<_> = rows.iter().map(|r| r.breakdown_id.as_str()).collect();
        assert_eq!(ids, vec!["group", "1", "3"]);

        let members = rows[0].breakdown.as_ref().unwrap();
        let member_ids: Vec<_> = members.rows.iter().map(|r| r.breakdown_id.as_str()).collect();
        assert_eq!(member_ids, vec!["2", "4"]);
        assert!(members.pagination.complete);
        assert_eq!(members.level, 1);
    }

    #[test]
    fn test_group_members_are_primed_not_group() {
        let mut uids = UidAllocator::new();
        let mut group = row("group", 1, 3);
        group.group = Some(RowGroup { ids: vec!["2".into()] });
        let mut rows = apply_groups(vec![group, row("1", 1, 1), row("2", 1, 2)], &mut uids);
        initialize_node_breakdown(&mut rows, 2, &mut uids);

        let group_node = rows[0].breakdown.as_ref().unwrap();
        assert!(!group_node.is_placeholder());
        assert!(group_node.rows[0].breakdown.as_ref().unwrap().is_placeholder());

        let mut node = BreakdownNode::placeholder(1, "", 1);
        node.rows = rows;
        assert_eq!(collect_child_breakdowns(&node), vec!["2".to_string(), "1".to_string()]);
        assert_eq!(loaded_rows(&node), 2);
    }

    #[test]
    fn test_find_difference() {
        use Breakdown::{Campaign, Country, Day};
        assert_eq!(find_difference(&[Campaign, Country], &[Campaign, Country]), None);
        assert_eq!(find_difference(&[Campaign], &[Campaign, Country]), Some(1));
        assert_eq!(find_difference(&[Campaign, Country], &[Campaign]), Some(1));
        assert_eq!(find_difference(&[Campaign, Country], &[Campaign, Day]), Some(1));
        assert_eq!(find_difference(&[Campaign], &[Day]), Some(0));
    }

    #[test]
    fn test_reshape_reprimes_or_drops() {
        let mut uids = UidAllocator::new();
        let mut root = loaded_root(&mut uids, 2);
        apply_breakdown(&mut root, page("1", 2, 0, 1, vec![row("1||a", 2, 1)]), 2, &mut uids);
        let old_uid = root.find_node("1").unwrap().uid;

        reshape_at_level(&mut root, 1, true, &mut uids);
        let node = root.find_node("1").unwrap();
        assert!(node.is_placeholder());
        assert_ne!(node.uid, old_uid);
        assert_eq!(placeholders_at_level(&root, 2), vec!["1".to_string(), "2".to_string()]);

        reshape_at_level(&mut root, 1, false, &mut uids);
        assert!(root.find_node("1").is_none());
        assert_eq!(root.depth(), 1);
    }

    #[test]
    fn test_update_data_partial_patch() {
        let mut uids = UidAllocator::new();
        let mut root = loaded_root(&mut uids, 1);
        root.find_row_mut("1")
            .unwrap()
            .stats
            .borrow_mut()
            .insert("field2".into(), StatsValue::new(12));

        let patch = BreakdownPatch {
            rows: vec![RowPatch {
                breakdown_id: "1".into(),
                stats: [("field2".to_string(), StatsValue::new(120))].into_iter().collect(),
                archived: Some(true),
            }],
            totals: Some([("clicks".to_string(), StatsValue::new(31))].into_iter().collect()),
        };
        let outcome = update_data(&mut root, patch);

        let stats = root.find_row("1").unwrap().stats.borrow().clone();
        assert_eq!(stats["clicks"].value, Some(json!(10)));
        assert_eq!(stats["field2"].value, Some(json!(120)));
        assert_eq!(outcome.stats.len(), 2);
        assert_eq!(outcome.archived_changed, vec!["1".to_string()]);
        assert_eq!(root.stats.as_ref().unwrap().borrow()["clicks"].value, Some(json!(31)));
    }

    fn grouped_rows(uids: &mut UidAllocator) -> Vec<RowEntry> {
        let mut group = row("group", 1, 6);
        group.group = Some(RowGroup { ids: vec!["2".into(), "4".into()] });
        apply_groups(vec![group, row("1", 1, 1), row("2", 1, 2), row("4", 1, 4)], uids)
    }

    #[test]
    fn test_group_refresh_keeps_node_and_members() {
        let mut uids = UidAllocator::new();
        let mut rows = grouped_rows(&mut uids);
        let group_uid = rows[0].breakdown.as_ref().unwrap().uid;

        merge_rows(&mut rows, grouped_rows(&mut uids));

        let ids: Vec<_> = rows.iter().map(|r| r.breakdown_id.as_str()).collect();
        assert_eq!(ids, vec!["group", "1"]);
        let group_node = rows[0].breakdown.as_ref().unwrap();
        assert_eq!(group_node.uid, group_uid);
        let member_ids: Vec<_> = group_node.rows.iter().map(|r| r.breakdown_id.as_str()).collect();
        assert_eq!(member_ids, vec!["2", "4"]);
        assert!(group_node.pagination.complete);
        assert_eq!(group_node.pagination.limit, 2);
    }

    #[test]
    fn test_update_data_patches_group_row() {
        let mut uids = UidAllocator::new();
        let mut node = BreakdownNode::placeholder(uids.next_uid(), "", 1);
        node.rows = grouped_rows(&mut uids);
        node.pagination = Pagination::complete_with(2);
        let mut root = BreakdownRoot::empty(1);
        root.breakdown = Some(node);

        let patch = BreakdownPatch {
            rows: vec![
                RowPatch {
                    breakdown_id: "group".into(),
                    stats: [("clicks".to_string(), StatsValue::new(7))].into_iter().collect(),
                    archived: None,
                },
                RowPatch {
                    breakdown_id: "4".into(),
                    stats: [("clicks".to_string(), StatsValue::new(5))].into_iter().collect(),
                    archived: None,
                },
            ],
            totals: None,
        };
        let outcome = update_data(&mut root, patch);

        assert!(outcome.missing.is_empty());
        assert_eq!(outcome.stats.len(), 2);
        let group = root.find_row("group").unwrap();
        assert!(group.is_group());
        assert_eq!(group.stats.borrow()["clicks"].value, Some(json!(7)));
        assert_eq!(root.find_row("4").unwrap().stats.borrow()["clicks"].value, Some(json!(5)));
    }
}
