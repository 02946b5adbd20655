//! Change notifications emitted by a data source.

use crate::model::{BreakdownRoot, Metadata, RowEntry, SharedStats};
use std::rc::Rc;

/// Receives data source changes.
///
/// Everything is delivered by reference after the tree was mutated. The
/// tree handed out is a snapshot, so a callback may call back into the data
/// source; such changes show up in the next notification.
pub trait DataSourceListener {
    fn on_metadata_updated(&self, _metadata: &Metadata) {}

    /// The tree changed shape: reset, page merged, breakdown changed.
    fn on_data_updated(&self, _root: &BreakdownRoot) {}

    /// A row's archived flag changed.
    fn on_row_updated(&self, _row: &RowEntry) {}

    /// Stats maps written by one patch, rows first, then totals.
    fn on_stats_updated(&self, _stats: &[SharedStats]) {}
}

/// Handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registered listeners in subscription order.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Rc<dyn DataSourceListener>)>,
}

impl Listeners {
    pub fn subscribe(&mut self, listener: Rc<dyn DataSourceListener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    /// Returns whether the listener was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Current listeners, detached so callbacks may (un)subscribe.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<dyn DataSourceListener>> {
        self.entries.iter().map(|(_, l)| Rc::clone(l)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
