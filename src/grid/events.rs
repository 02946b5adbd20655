//! Notifications from the grid facade to a rendering layer.

use super::selection::Selection;
use crate::model::{Metadata, SharedStats};
use crate::parser::ParsedGrid;
use crate::registry::GridColumn;

/// Receives grid changes.
///
/// Callbacks get snapshots and may call back into the grid or its data
/// source. Changes made from a callback are delivered as fresh
/// notifications.
pub trait GridListener {
    fn on_metadata_updated(&self, _metadata: &Metadata) {}

    /// Rows were re-parsed or their visibility changed.
    fn on_rows_updated(&self, _grid: &ParsedGrid) {}

    fn on_columns_updated(&self, _columns: &[GridColumn]) {}

    /// Cells changed in place (save results, pushed patches).
    fn on_stats_updated(&self, _stats: &[SharedStats]) {}

    fn on_selection_changed(&self, _selection: &Selection) {}
}
