//! The grid facade.
//!
//! [`GridApi`] ties a [`DataSource`] to a [`Parser`] and keeps the UI state
//! that lives beside the tree: resolved columns, collapsed rows, selection
//! and persisted preferences. Data source notifications are re-parsed into
//! display rows before they reach grid listeners.

use super::columns::ColumnState;
use super::events::GridListener;
use super::selection::Selection;
use crate::config::{GridConfig, GridPreferences};
use crate::datasource::{DataSource, DataSourceListener};
use crate::endpoint::BreakdownEndpoint;
use crate::error::{GridError, Result};
use crate::model::{
    Breakdown, BreakdownPatch, BreakdownRoot, DateRange, EditPayload, GridFilters, Level,
    Metadata, Order, RowEntry, SharedStats,
};
use crate::parser::{self, ParsedGrid, Parser, RowKey};
use crate::registry::{ColumnCategory, ColumnRegistry, GridColumn};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use tokio::sync::Semaphore;

struct GridInner {
    source: DataSource,
    registry: Rc<ColumnRegistry>,
    parser: RefCell<Parser>,
    /// Replaced on every parse; listeners get a clone of the handle.
    grid: RefCell<Rc<ParsedGrid>>,
    columns: RefCell<ColumnState>,
    selection: RefCell<Selection>,
    preferences: RefCell<GridPreferences>,
    preferences_path: Option<PathBuf>,
    /// Serializes saves when queueing is enabled.
    save_queue: Option<Semaphore>,
    listeners: RefCell<Vec<Rc<dyn GridListener>>>,
}

/// Grid facade over one data source.
///
/// Cloning yields another handle to the same grid.
#[derive(Clone)]
pub struct GridApi {
    inner: Rc<GridInner>,
}

impl GridApi {
    /// Build a grid over `endpoint` with the built-in column catalogue.
    pub fn new(endpoint: Rc<dyn BreakdownEndpoint>, config: &GridConfig) -> Self {
        Self::with_registry(endpoint, config, Rc::new(ColumnRegistry::new()))
    }

    pub fn with_registry(
        endpoint: Rc<dyn BreakdownEndpoint>,
        config: &GridConfig,
        registry: Rc<ColumnRegistry>,
    ) -> Self {
        let preferences_path = config.preferences_path();
        let preferences = preferences_path
            .as_deref()
            .map(GridPreferences::load_from)
            .unwrap_or_default();

        let inner = Rc::new(GridInner {
            source: DataSource::new(endpoint, &config.data),
            registry,
            parser: RefCell::new(Parser::new().with_collapsed_rows(config.grid.collapse_new_rows)),
            grid: RefCell::new(Rc::default()),
            columns: RefCell::new(ColumnState::default()),
            selection: RefCell::new(Selection::new(config.grid.selection_enabled)),
            preferences: RefCell::new(preferences),
            preferences_path,
            save_queue: config.grid.save_queue.then(|| Semaphore::new(1)),
            listeners: RefCell::new(Vec::new()),
        });
        inner
            .source
            .subscribe(Rc::new(SourceBridge(Rc::downgrade(&inner))));
        Self { inner }
    }

    /// The underlying data source.
    #[must_use]
    pub fn data_source(&self) -> &DataSource {
        &self.inner.source
    }

    pub fn subscribe(&self, listener: Rc<dyn GridListener>) {
        self.inner.listeners.borrow_mut().push(listener);
    }

    // ========================================================================
    // Loading
    // ========================================================================

    pub async fn load_metadata(&self, force_fetch: bool) -> Result<Rc<Metadata>> {
        self.inner.source.load_metadata(force_fetch).await
    }

    /// Full reload.
    ///
    /// Page failures were already recorded on the affected node and are not
    /// returned; metadata failures are.
    pub async fn load_data(&self) -> Result<()> {
        absorb(self.inner.source.load_data(None, None, None).await)
    }

    /// Load the next page of a node.
    pub async fn load_more(&self, breakdown_id: &str, limit: Option<usize>) -> Result<()> {
        absorb(
            self.inner
                .source
                .load_data(Some(breakdown_id), None, limit)
                .await,
        )
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Change the breakdown path; columns are re-resolved for the new path.
    pub async fn set_breakdown(&self, path: Vec<Breakdown>, fetch: bool) -> Result<()> {
        if let Some(metadata) = self.inner.source.metadata() {
            self.inner.refresh_columns(&metadata, &path);
        }
        absorb(self.inner.source.set_breakdown(path, fetch).await)
    }

    /// Change the order; remembered per level.
    pub async fn set_order(&self, order: Order, fetch: bool) -> Result<()> {
        if let Some(level) = self.level() {
            self.inner
                .preferences
                .borrow_mut()
                .set_order(level, &order);
            self.inner.persist_preferences();
        }
        absorb(self.inner.source.set_order(order, fetch).await)
    }

    /// Sort by a column, flipping direction when it is already the order
    /// field.
    pub async fn order_by_column(&self, field: &str) -> Result<()> {
        let order_field = {
            let columns = self.inner.columns.borrow();
            let column = columns
                .column(field)
                .ok_or_else(|| GridError::validation(format!("Unknown column '{field}'")))?;
            if !column.orderable {
                return Err(GridError::validation(format!(
                    "Column '{field}' is not orderable"
                )));
            }
            column.order_field.clone()
        };
        let order = self.inner.source.order().toggled_for(&order_field);
        self.set_order(order, true).await
    }

    pub async fn set_filter(&self, filters: GridFilters, fetch: bool) -> Result<()> {
        absorb(self.inner.source.set_filter(filters, fetch).await)
    }

    pub async fn set_date_range(&self, date_range: DateRange, fetch: bool) -> Result<()> {
        absorb(self.inner.source.set_date_range(date_range, fetch).await)
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Save one cell.
    ///
    /// With the save queue enabled, saves wait for their predecessors
    /// instead of failing with [`GridError::SaveInProgress`].
    pub async fn save_data(
        &self,
        value: serde_json::Value,
        row_id: &str,
        column: &str,
    ) -> Result<()> {
        if let Some(column) = self.inner.columns.borrow().column(column) {
            if !column.editable {
                return Err(GridError::validation(format!(
                    "Column '{}' is not editable",
                    column.field
                )));
            }
        }
        let _permit = match &self.inner.save_queue {
            Some(queue) => Some(
                queue
                    .acquire()
                    .await
                    .map_err(|_| GridError::config("save queue closed"))?,
            ),
            None => None,
        };
        self.inner.source.save_data(value, row_id, column).await
    }

    /// Merge a pushed patch.
    pub fn update_data(&self, patch: BreakdownPatch) {
        self.inner.source.update_data(patch);
    }

    pub async fn edit_row(&self, row_id: &str) -> Result<EditPayload> {
        self.inner.source.edit_row(row_id).await
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Rows of the last parse.
    #[must_use]
    pub fn rows(&self) -> ParsedGrid {
        ParsedGrid::clone(&self.inner.grid.borrow())
    }

    /// Collapse or expand a row; returns whether anything changed.
    pub fn set_collapsed(&self, key: &RowKey, collapsed: bool) -> bool {
        let changed = {
            let grid = self.inner.grid.borrow();
            grid.find(key).is_some_and(|row| row.collapsed.get() != collapsed)
                && parser::set_collapsed(&grid.rows, key, collapsed)
        };
        if changed {
            self.inner.notify_rows();
        }
        changed
    }

    pub fn toggle_collapsed(&self, key: &RowKey) -> bool {
        let collapsed = self
            .inner
            .grid
            .borrow()
            .find(key)
            .map(|row| row.collapsed.get());
        collapsed.map_or(false, |collapsed| self.set_collapsed(key, !collapsed))
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select_row(&self, breakdown_id: &str, selected: bool) -> bool {
        let changed = self
            .inner
            .selection
            .borrow_mut()
            .set_selected(breakdown_id, selected);
        if changed {
            self.inner.notify_selection();
        }
        changed
    }

    pub fn select_all(&self) -> bool {
        let changed = {
            let grid = self.inner.grid.borrow();
            self.inner.selection.borrow_mut().select_all(&grid)
        };
        if changed {
            self.inner.notify_selection();
        }
        changed
    }

    pub fn clear_selection(&self) -> bool {
        let changed = self.inner.selection.borrow_mut().clear();
        if changed {
            self.inner.notify_selection();
        }
        changed
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.inner.selection.borrow().clone()
    }

    // ========================================================================
    // Columns
    // ========================================================================

    #[must_use]
    pub fn columns(&self) -> Vec<GridColumn> {
        self.inner.columns.borrow().columns().to_vec()
    }

    #[must_use]
    pub fn visible_columns(&self) -> Vec<GridColumn> {
        self.inner.columns.borrow().visible().cloned().collect()
    }

    #[must_use]
    pub fn categories(&self) -> Vec<ColumnCategory> {
        self.inner.columns.borrow().categories().to_vec()
    }

    /// Show or hide a column and remember the choice for this level.
    pub fn set_column_visible(&self, field: &str, visible: bool) -> bool {
        let changed = self
            .inner
            .columns
            .borrow_mut()
            .set_visible(field, visible);
        if changed {
            self.inner.columns_changed(self.level());
        }
        changed
    }

    pub fn set_category_visible(&self, category: &str, visible: bool) -> bool {
        let changed = self
            .inner
            .columns
            .borrow_mut()
            .set_category_visible(category, visible);
        if changed {
            self.inner.columns_changed(self.level());
        }
        changed
    }

    fn level(&self) -> Option<Level> {
        self.inner.source.metadata().map(|m| m.level)
    }
}

impl std::fmt::Debug for GridApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridApi")
            .field("source", &self.inner.source)
            .field("rows", &self.inner.grid.borrow().len())
            .field("selected", &self.inner.selection.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Swallow failures already reflected in the tree.
fn absorb(result: Result<()>) -> Result<()> {
    match result {
        Err(GridError::PageFetch { context, source }) => {
            tracing::warn!("Page load for {} failed: {}", context, source);
            Ok(())
        }
        Err(e) if e.is_aborted() => {
            tracing::debug!("Load superseded");
            Ok(())
        }
        other => other,
    }
}

// ============================================================================
// Grid state
// ============================================================================

impl GridInner {
    fn listeners(&self) -> Vec<Rc<dyn GridListener>> {
        self.listeners.borrow().clone()
    }

    fn refresh_columns(&self, metadata: &Metadata, path: &[Breakdown]) {
        let (columns, categories) = self.registry.columns_for(metadata, path);
        let state = {
            let preferences = self.preferences.borrow();
            ColumnState::new(columns, categories, preferences.visible_columns(metadata.level))
        };
        self.parser.borrow_mut().set_columns(state.columns());
        *self.columns.borrow_mut() = state;
        self.notify_columns();
    }

    fn columns_changed(&self, level: Option<Level>) {
        if let Some(level) = level {
            let visible = self.columns.borrow().visible_fields();
            self.preferences
                .borrow_mut()
                .set_visible_columns(level, visible);
            self.persist_preferences();
        }
        self.notify_columns();
    }

    fn reparse(&self, root: &BreakdownRoot) {
        let parsed = match self.parser.borrow_mut().parse(root) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Could not parse grid rows: {}", e);
                return;
            }
        };
        let selection_changed = self.selection.borrow_mut().retain_rows(&parsed);
        *self.grid.borrow_mut() = Rc::new(parsed);
        self.notify_rows();
        if selection_changed {
            self.notify_selection();
        }
    }

    fn persist_preferences(&self) {
        let Some(path) = &self.preferences_path else {
            return;
        };
        if let Err(e) = self.preferences.borrow().save_to(path) {
            tracing::warn!("Failed to save grid preferences to {}: {}", path.display(), e);
        }
    }

    // Listeners may call back into the grid, so no borrow is held while
    // they run.
    fn notify_rows(&self) {
        let grid = Rc::clone(&self.grid.borrow());
        for listener in self.listeners() {
            listener.on_rows_updated(&grid);
        }
    }

    fn notify_columns(&self) {
        let columns = self.columns.borrow().columns().to_vec();
        for listener in self.listeners() {
            listener.on_columns_updated(&columns);
        }
    }

    fn notify_selection(&self) {
        let selection = self.selection.borrow().clone();
        for listener in self.listeners() {
            listener.on_selection_changed(&selection);
        }
    }
}

/// Forwards data source events into the grid.
struct SourceBridge(Weak<GridInner>);

impl DataSourceListener for SourceBridge {
    fn on_metadata_updated(&self, metadata: &Metadata) {
        let Some(inner) = self.0.upgrade() else {
            return;
        };
        let stored_order = inner.preferences.borrow().order(metadata.level);
        if let Some(order) = stored_order {
            if order != inner.source.order() {
                tracing::debug!("Restoring order {} for {}", order, metadata.level);
                drop(inner.source.set_order(order, false));
            }
        }
        let path = inner.source.selected_breakdown();
        inner.refresh_columns(metadata, &path);
        for listener in inner.listeners() {
            listener.on_metadata_updated(metadata);
        }
    }

    fn on_data_updated(&self, root: &BreakdownRoot) {
        if let Some(inner) = self.0.upgrade() {
            inner.reparse(root);
        }
    }

    fn on_row_updated(&self, _row: &RowEntry) {
        if let Some(inner) = self.0.upgrade() {
            inner.source.with_root(|root| inner.reparse(root));
        }
    }

    fn on_stats_updated(&self, stats: &[SharedStats]) {
        if let Some(inner) = self.0.upgrade() {
            for listener in inner.listeners() {
                listener.on_stats_updated(stats);
            }
        }
    }
}
