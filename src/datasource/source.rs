//! The data source: owns the breakdown tree and drives fetches into it.

use super::events::{DataSourceListener, ListenerId, Listeners};
use super::requests::{ActiveRequest, ActiveRequests, RequestFuture};
use super::tree::{self, Applied};
use crate::config::DataConfig;
use crate::endpoint::BreakdownEndpoint;
use crate::error::{EndpointErrorKind, GridError, OptionContext, Result};
use crate::model::{
    Breakdown, BreakdownPatch, BreakdownRoot, DateRange, EditPayload, GridFilters, Metadata,
    Order, PageRequest, QueryConfig, RowRef, SaveContext, SaveRequest, UidAllocator,
};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio_util::sync::CancellationToken;

/// Future returned by data source operations.
pub type DataFuture<T = ()> = LocalBoxFuture<'static, Result<T>>;

struct State {
    /// Listeners get a clone of this handle; writers go through `root_mut`.
    root: Rc<BreakdownRoot>,
    query: QueryConfig,
    selected_breakdown: Vec<Breakdown>,
    metadata: Option<Rc<Metadata>>,
    requests: ActiveRequests,
    uids: UidAllocator,
}

impl State {
    fn root_mut(&mut self) -> &mut BreakdownRoot {
        Rc::make_mut(&mut self.root)
    }
}

struct Inner {
    endpoint: Rc<dyn BreakdownEndpoint>,
    config: DataConfig,
    state: RefCell<State>,
    save_in_progress: Cell<bool>,
    listeners: RefCell<Listeners>,
}

/// Owner of the breakdown tree.
///
/// Cloning yields another handle to the same data source. Operations do
/// their bookkeeping (request registration, cancellation of predecessors,
/// loading flags, resets) when called; the returned future performs the
/// I/O and merges the result once polled.
#[derive(Clone)]
pub struct DataSource {
    inner: Rc<Inner>,
}

/// Clears the single-flight save flag when the save settles or is dropped.
struct SaveGuard(Rc<Inner>);

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.0.save_in_progress.set(false);
    }
}

impl DataSource {
    pub fn new(endpoint: Rc<dyn BreakdownEndpoint>, config: &DataConfig) -> Self {
        let query = QueryConfig {
            order: config.order(),
            filters: GridFilters {
                show_archived: config.show_archived,
                ..GridFilters::default()
            },
            date_range: DateRange::last_days(
                chrono::Local::now().date_naive(),
                config.date_range_days,
            ),
        };
        Self {
            inner: Rc::new(Inner {
                endpoint,
                config: config.clone(),
                state: RefCell::new(State {
                    root: Rc::new(BreakdownRoot::empty(0)),
                    query,
                    selected_breakdown: Vec::new(),
                    metadata: None,
                    requests: ActiveRequests::new(),
                    uids: UidAllocator::new(),
                }),
                save_in_progress: Cell::new(false),
                listeners: RefCell::new(Listeners::default()),
            }),
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Load grid metadata; cached unless `force_fetch`.
    ///
    /// The first successful load selects the default base breakdown when no
    /// path was set.
    pub fn load_metadata(&self, force_fetch: bool) -> DataFuture<Rc<Metadata>> {
        if !force_fetch {
            if let Some(metadata) = self.metadata() {
                return future::ready(Ok(metadata)).boxed_local();
            }
        }

        let this = self.clone();
        async move {
            let metadata = match this.inner.endpoint.get_metadata().await {
                Ok(metadata) => Rc::new(metadata),
                Err(e) => {
                    tracing::warn!("Metadata fetch failed: {}", e);
                    return Err(GridError::metadata("grid metadata", e));
                }
            };
            {
                let mut state = this.inner.state.borrow_mut();
                state.metadata = Some(Rc::clone(&metadata));
                if state.selected_breakdown.is_empty() {
                    state.selected_breakdown = metadata.default_breakdown();
                }
            }
            tracing::info!(
                "Loaded metadata for {} ({} columns)",
                metadata.level,
                metadata.columns.len()
            );
            for listener in this.listeners() {
                listener.on_metadata_updated(&metadata);
            }
            Ok(metadata)
        }
        .boxed_local()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load data.
    ///
    /// Without a node this is a full reload: active requests are cancelled,
    /// the tree is reset (and the reset emitted) immediately, then level 1
    /// is fetched from offset 0. With a node id the node's next page is
    /// fetched, continuing after the rows already loaded. Deeper levels
    /// follow until the selected path is exhausted.
    pub fn load_data(&self, node: Option<&str>, offset: Option<usize>, limit: Option<usize>) -> DataFuture {
        if node.is_none() {
            self.reset_tree();
        }

        if self.inner.state.borrow().metadata.is_some() {
            return match self.issue_page(node, offset, limit) {
                Ok(request) => request.boxed_local(),
                Err(e) => future::ready(Err(e)).boxed_local(),
            };
        }

        let this = self.clone();
        let node = node.map(str::to_owned);
        async move {
            this.load_metadata(false).await?;
            if node.is_none() {
                this.abort_requests();
            }
            this.issue_page(node.as_deref(), offset, limit)?.await
        }
        .boxed_local()
    }

    fn issue_page(&self, node: Option<&str>, offset: Option<usize>, limit: Option<usize>) -> Result<RequestFuture> {
        let Some(id) = node else {
            let limit = limit.unwrap_or_else(|| self.inner.config.page_size(1));
            return Ok(self.get_data_by_level(1, Vec::new(), offset.unwrap_or(0), limit));
        };

        let (level, loaded) = self
            .inner
            .state
            .borrow()
            .root
            .find_node(id)
            .map(|n| (n.level, n.pagination.limit))
            .with_context_none(|| format!("No breakdown node '{id}' to load more rows into"))?;
        let parents = if level <= 1 {
            Vec::new()
        } else {
            vec![id.to_string()]
        };
        let limit = limit.unwrap_or_else(|| self.inner.config.page_size(level));
        Ok(self.get_data_by_level(level, parents, offset.unwrap_or(loaded), limit))
    }

    /// Fetch one level for every parent in one request, then chain into the
    /// next level for the placeholders the merge revealed.
    pub fn get_data_by_level(
        &self,
        level: usize,
        parents: Vec<String>,
        offset: usize,
        limit: usize,
    ) -> RequestFuture {
        let mut state = self.inner.state.borrow_mut();
        let request = PageRequest {
            level,
            offset,
            limit,
            breakdown: state.selected_breakdown.iter().take(level).copied().collect(),
            parents,
            filters: state.query.filters.clone(),
            order: state.query.order.clone(),
            date_range: state.query.date_range,
        };
        set_loading(state.root_mut(), &request, true);

        let id = state.requests.allocate_id();
        let cancel = CancellationToken::new();
        let this = self.clone();
        let config = request.clone();
        let token = cancel.clone();
        let future = async move { this.run_request(id, request, token).await }
            .boxed_local()
            .shared();

        state.requests.register(ActiveRequest {
            id,
            config,
            cancel,
            future: future.clone(),
        });
        future
    }

    async fn run_request(self, id: u64, request: PageRequest, cancel: CancellationToken) -> Result<()> {
        tracing::debug!(
            "Fetching level {} (offset {}, limit {}, {} parents)",
            request.level,
            request.offset,
            request.limit,
            request.parents.len()
        );
        let endpoint = Rc::clone(&self.inner.endpoint);
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(EndpointErrorKind::Aborted),
            result = endpoint.get_page(&request, &cancel) => result,
        };

        let aborted = cancel.is_cancelled();
        {
            let mut state = self.inner.state.borrow_mut();
            state.requests.remove(id);
            // Aborting already cleared the flags; the nodes may belong to a newer request now.
            if !aborted {
                set_loading(state.root_mut(), &request, false);
            }
        }

        let pages = match outcome {
            Ok(pages) if !aborted => pages,
            Ok(_) | Err(EndpointErrorKind::Aborted) => {
                tracing::debug!("Request {} aborted (level {})", id, request.level);
                return Err(GridError::Aborted);
            }
            Err(e) => {
                tracing::warn!("Level {} fetch failed: {}", request.level, e);
                set_error(self.inner.state.borrow_mut().root_mut(), &request);
                self.emit_data_updated();
                return Err(GridError::page(
                    format!("level {} ({} parents)", request.level, request.parents.len()),
                    e,
                ));
            }
        };

        let (children, path_len) = {
            let mut state = self.inner.state.borrow_mut();
            let path_len = state.selected_breakdown.len();
            let State { root, uids, .. } = &mut *state;
            let root = Rc::make_mut(root);
            let mut children = Vec::new();
            for page in pages {
                let filled = match tree::apply_breakdown(root, page, path_len, uids) {
                    Applied::Reset { .. } => root.breakdown.as_ref(),
                    Applied::Merged { breakdown_id, .. } => root.find_node(&breakdown_id),
                    Applied::Missing { .. } => None,
                };
                children.extend(filled.map(tree::collect_child_breakdowns).unwrap_or_default());
            }
            (children, path_len)
        };
        self.emit_data_updated();

        if children.is_empty() || request.level >= path_len {
            return Ok(());
        }
        let next = request.level + 1;
        self.get_data_by_level(next, children, 0, self.inner.config.page_size(next))
            .await
    }

    /// Cancel every active request; returns how many there were.
    pub fn abort_requests(&self) -> usize {
        let mut state = self.inner.state.borrow_mut();
        let aborted = state.requests.abort_all();
        for request in &aborted {
            set_loading(state.root_mut(), &request.config, false);
        }
        aborted.len()
    }

    fn reset_tree(&self) {
        let aborted = self.abort_requests();
        let epoch = {
            let mut state = self.inner.state.borrow_mut();
            let epoch = state.root.epoch + 1;
            state.root = Rc::new(BreakdownRoot::empty(epoch));
            epoch
        };
        tracing::info!("Full reload (epoch {}, {} requests aborted)", epoch, aborted);
        self.emit_data_updated();
    }

    // ========================================================================
    // Breakdown
    // ========================================================================

    /// Change the breakdown path.
    ///
    /// Rows above the first changed level keep their data. Rows at that
    /// level get fresh placeholder children when the new path goes deeper,
    /// or lose their children otherwise. A lone in-flight request that
    /// already fetches the needed path is reused; anything else in flight is
    /// aborted. A change at the base level is a full reload.
    pub fn set_breakdown(&self, breakdown: Vec<Breakdown>, fetch: bool) -> DataFuture {
        let (difference, depth) = {
            let state = self.inner.state.borrow();
            (
                tree::find_difference(&state.selected_breakdown, &breakdown),
                state.root.depth(),
            )
        };
        if difference.is_none() && !fetch {
            return future::ready(Ok(())).boxed_local();
        }

        let equal_level = depth.min(difference.unwrap_or(breakdown.len()));
        {
            let mut state = self.inner.state.borrow_mut();
            state.selected_breakdown.clone_from(&breakdown);
            let needed = &breakdown[..(equal_level + 1).min(breakdown.len())];
            if let Some(request) = state.requests.reusable(needed) {
                tracing::debug!("Reusing in-flight request for {:?}", needed);
                return request.boxed_local();
            }
        }
        self.abort_requests();

        if equal_level == 0 {
            if fetch {
                return self.load_data(None, None, None);
            }
            self.reset_tree();
            return future::ready(Ok(())).boxed_local();
        }

        let reprime = equal_level < breakdown.len();
        let parents = {
            let mut state = self.inner.state.borrow_mut();
            let State { root, uids, .. } = &mut *state;
            let root = Rc::make_mut(root);
            tree::reshape_at_level(root, equal_level, reprime, uids);
            if reprime {
                tree::placeholders_at_level(root, equal_level + 1)
            } else {
                Vec::new()
            }
        };
        tracing::debug!(
            "Breakdown changed below level {} ({} nodes to fetch)",
            equal_level,
            parents.len()
        );
        self.emit_data_updated();

        if fetch && !parents.is_empty() {
            let level = equal_level + 1;
            let limit = self.inner.config.page_size(level);
            return self.get_data_by_level(level, parents, 0, limit).boxed_local();
        }
        future::ready(Ok(())).boxed_local()
    }

    // ========================================================================
    // Saving and patches
    // ========================================================================

    /// Save one field of one row.
    ///
    /// Fails immediately with [`GridError::SaveInProgress`] while another
    /// save runs. A validation rejection leaves the tree untouched and
    /// carries the backend payload in [`GridError::SaveRejected`].
    pub fn save_data(&self, value: serde_json::Value, row_id: &str, column: &str) -> DataFuture {
        if self.inner.save_in_progress.get() {
            return future::ready(Err(GridError::SaveInProgress)).boxed_local();
        }

        let (row, request) = {
            let state = self.inner.state.borrow();
            let Some(row) = state.root.find_row(row_id).map(RowRef::from) else {
                return future::ready(Err(GridError::validation(format!("No row '{row_id}' to save")))).boxed_local();
            };
            let request = SaveRequest {
                settings: IndexMap::from([(column.to_string(), value)]),
                config: SaveContext {
                    level: row.level,
                    breakdown: state.selected_breakdown.clone(),
                    date_range: state.query.date_range,
                    filters: state.query.filters.clone(),
                },
            };
            (row, request)
        };

        self.inner.save_in_progress.set(true);
        let guard = SaveGuard(Rc::clone(&self.inner));
        let this = self.clone();
        async move {
            let _guard = guard;
            tracing::debug!("Saving {:?} on row {}", request.settings.keys().collect::<Vec<_>>(), row.breakdown_id);
            let patch = this
                .inner
                .endpoint
                .save(&row, &request)
                .await
                .map_err(|e| {
                    tracing::warn!("Save of row {} failed: {}", row.breakdown_id, e);
                    GridError::save(format!("row {}", row.breakdown_id), e)
                })?;
            this.update_data(patch);
            Ok(())
        }
        .boxed_local()
    }

    /// Merge a patch (save result or server push) into the tree.
    ///
    /// Emits `on_row_updated` for rows whose archived flag changed and a
    /// single `on_stats_updated` with every touched stats map.
    pub fn update_data(&self, patch: BreakdownPatch) {
        if patch.is_empty() {
            return;
        }
        let outcome = tree::update_data(self.inner.state.borrow_mut().root_mut(), patch);
        for id in &outcome.missing {
            tracing::debug!("Patch row '{}' is not loaded", id);
        }

        let listeners = self.listeners();
        if !outcome.archived_changed.is_empty() {
            let root = self.root();
            for row in outcome
                .archived_changed
                .iter()
                .filter_map(|id| root.find_row(id))
            {
                for listener in &listeners {
                    listener.on_row_updated(row);
                }
            }
        }
        for listener in &listeners {
            listener.on_stats_updated(&outcome.stats);
        }
    }

    /// Editor payload for a row.
    pub fn edit_row(&self, row_id: &str) -> DataFuture<EditPayload> {
        let row = self.inner.state.borrow().root.find_row(row_id).map(RowRef::from);
        let Some(row) = row else {
            return future::ready(Err(GridError::validation(format!("No row '{row_id}' to edit")))).boxed_local();
        };
        let endpoint = Rc::clone(&self.inner.endpoint);
        async move {
            endpoint
                .edit_row(&row)
                .await
                .map_err(|e| GridError::save(format!("editing row {}", row.breakdown_id), e))
        }
        .boxed_local()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn set_order(&self, order: Order, fetch: bool) -> DataFuture {
        self.inner.state.borrow_mut().query.order = order;
        self.reload_if(fetch)
    }

    pub fn set_filter(&self, filters: GridFilters, fetch: bool) -> DataFuture {
        self.inner.state.borrow_mut().query.filters = filters;
        self.reload_if(fetch)
    }

    pub fn set_date_range(&self, date_range: DateRange, fetch: bool) -> DataFuture {
        self.inner.state.borrow_mut().query.date_range = date_range;
        self.reload_if(fetch)
    }

    fn reload_if(&self, fetch: bool) -> DataFuture {
        if fetch {
            self.load_data(None, None, None)
        } else {
            future::ready(Ok(())).boxed_local()
        }
    }

    #[must_use]
    pub fn order(&self) -> Order {
        self.inner.state.borrow().query.order.clone()
    }

    #[must_use]
    pub fn filters(&self) -> GridFilters {
        self.inner.state.borrow().query.filters.clone()
    }

    #[must_use]
    pub fn date_range(&self) -> DateRange {
        self.inner.state.borrow().query.date_range
    }

    #[must_use]
    pub fn selected_breakdown(&self) -> Vec<Breakdown> {
        self.inner.state.borrow().selected_breakdown.clone()
    }

    #[must_use]
    pub fn metadata(&self) -> Option<Rc<Metadata>> {
        self.inner.state.borrow().metadata.clone()
    }

    #[must_use]
    pub fn config(&self) -> &DataConfig {
        &self.inner.config
    }

    /// Run `f` against the current tree.
    ///
    /// `f` sees a snapshot and may call back into the data source.
    pub fn with_root<R>(&self, f: impl FnOnce(&BreakdownRoot) -> R) -> R {
        let root = self.root();
        f(&*root)
    }

    /// Handle to the current tree. Later changes do not show through it.
    #[must_use]
    pub fn root(&self) -> Rc<BreakdownRoot> {
        Rc::clone(&self.inner.state.borrow().root)
    }

    #[must_use]
    pub fn tree_depth(&self) -> usize {
        self.inner.state.borrow().root.depth()
    }

    #[must_use]
    pub fn active_request_count(&self) -> usize {
        self.inner.state.borrow().requests.len()
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.inner.save_in_progress.get()
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn subscribe(&self, listener: Rc<dyn DataSourceListener>) -> ListenerId {
        self.inner.listeners.borrow_mut().subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().unsubscribe(id)
    }

    fn listeners(&self) -> Vec<Rc<dyn DataSourceListener>> {
        self.inner.listeners.borrow().snapshot()
    }

    fn emit_data_updated(&self) {
        let listeners = self.listeners();
        if listeners.is_empty() {
            return;
        }
        let root = self.root();
        for listener in &listeners {
            listener.on_data_updated(&root);
        }
    }
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("DataSource")
            .field("breakdown", &state.selected_breakdown)
            .field("depth", &state.root.depth())
            .field("requests", &state.requests.len())
            .field("saving", &self.inner.save_in_progress.get())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Node flags
// ============================================================================

/// Level-1 requests flag the root; deeper ones flag each parent node.
fn set_loading(root: &mut BreakdownRoot, request: &PageRequest, loading: bool) {
    if request.parents.is_empty() {
        root.meta.loading = loading;
        return;
    }
    for id in &request.parents {
        if let Some(node) = root.find_node_mut(id) {
            node.meta.loading = loading;
        }
    }
}

fn set_error(root: &mut BreakdownRoot, request: &PageRequest) {
    if request.parents.is_empty() {
        root.meta.error = true;
        return;
    }
    for id in &request.parents {
        if let Some(node) = root.find_node_mut(id) {
            node.meta.error = true;
        }
    }
}
