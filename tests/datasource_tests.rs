//! Integration tests for the breakdown data source.

use async_trait::async_trait;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use zem_grid::config::DataConfig;
use zem_grid::datasource::DataFuture;
use zem_grid::endpoint::EndpointResult;
use zem_grid::error::EndpointErrorKind;
use zem_grid::model::{
    BreakdownPage, BreakdownPatch, EditPayload, Metadata, PageRequest, RowPatch, RowRef,
    SaveRequest, SharedStats, StatsMap, StatsValue,
};
use zem_grid::{
    Breakdown, BreakdownEndpoint, BreakdownRoot, DataSource, DataSourceListener, EndpointAdapter,
    FixtureBackend, FixtureDataset, GridError,
};

// ============================================================================
// Helpers
// ============================================================================

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/account_grid.json")
}

fn data_config(page_sizes: &[usize]) -> DataConfig {
    DataConfig {
        page_sizes: page_sizes.to_vec(),
        default_order: "-clicks".to_string(),
        ..DataConfig::default()
    }
}

fn setup(backend: FixtureBackend, page_sizes: &[usize]) -> (DataSource, Rc<FixtureBackend>) {
    let backend = Rc::new(backend);
    let endpoint = Rc::new(EndpointAdapter::new(Rc::clone(&backend)));
    (DataSource::new(endpoint, &data_config(page_sizes)), backend)
}

fn account_grid() -> (DataSource, Rc<FixtureBackend>) {
    setup(FixtureBackend::from_path(&fixture_path()).unwrap(), &[60, 4, 5, 7])
}

fn level_one_ids(source: &DataSource) -> Vec<String> {
    source.with_root(|root| {
        root.breakdown
            .as_ref()
            .map(|node| node.rows.iter().map(|r| r.breakdown_id.clone()).collect())
            .unwrap_or_default()
    })
}

fn cell(source: &DataSource, row_id: &str, field: &str) -> Option<serde_json::Value> {
    source.with_root(|root| {
        root.find_row(row_id)
            .and_then(|row| row.stats.borrow().get(field).and_then(|c| c.value.clone()))
    })
}

/// Records what listeners observe.
#[derive(Default)]
struct Recorder {
    /// One entry per `on_data_updated`: whether the root was empty.
    resets: RefCell<Vec<bool>>,
    stats_batches: RefCell<Vec<usize>>,
    archived_rows: RefCell<Vec<String>>,
}

impl DataSourceListener for Recorder {
    fn on_data_updated(&self, root: &BreakdownRoot) {
        self.resets.borrow_mut().push(root.breakdown.is_none());
    }

    fn on_row_updated(&self, row: &zem_grid::model::RowEntry) {
        self.archived_rows.borrow_mut().push(row.breakdown_id.clone());
    }

    fn on_stats_updated(&self, stats: &[SharedStats]) {
        self.stats_batches.borrow_mut().push(stats.len());
    }
}

/// Fails every page request at one level.
struct FailingLevel {
    inner: EndpointAdapter<FixtureBackend>,
    level: usize,
}

#[async_trait(?Send)]
impl BreakdownEndpoint for FailingLevel {
    async fn get_metadata(&self) -> EndpointResult<Metadata> {
        self.inner.get_metadata().await
    }

    async fn get_page(
        &self,
        request: &PageRequest,
        cancel: &CancellationToken,
    ) -> EndpointResult<Vec<BreakdownPage>> {
        if request.level == self.level {
            return Err(EndpointErrorKind::Network("connection reset".to_string()));
        }
        self.inner.get_page(request, cancel).await
    }

    async fn save(&self, row: &RowRef, request: &SaveRequest) -> EndpointResult<BreakdownPatch> {
        self.inner.save(row, request).await
    }

    async fn edit_row(&self, row: &RowRef) -> EndpointResult<EditPayload> {
        self.inner.edit_row(row).await
    }
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn test_load_selects_default_breakdown() {
    let (source, backend) = account_grid();
    source.load_data(None, None, None).await.unwrap();

    assert_eq!(source.selected_breakdown(), vec![Breakdown::Campaign]);
    assert_eq!(level_one_ids(&source), vec!["31", "32"]);
    assert_eq!(backend.queries().len(), 1);
    source.with_root(|root| {
        let totals = root.stats.as_ref().unwrap();
        assert_eq!(totals.borrow().get("clicks").and_then(StatsValue::as_f64), Some(90.0));
    });
}

#[tokio::test]
async fn test_full_reload_resets_synchronously() {
    let (source, _) = account_grid();
    source.load_data(None, None, None).await.unwrap();

    let recorder = Rc::new(Recorder::default());
    source.subscribe(recorder.clone());
    let epoch = source.with_root(|root| root.epoch);

    let reload = source.load_data(None, None, None);
    assert_eq!(*recorder.resets.borrow(), vec![true]);
    assert_eq!(source.tree_depth(), 0);
    assert_eq!(source.with_root(|root| root.epoch), epoch + 1);

    reload.await.unwrap();
    assert_eq!(*recorder.resets.borrow(), vec![true, false]);
    assert_eq!(level_one_ids(&source), vec!["31", "32"]);
}

#[tokio::test]
async fn test_chained_depth_fetch() {
    let (source, backend) = account_grid();
    source.load_metadata(false).await.unwrap();
    source
        .set_breakdown(vec![Breakdown::Campaign, Breakdown::Country, Breakdown::Day], false)
        .await
        .unwrap();
    source.load_data(None, None, None).await.unwrap();

    let queries = backend.queries();
    assert_eq!(queries.len(), 3);
    for (i, query) in queries.iter().enumerate() {
        assert_eq!(query.breakdown.len(), i + 1);
    }
    assert!(queries[0].parents.is_empty());
    assert_eq!(queries[1].parents, vec!["31", "32"]);
    assert_eq!(queries[2].parents.len(), 4);
    assert_eq!(source.tree_depth(), 3);
    assert_eq!(cell(&source, "31||US||2026-10-02", "clicks"), Some(json!(20)));
}

#[tokio::test]
async fn test_load_more_continues_after_loaded_rows() {
    let (source, backend) = setup(FixtureBackend::from_path(&fixture_path()).unwrap(), &[1, 4]);
    source.load_data(None, None, None).await.unwrap();
    assert_eq!(level_one_ids(&source), vec!["31"]);
    source.with_root(|root| {
        let pagination = root.breakdown.as_ref().unwrap().pagination;
        assert_eq!(pagination.count, Some(2));
        assert!(!pagination.complete);
    });

    source.load_data(Some(""), None, None).await.unwrap();
    assert_eq!(level_one_ids(&source), vec!["31", "32"]);
    assert_eq!(backend.queries()[1].offset, 1);
    source.with_root(|root| {
        let pagination = root.breakdown.as_ref().unwrap().pagination;
        assert_eq!(pagination.limit, 2);
        assert!(pagination.complete);
    });
}

#[tokio::test]
async fn test_load_more_unknown_node() {
    let (source, _) = account_grid();
    source.load_data(None, None, None).await.unwrap();
    let err = source.load_data(Some("404"), None, None).await.unwrap_err();
    assert!(matches!(err, GridError::Validation(_)));
}

#[tokio::test]
async fn test_page_error_stays_on_node() {
    let dataset = FixtureDataset::from_path(&fixture_path()).unwrap();
    let endpoint = FailingLevel {
        inner: EndpointAdapter::new(FixtureBackend::new(dataset)),
        level: 2,
    };
    let source = DataSource::new(Rc::new(endpoint), &data_config(&[60, 4]));
    source.load_metadata(false).await.unwrap();
    source
        .set_breakdown(vec![Breakdown::Campaign, Breakdown::Country], false)
        .await
        .unwrap();

    let err = source.load_data(None, None, None).await.unwrap_err();
    assert!(matches!(err, GridError::PageFetch { .. }));
    assert_eq!(level_one_ids(&source), vec!["31", "32"]);
    source.with_root(|root| {
        assert!(!root.meta.error);
        for id in ["31", "32"] {
            let child = root.find_node(id).unwrap();
            assert!(child.meta.error);
            assert!(!child.meta.loading);
        }
    });
    assert_eq!(source.active_request_count(), 0);
}

#[tokio::test]
async fn test_metadata_failure_is_reported() {
    struct NoMetadata;

    #[async_trait(?Send)]
    impl BreakdownEndpoint for NoMetadata {
        async fn get_metadata(&self) -> EndpointResult<Metadata> {
            Err(EndpointErrorKind::Status {
                status: 503,
                message: "unavailable".to_string(),
            })
        }

        async fn get_page(
            &self,
            _request: &PageRequest,
            _cancel: &CancellationToken,
        ) -> EndpointResult<Vec<BreakdownPage>> {
            Ok(Vec::new())
        }

        async fn save(&self, _row: &RowRef, _request: &SaveRequest) -> EndpointResult<BreakdownPatch> {
            Ok(BreakdownPatch::default())
        }

        async fn edit_row(&self, row: &RowRef) -> EndpointResult<EditPayload> {
            Err(EndpointErrorKind::NotFound(row.breakdown_id.clone()))
        }
    }

    let source = DataSource::new(Rc::new(NoMetadata), &DataConfig::default());
    let err = source.load_data(None, None, None).await.unwrap_err();
    assert!(matches!(err, GridError::MetadataFetch { .. }));
    assert!(source.metadata().is_none());
}

// ============================================================================
// Breakdown changes and cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_same_path_reuses_in_flight_request() {
    let backend = FixtureBackend::from_path(&fixture_path())
        .unwrap()
        .with_latency(Duration::from_millis(100));
    let (source, backend) = setup(backend, &[60, 4]);
    source.load_metadata(false).await.unwrap();

    let first = source.load_data(None, None, None);
    let second = source.set_breakdown(vec![Breakdown::Campaign], true);
    assert_eq!(source.active_request_count(), 1);

    let (a, b) = tokio::join!(first, second);
    a.unwrap();
    b.unwrap();
    assert_eq!(backend.queries().len(), 1);
    assert_eq!(level_one_ids(&source), vec!["31", "32"]);
}

#[tokio::test(start_paused = true)]
async fn test_base_change_aborts_and_refetches() {
    let backend = FixtureBackend::from_path(&fixture_path())
        .unwrap()
        .with_latency(Duration::from_millis(100));
    let (source, backend) = setup(backend, &[60, 4]);
    source.load_metadata(false).await.unwrap();

    let mut first = source.load_data(None, None, None);
    assert!(futures::poll!(&mut first).is_pending());
    assert_eq!(backend.queries().len(), 1);

    let second = source.set_breakdown(vec![Breakdown::MediaSource], true);
    assert!(matches!(first.await, Err(GridError::Aborted)));
    second.await.unwrap();

    let queries = backend.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1].breakdown, vec![Breakdown::MediaSource]);
    assert_eq!(level_one_ids(&source), vec!["b1_outbrain", "b2_yahoo"]);
    source.with_root(|root| assert!(!root.breakdown.as_ref().unwrap().meta.loading));
}

#[tokio::test]
async fn test_deeper_path_fetches_only_new_level() {
    let (source, backend) = account_grid();
    source.load_data(None, None, None).await.unwrap();
    let before = source.with_root(|root| root.find_row("31").map(|r| Rc::clone(&r.stats)));

    source
        .set_breakdown(vec![Breakdown::Campaign, Breakdown::Country], true)
        .await
        .unwrap();

    let queries = backend.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1].breakdown, vec![Breakdown::Campaign, Breakdown::Country]);
    assert_eq!(queries[1].parents, vec!["31", "32"]);
    let after = source.with_root(|root| root.find_row("31").map(|r| Rc::clone(&r.stats)));
    assert!(Rc::ptr_eq(&before.unwrap(), &after.unwrap()));
    assert_eq!(source.tree_depth(), 2);

    // Dropping back to one level removes the children without a fetch.
    source
        .set_breakdown(vec![Breakdown::Campaign], true)
        .await
        .unwrap();
    assert_eq!(backend.queries().len(), 2);
    assert_eq!(source.tree_depth(), 1);
}

#[tokio::test]
async fn test_unchanged_path_without_fetch_is_a_no_op() {
    let (source, backend) = account_grid();
    source.load_data(None, None, None).await.unwrap();
    source
        .set_breakdown(vec![Breakdown::Campaign], false)
        .await
        .unwrap();
    assert_eq!(backend.queries().len(), 1);
    assert_eq!(level_one_ids(&source), vec!["31", "32"]);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_request_is_not_an_error() {
    let backend = FixtureBackend::from_path(&fixture_path())
        .unwrap()
        .with_latency(Duration::from_millis(100));
    let (source, _) = setup(backend, &[60, 4]);
    source.load_data(None, None, None).await.unwrap();

    let mut deeper = source.set_breakdown(vec![Breakdown::Campaign, Breakdown::Country], true);
    assert!(futures::poll!(&mut deeper).is_pending());
    assert_eq!(source.abort_requests(), 1);
    assert!(matches!(deeper.await, Err(GridError::Aborted)));

    source.with_root(|root| {
        assert!(!root.meta.error);
        assert!(!root.meta.loading);
        for id in ["31", "32"] {
            let child = root.find_node(id).unwrap();
            assert!(!child.meta.error);
            assert!(!child.meta.loading);
            assert!(child.is_placeholder());
        }
    });
}

#[tokio::test(start_paused = true)]
async fn test_truncated_path_reuses_in_flight_request() {
    use Breakdown::{Campaign, Country, Day};
    let backend = FixtureBackend::from_path(&fixture_path())
        .unwrap()
        .with_latency(Duration::from_millis(100));
    let (source, backend) = setup(backend, &[60, 4, 5]);
    source.load_metadata(false).await.unwrap();
    source
        .set_breakdown(vec![Campaign, Country, Day], false)
        .await
        .unwrap();

    // Level 1 lands after 100ms; level 2 is then in flight until 200ms.
    let mut full = source.load_data(None, None, None);
    assert!(tokio::time::timeout(Duration::from_millis(150), &mut full)
        .await
        .is_err());
    assert_eq!(source.active_request_count(), 1);
    assert_eq!(backend.queries().len(), 2);

    let truncated = source.set_breakdown(vec![Campaign, Country], true);
    assert_eq!(source.active_request_count(), 1);

    let (a, b) = tokio::join!(full, truncated);
    a.unwrap();
    b.unwrap();
    let queries = backend.queries();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|q| !q.breakdown.contains(&Day)));
    assert_eq!(source.tree_depth(), 2);
    assert_eq!(source.active_request_count(), 0);
}

// ============================================================================
// Saving and patches
// ============================================================================

fn sample_grid() -> (DataSource, Rc<FixtureBackend>) {
    setup(FixtureBackend::new(FixtureDataset::sample().unwrap()), &[60, 4])
}

async fn load_sources(source: &DataSource) {
    source.load_metadata(false).await.unwrap();
    source
        .set_breakdown(vec![Breakdown::MediaSource], true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_save_is_single_flight() {
    let (source, backend) = sample_grid();
    load_sources(&source).await;
    let recorder = Rc::new(Recorder::default());
    source.subscribe(recorder.clone());

    let first = source.save_data(json!(75.0), "b1_outbrain", "daily_budget");
    assert!(source.is_saving());
    let second = source
        .save_data(json!(80.0), "b1_outbrain", "daily_budget")
        .await;
    assert!(matches!(second, Err(GridError::SaveInProgress)));

    first.await.unwrap();
    assert!(!source.is_saving());
    assert_eq!(backend.save_count(), 1);
    assert_eq!(cell(&source, "b1_outbrain", "daily_budget"), Some(json!(75.0)));
    assert_eq!(*recorder.stats_batches.borrow(), vec![1]);
}

#[tokio::test]
async fn test_rejected_save_keeps_tree() {
    let (source, _) = sample_grid();
    load_sources(&source).await;

    let err = source
        .save_data(json!(99.0), "b2_yahoo", "daily_budget")
        .await
        .unwrap_err();
    let GridError::SaveRejected { payload } = err else {
        panic!("expected a rejection, got {err:?}");
    };
    assert_eq!(payload["errors"]["daily_budget"][0], json!("Source is paused"));
    assert_eq!(cell(&source, "b2_yahoo", "daily_budget"), Some(json!(20.0)));
    assert!(!source.is_saving());
}

#[tokio::test]
async fn test_dropped_save_releases_flag() {
    let (source, _) = sample_grid();
    load_sources(&source).await;

    drop(source.save_data(json!(1.0), "b1_outbrain", "daily_budget"));
    assert!(!source.is_saving());
}

#[tokio::test]
async fn test_partial_patch_preserves_fields() {
    let (source, _) = account_grid();
    source.load_data(None, None, None).await.unwrap();
    let recorder = Rc::new(Recorder::default());
    source.subscribe(recorder.clone());

    let mut stats = StatsMap::new();
    stats.insert(
        "clicks".to_string(),
        StatsValue {
            is_editable: Some(false),
            ..StatsValue::default()
        },
    );
    stats.insert("impressions".to_string(), StatsValue::new(5100));
    source.update_data(BreakdownPatch {
        rows: vec![RowPatch {
            breakdown_id: "31".to_string(),
            stats,
            archived: Some(true),
        }],
        totals: None,
    });

    assert_eq!(cell(&source, "31", "clicks"), Some(json!(50)));
    assert_eq!(cell(&source, "31", "impressions"), Some(json!(5100)));
    source.with_root(|root| {
        let row = root.find_row("31").unwrap();
        assert!(row.archived);
        assert_eq!(row.stats.borrow()["clicks"].is_editable, Some(false));
    });
    assert_eq!(*recorder.archived_rows.borrow(), vec!["31"]);
    assert_eq!(recorder.stats_batches.borrow().len(), 1);
}

#[tokio::test]
async fn test_edit_row_passes_through() {
    let (source, _) = sample_grid();
    load_sources(&source).await;
    let payload = source.edit_row("b1_outbrain").await.unwrap();
    assert_eq!(payload.row.breakdown_id, "b1_outbrain");
    assert_eq!(payload.data["breakdown_id"], json!("b1_outbrain"));
}

// ============================================================================
// Listener re-entrancy
// ============================================================================

/// Asks for the next base page the first time rows arrive.
#[derive(Default)]
struct LoadMoreOnData {
    source: RefCell<Option<DataSource>>,
    fired: Cell<bool>,
    pending: RefCell<Vec<DataFuture>>,
}

impl DataSourceListener for LoadMoreOnData {
    fn on_data_updated(&self, root: &BreakdownRoot) {
        if root.breakdown.is_none() || self.fired.replace(true) {
            return;
        }
        if let Some(source) = self.source.borrow().as_ref() {
            self.pending
                .borrow_mut()
                .push(source.load_data(Some(""), None, None));
        }
    }
}

#[tokio::test]
async fn test_listener_may_load_from_callback() {
    let (source, backend) = setup(FixtureBackend::from_path(&fixture_path()).unwrap(), &[1, 4]);
    let listener = Rc::new(LoadMoreOnData::default());
    *listener.source.borrow_mut() = Some(source.clone());
    source.subscribe(listener.clone());

    source.load_data(None, None, None).await.unwrap();
    let pending: Vec<_> = listener.pending.borrow_mut().drain(..).collect();
    assert_eq!(pending.len(), 1);
    for future in pending {
        future.await.unwrap();
    }
    listener.source.borrow_mut().take();

    assert_eq!(level_one_ids(&source), vec!["31", "32"]);
    assert_eq!(backend.queries().len(), 2);
    assert_eq!(backend.queries()[1].offset, 1);
    source.with_root(|root| assert!(root.breakdown.as_ref().unwrap().pagination.complete));
}

/// Patches a row while the archive notification for it is delivered.
#[derive(Default)]
struct PatchOnArchive {
    source: RefCell<Option<DataSource>>,
}

impl DataSourceListener for PatchOnArchive {
    fn on_row_updated(&self, row: &zem_grid::model::RowEntry) {
        if let Some(source) = self.source.borrow().as_ref() {
            source.update_data(BreakdownPatch {
                rows: vec![RowPatch {
                    breakdown_id: row.breakdown_id.clone(),
                    stats: [("clicks".to_string(), StatsValue::new(1))].into_iter().collect(),
                    archived: None,
                }],
                totals: None,
            });
        }
    }
}

#[tokio::test]
async fn test_listener_may_patch_from_row_callback() {
    let (source, _) = account_grid();
    source.load_data(None, None, None).await.unwrap();
    let listener = Rc::new(PatchOnArchive::default());
    *listener.source.borrow_mut() = Some(source.clone());
    source.subscribe(listener.clone());

    source.update_data(BreakdownPatch {
        rows: vec![RowPatch {
            breakdown_id: "31".into(),
            stats: StatsMap::new(),
            archived: Some(true),
        }],
        totals: None,
    });
    listener.source.borrow_mut().take();

    source.with_root(|root| assert!(root.find_row("31").unwrap().archived));
    assert_eq!(cell(&source, "31", "clicks"), Some(json!(1)));
}
