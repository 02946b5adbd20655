//! Endpoint traits.
//!
//! [`BreakdownEndpoint`] is what the data source consumes. [`BackendApi`] is
//! the raw-payload seam a transport implements; wrap it in an
//! [`EndpointAdapter`](super::EndpointAdapter) to obtain an endpoint.
//!
//! Both traits are `?Send`: grids run on a single-threaded runtime.

use crate::error::EndpointErrorKind;
use crate::model::{
    BackendBreakdown, BackendMetadata, BackendPatch, BackendQuery, BreakdownPage,
    BreakdownPatch, EditPayload, Metadata, PageRequest, RowRef, SaveRequest,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Result alias for endpoint calls.
pub type EndpointResult<T> = std::result::Result<T, EndpointErrorKind>;

/// Capability the data source needs from a backend.
#[async_trait(?Send)]
pub trait BreakdownEndpoint {
    /// Grid metadata with resolved columns.
    async fn get_metadata(&self) -> EndpointResult<Metadata>;

    /// One page per parent listed in `request` (one page for level 1).
    ///
    /// Implementations should resolve to [`EndpointErrorKind::Aborted`]
    /// promptly once `cancel` fires.
    async fn get_page(
        &self,
        request: &PageRequest,
        cancel: &CancellationToken,
    ) -> EndpointResult<Vec<BreakdownPage>>;

    /// Persist settings of one row and return refreshed stats.
    async fn save(&self, row: &RowRef, request: &SaveRequest) -> EndpointResult<BreakdownPatch>;

    /// Data an editor needs for `row`.
    async fn edit_row(&self, row: &RowRef) -> EndpointResult<EditPayload>;
}

/// Raw transport to a grid backend.
#[async_trait(?Send)]
pub trait BackendApi {
    /// Short name for logs (e.g. "fixture", "http").
    fn name(&self) -> &'static str;

    async fn fetch_metadata(&self) -> EndpointResult<BackendMetadata>;

    async fn fetch_breakdowns(
        &self,
        query: &BackendQuery,
        cancel: &CancellationToken,
    ) -> EndpointResult<Vec<BackendBreakdown>>;

    async fn save_stats(&self, row: &RowRef, request: &SaveRequest) -> EndpointResult<BackendPatch>;

    /// Editor payload for a row; not every backend offers one.
    async fn edit_row(&self, row: &RowRef) -> EndpointResult<serde_json::Value> {
        Err(EndpointErrorKind::Unsupported(format!(
            "{} (edit {})",
            self.name(),
            row.breakdown_id
        )))
    }
}

/// Shared backends, so callers can keep a handle next to the adapter.
#[async_trait(?Send)]
impl<T: BackendApi + ?Sized> BackendApi for std::rc::Rc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch_metadata(&self) -> EndpointResult<BackendMetadata> {
        (**self).fetch_metadata().await
    }

    async fn fetch_breakdowns(
        &self,
        query: &BackendQuery,
        cancel: &CancellationToken,
    ) -> EndpointResult<Vec<BackendBreakdown>> {
        (**self).fetch_breakdowns(query, cancel).await
    }

    async fn save_stats(&self, row: &RowRef, request: &SaveRequest) -> EndpointResult<BackendPatch> {
        (**self).save_stats(row, request).await
    }

    async fn edit_row(&self, row: &RowRef) -> EndpointResult<serde_json::Value> {
        (**self).edit_row(row).await
    }
}
