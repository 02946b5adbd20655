//! Bookkeeping of in-flight page requests.

use crate::error::Result;
use crate::model::{Breakdown, PageRequest};
use futures::future::{LocalBoxFuture, Shared};
use tokio_util::sync::CancellationToken;

/// A fetch chain as handed out to callers; cloning shares the outcome.
pub type RequestFuture = Shared<LocalBoxFuture<'static, Result<()>>>;

/// One registered fetch.
pub struct ActiveRequest {
    pub id: u64,
    pub config: PageRequest,
    pub cancel: CancellationToken,
    pub future: RequestFuture,
}

impl std::fmt::Debug for ActiveRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRequest")
            .field("id", &self.id)
            .field("level", &self.config.level)
            .field("breakdown", &self.config.breakdown)
            .field("parents", &self.config.parents.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Set of registered fetches.
#[derive(Debug, Default)]
pub struct ActiveRequests {
    next_id: u64,
    requests: Vec<ActiveRequest>,
}

impl ActiveRequests {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for a request about to be registered.
    pub fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn register(&mut self, request: ActiveRequest) {
        tracing::debug!(
            "Registered request {} (level {}, {} parents)",
            request.id,
            request.config.level,
            request.config.parents.len()
        );
        self.requests.push(request);
    }

    /// Unregister a request; a no-op when it was already removed.
    pub fn remove(&mut self, id: u64) -> Option<ActiveRequest> {
        let idx = self.requests.iter().position(|r| r.id == id)?;
        Some(self.requests.remove(idx))
    }

    /// Cancel and unregister every request.
    pub fn abort_all(&mut self) -> Vec<ActiveRequest> {
        let aborted: Vec<_> = self.requests.drain(..).collect();
        for request in &aborted {
            tracing::debug!("Aborting request {} (level {})", request.id, request.config.level);
            request.cancel.cancel();
        }
        aborted
    }

    /// The future of the only active request, if it fetches exactly `path`.
    ///
    /// With more than one request in flight nothing is reused.
    #[must_use]
    pub fn reusable(&self, path: &[Breakdown]) -> Option<RequestFuture> {
        match self.requests.as_slice() {
            [only] if only.config.breakdown == path => Some(only.future.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveRequest> {
        self.requests.iter()
    }
}
