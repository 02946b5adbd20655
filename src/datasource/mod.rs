//! Breakdown data source.
//!
//! [`DataSource`] owns the tree of fetched breakdown data. It issues one
//! combined request per level, merges the returned pages into the tree and
//! walks down the selected breakdown path level by level. Requests carry a
//! cancellation token; a full reload or a breakdown change cancels whatever
//! is in flight, so stale responses never reach the tree.
//!
//! The pure tree operations live in [`tree`]; listeners are notified through
//! [`DataSourceListener`].

mod events;
mod requests;
mod source;
pub mod tree;

pub use events::{DataSourceListener, ListenerId, Listeners};
pub use requests::{ActiveRequest, ActiveRequests, RequestFuture};
pub use source::{DataFuture, DataSource};
