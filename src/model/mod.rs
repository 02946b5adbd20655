//! Domain model of the breakdown grid.
//!
//! Levels and breakdown dimensions, the fetched-data tree, cell values,
//! query configuration, goals, metadata and the page payloads exchanged
//! with endpoints.

mod dimensions;
mod goals;
mod metadata;
mod page;
mod query;
mod stats;
mod tree;

pub use dimensions::*;
pub use goals::*;
pub use metadata::*;
pub use page::*;
pub use query::*;
pub use stats::*;
pub use tree::*;
