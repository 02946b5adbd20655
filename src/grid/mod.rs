//! Grid facade and the UI state kept beside the tree.
//!
//! - [`GridApi`]: loading, ordering, breakdown changes and saves, with rows
//!   re-parsed on every tree change
//! - [`ColumnState`]: resolved columns and their visibility
//! - [`Selection`]: selected rows
//! - [`GridListener`]: change notifications for a rendering layer

mod api;
mod columns;
mod events;
mod selection;

pub use api::GridApi;
pub use columns::ColumnState;
pub use events::GridListener;
pub use selection::Selection;
