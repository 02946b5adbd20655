//! Tree-to-rows parser.
//!
//! Flattens a [`BreakdownRoot`](crate::model::BreakdownRoot) into an ordered
//! list of [`GridRow`]s: stats rows, group rows and the breakdown rows that
//! close incomplete or empty nodes. Display rows live in a parser-owned map
//! keyed by [`RowKey`], so repeated parses hand back the same row objects.

mod parse;
mod rows;

pub use parse::{set_collapsed, update_visibility, Parser};
pub use rows::{GridRow, ParsedGrid, RowData, RowKey, RowType};
