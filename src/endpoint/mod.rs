//! Backend endpoints.
//!
//! The data source talks to a [`BreakdownEndpoint`]. Transports implement the
//! lower-level [`BackendApi`] and are wrapped in an [`EndpointAdapter`], which
//! turns raw payloads into tree rows and resolves metadata columns.
//!
//! Available transports:
//! - [`FixtureBackend`]: JSON dataset held in memory
//! - `HttpBackend`: REST backend over `reqwest` (feature `http`)

mod adapter;
mod fixture;
#[cfg(feature = "http")]
mod http;
mod traits;

pub use adapter::{
    convert_breakdown, convert_patch, convert_row, convert_values, EndpointAdapter,
    BREAKDOWN_NAME_FIELD,
};
pub use fixture::{FixtureBackend, FixtureDataset, FixtureRow};
#[cfg(feature = "http")]
pub use http::HttpBackend;
pub use traits::{BackendApi, BreakdownEndpoint, EndpointResult};
