//! Column and breakdown registry.
//!
//! Static rule tables mapping level × breakdown path × capabilities to the
//! columns a grid offers, plus the breakdown dimensions available per level.
//! Everything here is pure lookup; a [`ColumnRegistry`] is built once and
//! shared behind an `Rc` by the grids and adapters using it.
//!
//! ```
//! use std::collections::BTreeSet;
//! use zem_grid::model::{Breakdown, Level};
//! use zem_grid::registry::ColumnRegistry;
//!
//! let registry = ColumnRegistry::new();
//! let columns = registry.resolve_columns(Level::AdGroups, &[Breakdown::ContentAd], &BTreeSet::new());
//! assert!(columns.iter().any(|c| c.field == "state"));
//! ```

mod columns;
mod dynamic;
mod groups;
mod resolve;

pub use columns::{
    catalogue, CategoryKind, ColumnExceptions, ColumnSpec, ColumnType, CustomException,
    DynamicFamily, Visibility,
};
pub use dynamic::inject_dynamic_columns;
pub use groups::{build_categories, categorize, BreakdownGroups, ColumnCategory};
pub use resolve::{resolve_columns, GridColumn, REFUND_SUFFIX};

use crate::model::{BackendMetadata, Breakdown, Entity, Level, Metadata};
use std::collections::{BTreeSet, HashMap};

/// The column catalogue with a field index.
#[derive(Debug, Clone)]
pub struct ColumnRegistry {
    specs: Vec<ColumnSpec>,
    index: HashMap<String, usize>,
}

impl ColumnRegistry {
    /// Registry over the built-in catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_specs(catalogue())
    }

    /// Registry over a custom catalogue. Later duplicates of a field are
    /// unreachable through [`spec`](Self::spec).
    #[must_use]
    pub fn with_specs(specs: Vec<ColumnSpec>) -> Self {
        let mut index = HashMap::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            index.entry(spec.field.clone()).or_insert(idx);
        }
        Self { specs, index }
    }

    #[must_use]
    pub fn specs(&self) -> &[ColumnSpec] {
        &self.specs
    }

    #[must_use]
    pub fn spec(&self, field: &str) -> Option<&ColumnSpec> {
        self.index.get(field).map(|&idx| &self.specs[idx])
    }

    #[must_use]
    pub fn resolve_columns(
        &self,
        level: Level,
        path: &[Breakdown],
        capabilities: &BTreeSet<String>,
    ) -> Vec<GridColumn> {
        resolve_columns(&self.specs, level, path, capabilities)
    }

    #[must_use]
    pub fn breakdown_groups(&self, level: Level) -> BreakdownGroups {
        BreakdownGroups::for_level(level)
    }

    #[must_use]
    pub fn categories(&self, columns: &[GridColumn]) -> Vec<ColumnCategory> {
        build_categories(columns)
    }

    /// Columns and categories for `path`, with the metadata's goals and
    /// pixels injected.
    #[must_use]
    pub fn columns_for(
        &self,
        metadata: &Metadata,
        path: &[Breakdown],
    ) -> (Vec<GridColumn>, Vec<ColumnCategory>) {
        let mut columns = self.resolve_columns(metadata.level, path, &metadata.capabilities);
        let mut categories = self.categories(&columns);
        inject_dynamic_columns(
            &mut columns,
            &mut categories,
            &metadata.campaign_goals,
            &metadata.conversion_goals,
            &metadata.pixels,
        );
        (columns, categories)
    }

    /// Build grid metadata from a backend description.
    #[must_use]
    pub fn metadata(&self, backend: BackendMetadata) -> Metadata {
        let breakdown_groups = self.breakdown_groups(backend.level);
        let entity = backend
            .level
            .entity_type()
            .zip(backend.id)
            .map(|(entity_type, id)| Entity::new(entity_type, id));
        let mut metadata = Metadata {
            level: backend.level,
            entity,
            capabilities: backend.capabilities.into_iter().collect(),
            breakdown_groups,
            columns: Vec::new(),
            categories: Vec::new(),
            campaign_goals: backend.campaign_goals,
            conversion_goals: backend.conversion_goals,
            pixels: backend.pixels,
        };
        let (columns, categories) = self.columns_for(&metadata, &metadata.default_breakdown());
        metadata.columns = columns;
        metadata.categories = categories;
        metadata
    }
}

impl Default for ColumnRegistry {
    fn default() -> Self {
        Self::new()
    }
}
