//! Grid metadata: what a grid at one level offers.

use super::dimensions::{Breakdown, Entity, Level};
use super::goals::{CampaignGoal, ConversionGoal, Pixel};
use crate::registry::{BreakdownGroups, ColumnCategory, GridColumn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Level, capabilities, columns and breakdown options of one grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    pub capabilities: BTreeSet<String>,
    pub breakdown_groups: BreakdownGroups,
    /// Columns resolved for [`default_breakdown`](Self::default_breakdown).
    pub columns: Vec<GridColumn>,
    pub categories: Vec<ColumnCategory>,
    pub campaign_goals: Vec<CampaignGoal>,
    pub conversion_goals: Vec<ConversionGoal>,
    pub pixels: Vec<Pixel>,
}

impl Metadata {
    /// The path a fresh grid starts with: the first base dimension.
    #[must_use]
    pub fn default_breakdown(&self) -> Vec<Breakdown> {
        self.breakdown_groups.default_base().into_iter().collect()
    }

    #[must_use]
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    /// Look up a resolved column by field.
    #[must_use]
    pub fn column(&self, field: &str) -> Option<&GridColumn> {
        self.columns.iter().find(|c| c.field == field)
    }
}
