//! Grid levels, breakdown dimensions and entities.
//!
//! A grid is opened at a [`Level`] (all accounts, one account, one campaign,
//! one ad group) and split into child rows by an ordered path of
//! [`Breakdown`] dimensions. Rows whose dimension is structural map back to
//! an [`Entity`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator joining parent ids into composite breakdown ids (`"3||33"`).
pub const ID_SEPARATOR: &str = "||";

// ============================================================================
// Level
// ============================================================================

/// The entity level a grid is opened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    AllAccounts,
    Accounts,
    Campaigns,
    AdGroups,
}

impl Level {
    /// Wire name of the level.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AllAccounts => "all_accounts",
            Self::Accounts => "accounts",
            Self::Campaigns => "campaigns",
            Self::AdGroups => "ad_groups",
        }
    }

    /// Parse a level from its wire name (case-insensitive, `-` accepted).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace('-', "_").as_str() {
            "all_accounts" | "all" => Some(Self::AllAccounts),
            "accounts" | "account" => Some(Self::Accounts),
            "campaigns" | "campaign" => Some(Self::Campaigns),
            "ad_groups" | "ad_group" | "adgroups" => Some(Self::AdGroups),
            _ => None,
        }
    }

    /// Entity type shown at this level, if the level is bound to an entity.
    #[must_use]
    pub const fn entity_type(&self) -> Option<EntityType> {
        match self {
            Self::AllAccounts => None,
            Self::Accounts => Some(EntityType::Account),
            Self::Campaigns => Some(EntityType::Campaign),
            Self::AdGroups => Some(EntityType::AdGroup),
        }
    }

    /// The structural breakdown that lists this level's children.
    #[must_use]
    pub const fn child_breakdown(&self) -> Breakdown {
        match self {
            Self::AllAccounts => Breakdown::Account,
            Self::Accounts => Breakdown::Campaign,
            Self::Campaigns => Breakdown::AdGroup,
            Self::AdGroups => Breakdown::ContentAd,
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::AllAccounts, Self::Accounts, Self::Campaigns, Self::AdGroups]
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Breakdown dimensions
// ============================================================================

/// A dimension by which aggregate stats are split into child rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakdown {
    Account,
    Campaign,
    AdGroup,
    ContentAd,
    #[serde(rename = "source")]
    MediaSource,
    Publisher,
    Placement,
    Country,
    State,
    Dma,
    DeviceType,
    Environment,
    OperatingSystem,
    Day,
    Week,
    Month,
}

/// Which breakdown group a dimension belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownKind {
    Base,
    Structure,
    Delivery,
    Time,
}

impl Breakdown {
    /// Wire name of the dimension.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Campaign => "campaign",
            Self::AdGroup => "ad_group",
            Self::ContentAd => "content_ad",
            Self::MediaSource => "source",
            Self::Publisher => "publisher",
            Self::Placement => "placement",
            Self::Country => "country",
            Self::State => "state",
            Self::Dma => "dma",
            Self::DeviceType => "device_type",
            Self::Environment => "environment",
            Self::OperatingSystem => "operating_system",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Human label used for column branding and breakdown pickers.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Account => "Account",
            Self::Campaign => "Campaign",
            Self::AdGroup => "Ad Group",
            Self::ContentAd => "Content Ad",
            Self::MediaSource => "Media Source",
            Self::Publisher => "Publisher",
            Self::Placement => "Placement",
            Self::Country => "Country",
            Self::State => "State / Region",
            Self::Dma => "DMA",
            Self::DeviceType => "Device",
            Self::Environment => "Environment",
            Self::OperatingSystem => "Operating System",
            Self::Day => "Day",
            Self::Week => "Week",
            Self::Month => "Month",
        }
    }

    /// Parse a dimension from its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|b| b.name() == normalized)
            .or(match normalized.as_str() {
                "media_source" => Some(Self::MediaSource),
                "device" => Some(Self::DeviceType),
                "os" => Some(Self::OperatingSystem),
                _ => None,
            })
    }

    /// Parse a comma-separated path such as `account,country,day`.
    pub fn parse_path(spec: &str) -> Result<Vec<Self>, String> {
        spec.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| Self::from_name(s).ok_or_else(|| format!("unknown breakdown '{}'", s.trim())))
            .collect()
    }

    #[must_use]
    pub const fn kind(&self) -> BreakdownKind {
        match self {
            Self::Account
            | Self::Campaign
            | Self::AdGroup
            | Self::ContentAd
            | Self::MediaSource
            | Self::Publisher
            | Self::Placement => BreakdownKind::Base,
            Self::Country
            | Self::State
            | Self::Dma
            | Self::DeviceType
            | Self::Environment
            | Self::OperatingSystem => BreakdownKind::Delivery,
            Self::Day | Self::Week | Self::Month => BreakdownKind::Time,
        }
    }

    /// Entity type for structural dimensions.
    #[must_use]
    pub const fn entity_type(&self) -> Option<EntityType> {
        match self {
            Self::Account => Some(EntityType::Account),
            Self::Campaign => Some(EntityType::Campaign),
            Self::AdGroup => Some(EntityType::AdGroup),
            Self::ContentAd => Some(EntityType::ContentAd),
            _ => None,
        }
    }

    /// Whether rows of this dimension represent entities.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        self.entity_type().is_some()
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Account,
            Self::Campaign,
            Self::AdGroup,
            Self::ContentAd,
            Self::MediaSource,
            Self::Publisher,
            Self::Placement,
            Self::Country,
            Self::State,
            Self::Dma,
            Self::DeviceType,
            Self::Environment,
            Self::OperatingSystem,
            Self::Day,
            Self::Week,
            Self::Month,
        ]
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Account,
    Campaign,
    AdGroup,
    ContentAd,
}

impl EntityType {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Campaign => "campaign",
            Self::AdGroup => "ad_group",
            Self::ContentAd => "content_ad",
        }
    }
}

/// A business object a row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub id: u64,
}

impl Entity {
    #[must_use]
    pub const fn new(entity_type: EntityType, id: u64) -> Self {
        Self { entity_type, id }
    }

    /// Derive the entity of a row from its position in the breakdown path.
    ///
    /// The row's own dimension is `path[level - 1]`; only structural
    /// dimensions with a numeric leaf id yield an entity.
    #[must_use]
    pub fn from_breakdown(path: &[Breakdown], level: usize, breakdown_id: &str) -> Option<Self> {
        let dimension = path.get(level.checked_sub(1)?)?;
        let entity_type = dimension.entity_type()?;
        let id = leaf_id(breakdown_id).parse().ok()?;
        Some(Self::new(entity_type, id))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type.name(), self.id)
    }
}

// ============================================================================
// Composite breakdown ids
// ============================================================================

/// Last segment of a composite id (`"3||33"` → `"33"`).
#[must_use]
pub fn leaf_id(breakdown_id: &str) -> &str {
    breakdown_id
        .rsplit_once(ID_SEPARATOR)
        .map_or(breakdown_id, |(_, leaf)| leaf)
}

/// Parent part of a composite id (`"3||33"` → `"3"`, `"3"` → `""`).
#[must_use]
pub fn parent_id(breakdown_id: &str) -> &str {
    breakdown_id
        .rsplit_once(ID_SEPARATOR)
        .map_or("", |(parent, _)| parent)
}

/// Join a parent id and a leaf id into a composite id.
#[must_use]
pub fn join_id(parent: &str, leaf: &str) -> String {
    if parent.is_empty() {
        leaf.to_string()
    } else {
        format!("{parent}{ID_SEPARATOR}{leaf}")
    }
}
