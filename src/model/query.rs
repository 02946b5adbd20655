//! Ordering, filtering and date-range configuration of a data source.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Order
// ============================================================================

/// Sort order as a field plus direction (`"-clicks"` is descending clicks).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Order {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Parse the wire form (`"-field"` or `"field"`).
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        spec.strip_prefix('-')
            .map_or_else(|| Self::asc(spec), Self::desc)
    }

    /// Same field, opposite direction; a different field starts descending.
    #[must_use]
    pub fn toggled_for(&self, field: &str) -> Self {
        if self.field == field {
            Self {
                field: self.field.clone(),
                descending: !self.descending,
            }
        } else {
            Self::desc(field)
        }
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::desc("etfm_cost")
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

impl From<Order> for String {
    fn from(order: Order) -> Self {
        order.to_string()
    }
}

impl From<String> for Order {
    fn from(spec: String) -> Self {
        Self::parse(&spec)
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Publisher list status filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherStatus {
    #[default]
    All,
    Active,
    Blacklisted,
    Whitelisted,
}

/// Row filters forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridFilters {
    pub show_archived: bool,
    pub filtered_sources: Vec<String>,
    pub filtered_agencies: Vec<String>,
    pub filtered_account_types: Vec<String>,
    pub filtered_businesses: Vec<String>,
    pub publisher_status: PublisherStatus,
}

impl GridFilters {
    /// Whether no filter narrows the result.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        !self.show_archived
            && self.filtered_sources.is_empty()
            && self.filtered_agencies.is_empty()
            && self.filtered_account_types.is_empty()
            && self.filtered_businesses.is_empty()
            && self.publisher_status == PublisherStatus::All
    }
}

// ============================================================================
// Date range
// ============================================================================

/// Inclusive reporting date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range; `None` when `end` precedes `start`.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The `days`-day window ending on `end` (inclusive).
    #[must_use]
    pub fn last_days(end: NaiveDate, days: u64) -> Self {
        let start = end
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(end);
        Self { start, end }
    }

    /// Number of days covered, both ends included.
    #[must_use]
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::last_days(chrono::Local::now().date_naive(), 30)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Everything besides the breakdown path that shapes a page request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub order: Order,
    pub filters: GridFilters,
    pub date_range: DateRange,
}
