//! The static column catalogue and its rule types.

use crate::model::{Breakdown, Level};
use serde::{Deserialize, Serialize};

/// How a column's cells are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Breakdown,
    StateSelector,
    Status,
    Text,
    Number,
    Currency,
    Percent,
    Seconds,
    DateTime,
    Performance,
}

/// Column picker category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Management,
    Costs,
    TrafficAcquisition,
    AudienceMetrics,
    Conversions,
    Pixels,
    Goals,
}

impl CategoryKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Management => "Management",
            Self::Costs => "Costs",
            Self::TrafficAcquisition => "Traffic Acquisition",
            Self::AudienceMetrics => "Audience Metrics",
            Self::Conversions => "Google & Adobe Analytics Goals",
            Self::Pixels => "Pixels",
            Self::Goals => "Campaign Goals",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Management,
            Self::Costs,
            Self::TrafficAcquisition,
            Self::AudienceMetrics,
            Self::Conversions,
            Self::Pixels,
            Self::Goals,
        ]
    }
}

/// Family of columns generated at runtime from account data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicFamily {
    ConversionGoals,
    Pixels,
    CampaignGoals,
}

impl DynamicFamily {
    #[must_use]
    pub const fn category(&self) -> CategoryKind {
        match self {
            Self::ConversionGoals => CategoryKind::Conversions,
            Self::Pixels => CategoryKind::Pixels,
            Self::CampaignGoals => CategoryKind::Goals,
        }
    }

    #[must_use]
    pub const fn placeholder_field(&self) -> &'static str {
        match self {
            Self::ConversionGoals => "conversion_goals_placeholder",
            Self::Pixels => "pixels_placeholder",
            Self::CampaignGoals => "campaign_goals_placeholder",
        }
    }
}

// ============================================================================
// Visibility and exceptions
// ============================================================================

/// Whether a column is offered at all, resolved once per grid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Always,
    Never,
    RequiresCapability(String),
    /// First rule matching the level and base breakdown decides; no match hides.
    ConditionalOn(Vec<CustomException>),
}

impl Visibility {
    /// Resolve against a level, a breakdown path and a capability set.
    #[must_use]
    pub fn resolve(
        &self,
        level: Level,
        path: &[Breakdown],
        has_capability: impl Fn(&str) -> bool,
    ) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::RequiresCapability(name) => has_capability(name),
            Self::ConditionalOn(rules) => rules
                .iter()
                .find(|rule| rule.matches(level, path))
                .is_some_and(|rule| rule.shown),
        }
    }
}

/// A rule pinning availability for one level and base breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomException {
    pub level: Level,
    pub breakdown: Breakdown,
    pub shown: bool,
}

impl CustomException {
    #[must_use]
    pub fn matches(&self, level: Level, path: &[Breakdown]) -> bool {
        self.level == level && path.first() == Some(&self.breakdown)
    }
}

/// Restricts where a column is available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnExceptions {
    pub levels: Option<Vec<Level>>,
    pub breakdowns: Option<Vec<Breakdown>>,
    /// Only the base breakdown (`path[0]`) is checked against `breakdowns`.
    pub breakdown_base_level_only: bool,
    /// Evaluated last; a matching rule overrides everything above.
    pub custom: Vec<CustomException>,
}

impl ColumnExceptions {
    /// Whether a column with these exceptions is available.
    #[must_use]
    pub fn allows(&self, level: Level, path: &[Breakdown]) -> bool {
        if let Some(rule) = self.custom.iter().find(|rule| rule.matches(level, path)) {
            return rule.shown;
        }
        let level_ok = self.levels.as_ref().map_or(true, |levels| levels.contains(&level));
        let breakdown_ok = self.breakdowns.as_ref().map_or(true, |allowed| {
            if self.breakdown_base_level_only {
                path.first().is_some_and(|base| allowed.contains(base))
            } else {
                path.iter().any(|b| allowed.contains(b))
            }
        });
        level_ok && breakdown_ok
    }
}

// ============================================================================
// Column spec
// ============================================================================

/// A catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: String,
    pub name: String,
    pub help: Option<String>,
    pub column_type: ColumnType,
    pub category: CategoryKind,
    pub shown: Visibility,
    /// Always visible; cannot be toggled off.
    pub permanent: bool,
    /// Visible when no preference says otherwise.
    pub default: bool,
    pub orderable: bool,
    pub order_field: Option<String>,
    pub totals: bool,
    pub supports_refunds: bool,
    pub editable: bool,
    pub exceptions: ColumnExceptions,
    /// Marks the insertion point of a dynamic family; never rendered.
    pub placeholder: Option<DynamicFamily>,
}

impl ColumnSpec {
    /// A visible, orderable column with totals.
    #[must_use]
    pub fn new(field: &str, name: &str, column_type: ColumnType, category: CategoryKind) -> Self {
        Self {
            field: field.to_string(),
            name: name.to_string(),
            help: None,
            column_type,
            category,
            shown: Visibility::Always,
            permanent: false,
            default: true,
            orderable: true,
            order_field: None,
            totals: true,
            supports_refunds: false,
            editable: false,
            exceptions: ColumnExceptions::default(),
            placeholder: None,
        }
    }

    fn placeholder(family: DynamicFamily) -> Self {
        let mut spec = Self::new(
            family.placeholder_field(),
            "",
            ColumnType::Number,
            family.category(),
        );
        spec.shown = Visibility::Never;
        spec.default = false;
        spec.orderable = false;
        spec.totals = false;
        spec.placeholder = Some(family);
        spec
    }

    #[must_use]
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    #[must_use]
    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.default = false;
        self
    }

    #[must_use]
    pub fn unordered(mut self) -> Self {
        self.orderable = false;
        self
    }

    #[must_use]
    pub fn without_totals(mut self) -> Self {
        self.totals = false;
        self
    }

    #[must_use]
    pub fn refunds(mut self) -> Self {
        self.supports_refunds = true;
        self
    }

    #[must_use]
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: &str) -> Self {
        self.order_field = Some(field.to_string());
        self
    }

    #[must_use]
    pub fn capability(mut self, name: &str) -> Self {
        self.shown = Visibility::RequiresCapability(name.to_string());
        self
    }

    #[must_use]
    pub fn levels(mut self, levels: &[Level]) -> Self {
        self.exceptions.levels = Some(levels.to_vec());
        self
    }

    #[must_use]
    pub fn breakdowns(mut self, breakdowns: &[Breakdown]) -> Self {
        self.exceptions.breakdowns = Some(breakdowns.to_vec());
        self
    }

    #[must_use]
    pub fn base_level_only(mut self) -> Self {
        self.exceptions.breakdown_base_level_only = true;
        self
    }

    #[must_use]
    pub fn custom(mut self, level: Level, breakdown: Breakdown, shown: bool) -> Self {
        self.exceptions.custom.push(CustomException {
            level,
            breakdown,
            shown,
        });
        self
    }

    /// Field used when ordering by this column.
    #[must_use]
    pub fn order_field(&self) -> &str {
        self.order_field.as_deref().unwrap_or(&self.field)
    }
}

// ============================================================================
// Catalogue
// ============================================================================

const ENTITY_BASES: &[Breakdown] = &[
    Breakdown::Account,
    Breakdown::Campaign,
    Breakdown::AdGroup,
    Breakdown::ContentAd,
];

/// Every column the grid knows about, in display order.
#[must_use]
pub fn catalogue() -> Vec<ColumnSpec> {
    use Breakdown as B;
    use CategoryKind::{AudienceMetrics, Costs, Goals, Management, TrafficAcquisition};
    use ColumnType as T;
    use Level as L;

    vec![
        // Management
        ColumnSpec::new("state", "", T::StateSelector, Management)
            .help("A setting for enabling and pausing entities.")
            .permanent()
            .without_totals()
            .order_by("state")
            .breakdowns(&[B::Campaign, B::AdGroup, B::ContentAd, B::MediaSource])
            .base_level_only()
            .custom(L::AllAccounts, B::MediaSource, false),
        ColumnSpec::new("name", "Name", T::Breakdown, Management)
            .permanent()
            .without_totals(),
        ColumnSpec::new("status", "Status", T::Status, Management)
            .permanent()
            .without_totals(),
        ColumnSpec::new("performance", "Performance", T::Performance, Management)
            .help("Goal performance indicator.")
            .without_totals()
            .levels(&[L::Accounts, L::Campaigns, L::AdGroups])
            .breakdowns(&[B::Campaign, B::AdGroup, B::ContentAd])
            .base_level_only(),
        ColumnSpec::new("agency", "Agency", T::Text, Management)
            .capability("can_view_agency")
            .without_totals()
            .levels(&[L::AllAccounts])
            .breakdowns(&[B::Account])
            .base_level_only(),
        ColumnSpec::new("account_type", "Account Type", T::Text, Management)
            .hidden()
            .without_totals()
            .levels(&[L::AllAccounts])
            .breakdowns(&[B::Account])
            .base_level_only(),
        ColumnSpec::new("default_account_manager", "Account Manager", T::Text, Management)
            .capability("can_see_managers")
            .hidden()
            .without_totals()
            .levels(&[L::AllAccounts])
            .breakdowns(&[B::Account])
            .base_level_only(),
        ColumnSpec::new("bid_cpc", "Bid CPC", T::Currency, Management)
            .help("Maximum bid price per click.")
            .editable()
            .without_totals()
            .breakdowns(&[B::MediaSource])
            .base_level_only()
            .levels(&[L::AdGroups]),
        ColumnSpec::new("daily_budget", "Daily Spend Cap", T::Currency, Management)
            .help("Maximum media spend per day.")
            .editable()
            .breakdowns(&[B::MediaSource])
            .base_level_only()
            .levels(&[L::AdGroups, L::Campaigns]),
        ColumnSpec::new("url", "URL", T::Text, Management)
            .without_totals()
            .unordered()
            .breakdowns(&[B::ContentAd, B::Publisher, B::Placement])
            .base_level_only(),
        ColumnSpec::new("upload_time", "Uploaded", T::DateTime, Management)
            .hidden()
            .without_totals()
            .breakdowns(&[B::ContentAd])
            .base_level_only(),
        // Costs
        ColumnSpec::new("media_cost", "Actual Media Spend", T::Currency, Costs)
            .capability("can_view_actual_costs")
            .hidden()
            .refunds(),
        ColumnSpec::new("etfm_cost", "Total Spend", T::Currency, Costs)
            .help("Sum of media spend, data cost and fees.")
            .refunds(),
        ColumnSpec::new("etf_cost", "Platform Spend", T::Currency, Costs)
            .capability("can_view_platform_cost")
            .hidden()
            .refunds(),
        ColumnSpec::new("license_fee", "License Fee", T::Currency, Costs)
            .capability("can_view_platform_cost")
            .hidden()
            .refunds(),
        ColumnSpec::new("margin", "Margin", T::Currency, Costs)
            .capability("can_view_agency_margin")
            .hidden()
            .refunds(),
        ColumnSpec::new("allocated_budgets", "Media Budgets", T::Currency, Costs)
            .hidden()
            .levels(&[L::AllAccounts, L::Accounts])
            .breakdowns(ENTITY_BASES)
            .base_level_only(),
        ColumnSpec::new("spend_projection", "Spend Projection", T::Currency, Costs)
            .capability("can_see_projections")
            .hidden()
            .levels(&[L::AllAccounts, L::Accounts])
            .breakdowns(&[B::Account, B::Campaign])
            .base_level_only(),
        // Traffic acquisition
        ColumnSpec::new("impressions", "Impressions", T::Number, TrafficAcquisition),
        ColumnSpec::new("clicks", "Clicks", T::Number, TrafficAcquisition),
        ColumnSpec::new("ctr", "CTR", T::Percent, TrafficAcquisition),
        ColumnSpec::new("etfm_cpc", "Avg. CPC", T::Currency, TrafficAcquisition),
        ColumnSpec::new("etfm_cpm", "Avg. CPM", T::Currency, TrafficAcquisition),
        ColumnSpec::new("video_start", "Video Start", T::Number, TrafficAcquisition).hidden(),
        ColumnSpec::new("video_complete", "Video Complete", T::Number, TrafficAcquisition)
            .hidden(),
        ColumnSpec::new("video_etfm_cpv", "Avg. CPV", T::Currency, TrafficAcquisition).hidden(),
        // Audience metrics
        ColumnSpec::new("visits", "Visits", T::Number, AudienceMetrics),
        ColumnSpec::new("unique_users", "Unique Users", T::Number, AudienceMetrics).hidden(),
        ColumnSpec::new("percent_new_users", "% New Users", T::Percent, AudienceMetrics)
            .hidden(),
        ColumnSpec::new("bounce_rate", "Bounce Rate", T::Percent, AudienceMetrics).hidden(),
        ColumnSpec::new("pv_per_visit", "Pageviews per Visit", T::Number, AudienceMetrics)
            .hidden(),
        ColumnSpec::new("avg_tos", "Time on Site", T::Seconds, AudienceMetrics).hidden(),
        ColumnSpec::new(
            "avg_etfm_cost_per_visit",
            "Avg. Cost per Visit",
            T::Currency,
            AudienceMetrics,
        )
        .hidden(),
        // Dynamic families
        ColumnSpec::placeholder(DynamicFamily::ConversionGoals),
        ColumnSpec::placeholder(DynamicFamily::Pixels),
        ColumnSpec::placeholder(DynamicFamily::CampaignGoals),
        ColumnSpec::new("total_seconds", "Total Seconds", T::Seconds, Goals).hidden(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_exception_wins() {
        let exceptions = ColumnExceptions {
            breakdowns: Some(vec![Breakdown::MediaSource]),
            breakdown_base_level_only: true,
            custom: vec![CustomException {
                level: Level::AllAccounts,
                breakdown: Breakdown::MediaSource,
                shown: false,
            }],
            ..ColumnExceptions::default()
        };
        assert!(exceptions.allows(Level::Accounts, &[Breakdown::MediaSource]));
        assert!(!exceptions.allows(Level::AllAccounts, &[Breakdown::MediaSource]));
    }

    #[test]
    fn test_breakdown_intersection_vs_base_only() {
        let mut exceptions = ColumnExceptions {
            breakdowns: Some(vec![Breakdown::Country]),
            ..ColumnExceptions::default()
        };
        let path = [Breakdown::Account, Breakdown::Country];
        assert!(exceptions.allows(Level::AllAccounts, &path));
        exceptions.breakdown_base_level_only = true;
        assert!(!exceptions.allows(Level::AllAccounts, &path));
    }

    #[test]
    fn test_conditional_visibility() {
        let visibility = Visibility::ConditionalOn(vec![CustomException {
            level: Level::Campaigns,
            breakdown: Breakdown::AdGroup,
            shown: true,
        }]);
        assert!(visibility.resolve(Level::Campaigns, &[Breakdown::AdGroup], |_| false));
        assert!(!visibility.resolve(Level::Accounts, &[Breakdown::Campaign], |_| false));
    }

    #[test]
    fn test_catalogue_fields_unique() {
        let specs = catalogue();
        let mut fields: Vec<_> = specs.iter().map(|c| c.field.as_str()).collect();
        fields.sort_unstable();
        fields.dedup();
        assert_eq!(fields.len(), specs.len());
    }
}
