//! Campaign goals, conversion goals and conversion pixels.
//!
//! These drive the dynamic columns injected into a resolved column list.

use serde::{Deserialize, Serialize};

/// Attribution windows offered for pixel conversions, in hours.
pub const CONVERSION_WINDOWS: &[u32] = &[24, 168, 720, 2160];

/// Human label for a conversion window.
#[must_use]
pub fn conversion_window_label(hours: u32) -> String {
    match hours {
        24 => "1 day".to_string(),
        h if h % 24 == 0 => format!("{} days", h / 24),
        h => format!("{h} hours"),
    }
}

/// Click-through or view-through attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionModel {
    Click,
    View,
}

impl AttributionModel {
    /// Field-name suffix for the model (click is the unsuffixed default).
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Click => "",
            Self::View => "_view",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Click => "Click attribution",
            Self::View => "View attribution",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Click, Self::View]
    }
}

/// A conversion pixel owned by the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub id: u64,
    pub name: String,
    /// Field-name prefix, e.g. `pixel_7`.
    pub prefix: String,
    #[serde(default)]
    pub archived: bool,
}

/// How a conversion goal is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionGoalType {
    Pixel,
    Ga,
    Omniture,
}

/// A conversion goal defined on the campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionGoal {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub goal_type: ConversionGoalType,
    /// Pixel prefix for pixel goals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_window: Option<u32>,
}

impl ConversionGoal {
    /// Field carrying the goal's conversion count.
    #[must_use]
    pub fn field(&self) -> String {
        match (self.goal_type, &self.pixel_prefix, self.conversion_window) {
            (ConversionGoalType::Pixel, Some(prefix), Some(window)) => format!("{prefix}_{window}"),
            _ => format!("conversion_goal_{}", self.id),
        }
    }

    /// Field carrying the cost per conversion.
    #[must_use]
    pub fn cost_field(&self) -> String {
        format!("avg_etfm_cost_per_{}", self.field())
    }
}

/// Optimisation target of a campaign goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignGoalType {
    TimeOnSite,
    MaxBounceRate,
    PagesPerSession,
    Cpa,
    Cpc,
    NewUniqueVisitors,
    Cpv,
    Cpm,
}

/// A campaign goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignGoal {
    pub id: u64,
    #[serde(rename = "type")]
    pub goal_type: CampaignGoalType,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_goal: Option<ConversionGoal>,
}

impl CampaignGoal {
    /// The column that tracks this goal, if any.
    #[must_use]
    pub fn column_field(&self) -> Option<String> {
        match self.goal_type {
            CampaignGoalType::TimeOnSite => Some("avg_tos".to_string()),
            CampaignGoalType::MaxBounceRate => Some("bounce_rate".to_string()),
            CampaignGoalType::PagesPerSession => Some("pv_per_visit".to_string()),
            CampaignGoalType::Cpc => Some("etfm_cpc".to_string()),
            CampaignGoalType::Cpm => Some("etfm_cpm".to_string()),
            CampaignGoalType::NewUniqueVisitors => Some("percent_new_users".to_string()),
            CampaignGoalType::Cpv => Some("avg_etfm_cost_per_visit".to_string()),
            CampaignGoalType::Cpa => self.conversion_goal.as_ref().map(ConversionGoal::cost_field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_labels() {
        assert_eq!(conversion_window_label(24), "1 day");
        assert_eq!(conversion_window_label(168), "7 days");
        assert_eq!(conversion_window_label(5), "5 hours");
    }

    #[test]
    fn test_conversion_goal_fields() {
        let ga = ConversionGoal {
            id: "12".into(),
            name: "Signup".into(),
            goal_type: ConversionGoalType::Ga,
            pixel_prefix: None,
            conversion_window: None,
        };
        assert_eq!(ga.field(), "conversion_goal_12");
        assert_eq!(ga.cost_field(), "avg_etfm_cost_per_conversion_goal_12");

        let pixel = ConversionGoal {
            goal_type: ConversionGoalType::Pixel,
            pixel_prefix: Some("pixel_7".into()),
            conversion_window: Some(168),
            ..ga
        };
        assert_eq!(pixel.field(), "pixel_7_168");
    }

    #[test]
    fn test_cpa_goal_needs_conversion_goal() {
        let goal = CampaignGoal {
            id: 1,
            goal_type: CampaignGoalType::Cpa,
            primary: true,
            conversion_goal: None,
        };
        assert_eq!(goal.column_field(), None);
    }
}
