//! Runtime columns derived from goals and pixels.

use super::columns::{ColumnType, DynamicFamily};
use super::groups::{categorize, ColumnCategory};
use super::resolve::GridColumn;
use crate::model::{
    conversion_window_label, AttributionModel, CampaignGoal, CampaignGoalType, ConversionGoal,
    ConversionGoalType, Pixel, CONVERSION_WINDOWS,
};

/// Insert goal and pixel columns at their family placeholders.
///
/// Columns whose field already exists are skipped, so calling this again
/// with the same inputs changes nothing. Returns the number of inserted
/// columns.
pub fn inject_dynamic_columns(
    columns: &mut Vec<GridColumn>,
    categories: &mut Vec<ColumnCategory>,
    campaign_goals: &[CampaignGoal],
    conversion_goals: &[ConversionGoal],
    pixels: &[Pixel],
) -> usize {
    let mut inserted = 0;
    inserted += insert_family(
        columns,
        categories,
        DynamicFamily::ConversionGoals,
        conversion_goal_columns(conversion_goals),
    );
    inserted += insert_family(columns, categories, DynamicFamily::Pixels, pixel_columns(pixels));
    inserted += insert_family(
        columns,
        categories,
        DynamicFamily::CampaignGoals,
        campaign_goal_columns(campaign_goals),
    );
    promote_primary_goal(columns, campaign_goals);
    inserted
}

fn insert_family(
    columns: &mut Vec<GridColumn>,
    categories: &mut Vec<ColumnCategory>,
    family: DynamicFamily,
    generated: Vec<GridColumn>,
) -> usize {
    // Insert after the placeholder and whatever the family already holds.
    let Some(mut at) = columns
        .iter()
        .rposition(|c| c.placeholder == Some(family) || c.family == Some(family))
        .map(|idx| idx + 1)
    else {
        tracing::debug!("No {family:?} placeholder in column list, skipping");
        return 0;
    };

    let mut inserted = 0;
    for column in generated {
        if columns.iter().any(|c| c.field == column.field) {
            continue;
        }
        categorize(categories, &column);
        columns.insert(at, column);
        at += 1;
        inserted += 1;
    }
    inserted
}

fn conversion_goal_columns(goals: &[ConversionGoal]) -> Vec<GridColumn> {
    goals
        .iter()
        // Pixel goals are covered by the pixel family.
        .filter(|goal| goal.goal_type != ConversionGoalType::Pixel)
        .flat_map(|goal| {
            [
                GridColumn::dynamic(
                    DynamicFamily::ConversionGoals,
                    goal.field(),
                    goal.name.clone(),
                    ColumnType::Number,
                ),
                GridColumn::dynamic(
                    DynamicFamily::ConversionGoals,
                    goal.cost_field(),
                    format!("Avg. CPA ({})", goal.name),
                    ColumnType::Currency,
                ),
            ]
        })
        .collect()
}

fn pixel_columns(pixels: &[Pixel]) -> Vec<GridColumn> {
    let mut columns = Vec::new();
    for pixel in pixels.iter().filter(|p| !p.archived) {
        for attribution in AttributionModel::all() {
            for window in CONVERSION_WINDOWS {
                let field = format!("{}_{window}{}", pixel.prefix, attribution.suffix());
                let label = conversion_window_label(*window);
                let view = if *attribution == AttributionModel::View {
                    " - View"
                } else {
                    ""
                };

                let mut conversions = GridColumn::dynamic(
                    DynamicFamily::Pixels,
                    field.clone(),
                    format!("{} {label}{view}", pixel.name),
                    ColumnType::Number,
                );
                conversions.help = Some(format!("{} ({})", pixel.name, attribution.label()));
                conversions.subcategory = Some(pixel.name.clone());

                let mut cpa = GridColumn::dynamic(
                    DynamicFamily::Pixels,
                    format!("avg_etfm_cost_per_{field}"),
                    format!("CPA ({} {label}{view})", pixel.name),
                    ColumnType::Currency,
                );
                cpa.subcategory = Some(pixel.name.clone());

                columns.push(conversions);
                columns.push(cpa);
            }
        }
    }
    columns
}

fn campaign_goal_columns(goals: &[CampaignGoal]) -> Vec<GridColumn> {
    goals
        .iter()
        .map(|goal| {
            let mut column = GridColumn::dynamic(
                DynamicFamily::CampaignGoals,
                format!("performance_campaign_goal_{}", goal.id),
                format!("Performance ({})", goal_label(goal)),
                ColumnType::Performance,
            );
            column.totals = false;
            column.orderable = false;
            column
        })
        .collect()
}

fn goal_label(goal: &CampaignGoal) -> String {
    match goal.goal_type {
        CampaignGoalType::TimeOnSite => "Time on Site".to_string(),
        CampaignGoalType::MaxBounceRate => "Max Bounce Rate".to_string(),
        CampaignGoalType::PagesPerSession => "Pageviews per Visit".to_string(),
        CampaignGoalType::Cpc => "CPC".to_string(),
        CampaignGoalType::Cpm => "CPM".to_string(),
        CampaignGoalType::Cpv => "Cost per Visit".to_string(),
        CampaignGoalType::NewUniqueVisitors => "New Unique Visitors".to_string(),
        CampaignGoalType::Cpa => goal
            .conversion_goal
            .as_ref()
            .map_or_else(|| "CPA".to_string(), |cg| format!("CPA - {}", cg.name)),
    }
}

/// Show and flag the column tracking the primary campaign goal.
fn promote_primary_goal(columns: &mut [GridColumn], goals: &[CampaignGoal]) {
    let Some(field) = goals.iter().find(|g| g.primary).and_then(CampaignGoal::column_field) else {
        return;
    };
    for column in columns.iter_mut() {
        column.primary_goal = column.field == field;
        if column.primary_goal {
            column.visible = column.shown;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Breakdown, Level};
    use crate::registry::columns::catalogue;
    use crate::registry::groups::build_categories;
    use crate::registry::resolve::resolve_columns;
    use std::collections::BTreeSet;

    fn base_columns() -> (Vec<GridColumn>, Vec<ColumnCategory>) {
        let columns = resolve_columns(
            &catalogue(),
            Level::Campaigns,
            &[Breakdown::AdGroup],
            &BTreeSet::new(),
        );
        let categories = build_categories(&columns);
        (columns, categories)
    }

    fn pixel() -> Pixel {
        Pixel {
            id: 7,
            name: "Sale".into(),
            prefix: "pixel_7".into(),
            archived: false,
        }
    }

    #[test]
    fn test_pixel_columns_after_placeholder() {
        let (mut columns, mut categories) = base_columns();
        let inserted = inject_dynamic_columns(&mut columns, &mut categories, &[], &[], &[pixel()]);

        // conversions + CPA, per window, per attribution model
        assert_eq!(inserted, 2 * CONVERSION_WINDOWS.len() * 2);
        let placeholder = columns
            .iter()
            .position(|c| c.placeholder == Some(DynamicFamily::Pixels))
            .unwrap();
        assert_eq!(columns[placeholder + 1].field, "pixel_7_24");
        assert!(columns.iter().any(|c| c.field == "pixel_7_168_view"));

        let pixels = categories
            .iter()
            .find(|c| c.kind == DynamicFamily::Pixels.category())
            .unwrap();
        assert_eq!(pixels.subcategories.len(), 1);
        assert_eq!(pixels.subcategories[0].name, "Sale");
    }

    #[test]
    fn test_injection_is_idempotent() {
        let (mut columns, mut categories) = base_columns();
        let goals = [ConversionGoal {
            id: "3".into(),
            name: "Signup".into(),
            goal_type: ConversionGoalType::Ga,
            pixel_prefix: None,
            conversion_window: None,
        }];
        let first = inject_dynamic_columns(&mut columns, &mut categories, &[], &goals, &[pixel()]);
        let len = columns.len();
        let second = inject_dynamic_columns(&mut columns, &mut categories, &[], &goals, &[pixel()]);

        assert!(first > 0);
        assert_eq!(second, 0);
        assert_eq!(columns.len(), len);
    }

    #[test]
    fn test_primary_goal_promotion() {
        let (mut columns, mut categories) = base_columns();
        let goals = [CampaignGoal {
            id: 5,
            goal_type: CampaignGoalType::TimeOnSite,
            primary: true,
            conversion_goal: None,
        }];
        inject_dynamic_columns(&mut columns, &mut categories, &goals, &[], &[]);

        let tos = columns.iter().find(|c| c.field == "avg_tos").unwrap();
        assert!(tos.primary_goal);
        assert!(tos.visible);
        assert!(columns.iter().any(|c| c.field == "performance_campaign_goal_5"));
    }
}
