use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::households::HouseholdId;

pub const DEFAULT_MEAL_TYPE: &str = "Dinner";

/// One row of the `meal_plans` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlanRow {
    pub id: String,
    pub household_id: String,
    pub planned_date: NaiveDate,
    pub recipe_id: String,
    #[serde(default)]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub is_cooked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMeal {
    pub id: String,
    pub recipe_id: String,
    pub meal_type: String,
    pub cooked: bool,
}

/// Planned meals grouped by day, in date order.
pub type Planner = BTreeMap<NaiveDate, Vec<PlannedMeal>>;

/// Groups backend rows into the planner shape, keeping row order within a day.
pub fn group_meal_plans(rows: Vec<MealPlanRow>) -> Planner {
    let mut planner = Planner::new();
    for row in rows {
        let meal_type = match row.meal_type {
            Some(value) if !value.trim().is_empty() => value,
            _ => DEFAULT_MEAL_TYPE.to_string(),
        };
        planner.entry(row.planned_date).or_default().push(PlannedMeal {
            id: row.id,
            recipe_id: row.recipe_id,
            meal_type,
            cooked: row.is_cooked.unwrap_or(false),
        });
    }
    planner
}

/// Rows that replace every meal planned for `date`.
pub fn meal_plan_rows_for_date(
    household_id: &HouseholdId,
    date: NaiveDate,
    meals: &[PlannedMeal],
) -> Vec<MealPlanRow> {
    meals
        .iter()
        .map(|meal| MealPlanRow {
            id: meal.id.clone(),
            household_id: household_id.to_string(),
            planned_date: date,
            recipe_id: meal.recipe_id.clone(),
            meal_type: Some(meal.meal_type.clone()),
            is_cooked: Some(meal.cooked),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, date: (i32, u32, u32), meal_type: Option<&str>) -> MealPlanRow {
        MealPlanRow {
            id: id.to_string(),
            household_id: "hh".to_string(),
            planned_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            recipe_id: format!("recipe-{}", id),
            meal_type: meal_type.map(str::to_string),
            is_cooked: None,
        }
    }

    #[test]
    fn groups_by_date_in_order() {
        let planner = group_meal_plans(vec![
            row("b", (2026, 3, 2), Some("Lunch")),
            row("a", (2026, 3, 1), None),
            row("c", (2026, 3, 2), Some("")),
        ]);

        let days: Vec<_> = planner.keys().map(|d| d.to_string()).collect();
        assert_eq!(days, vec!["2026-03-01", "2026-03-02"]);
        let second = &planner[&NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()];
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].meal_type, "Lunch");
        assert_eq!(second[1].meal_type, DEFAULT_MEAL_TYPE);
        assert!(!second[1].cooked);
    }

    #[test]
    fn planner_round_trips_through_json_with_date_keys() {
        let planner = group_meal_plans(vec![row("a", (2026, 3, 1), None)]);
        let json = serde_json::to_value(&planner).expect("serialize planner");
        assert!(json.get("2026-03-01").is_some());
        let back: Planner = serde_json::from_value(json).expect("deserialize planner");
        assert_eq!(back, planner);
    }
}
