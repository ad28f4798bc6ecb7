//! Meal plan models and the date-grouped planner.

mod meal_plans_model;

pub use meal_plans_model::*;
