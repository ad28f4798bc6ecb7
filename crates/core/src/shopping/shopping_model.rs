use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::households::HouseholdId;

pub const DEFAULT_SHOPPING_UNIT: &str = "pcs";

/// One row of the `shopping_list_custom` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingCustomRow {
    pub id: String,
    pub household_id: String,
    pub name: String,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub checked: Option<bool>,
}

/// A shopping list entry the household added by hand, as opposed to the
/// entries derived from meal plans and pantry thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCustomItem {
    pub id: String,
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub checked: bool,
}

impl From<ShoppingCustomRow> for ShoppingCustomItem {
    fn from(row: ShoppingCustomRow) -> Self {
        ShoppingCustomItem {
            id: row.id,
            name: row.name,
            quantity: row.quantity.unwrap_or_default(),
            unit: match row.unit {
                Some(unit) if !unit.trim().is_empty() => unit,
                _ => DEFAULT_SHOPPING_UNIT.to_string(),
            },
            checked: row.checked.unwrap_or(false),
        }
    }
}

impl ShoppingCustomItem {
    pub fn to_row(&self, household_id: &HouseholdId) -> ShoppingCustomRow {
        ShoppingCustomRow {
            id: self.id.clone(),
            household_id: household_id.to_string(),
            name: self.name.clone(),
            quantity: Some(self.quantity),
            unit: Some(self.unit.clone()),
            checked: Some(self.checked),
        }
    }
}
