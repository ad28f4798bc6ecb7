//! Pantry rows as stored by the backend and the composite item the app works with.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::households::HouseholdId;

pub const DEFAULT_PANTRY_UNIT: &str = "pcs";
pub const DEFAULT_PANTRY_CATEGORY: &str = "Other";

/// One row of the `pantry_items` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItemRow {
    pub id: String,
    pub household_id: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_threshold: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One row of the `pantry_locations` table. Locations carry no household
/// column; they belong to a household through their pantry item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryLocationRow {
    pub id: String,
    pub pantry_item_id: String,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryLocation {
    pub id: String,
    pub location: String,
    pub quantity: Decimal,
    pub expiration_date: Option<NaiveDate>,
}

/// A pantry item joined with all of its storage locations.
///
/// `total_quantity` is derived from the location rows, which is why a
/// location-level change can only be reconciled by reloading the whole item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryItem {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub min_threshold: Decimal,
    pub locations: Vec<PantryLocation>,
    pub total_quantity: Decimal,
    pub notes: String,
}

impl From<&PantryLocationRow> for PantryLocation {
    fn from(row: &PantryLocationRow) -> Self {
        PantryLocation {
            id: row.id.clone(),
            location: row.location_name.clone().unwrap_or_default(),
            quantity: row.quantity.unwrap_or_default(),
            expiration_date: row.expiration_date,
        }
    }
}

impl PantryItem {
    /// Builds the composite item from its row and the location rows that
    /// reference it. Location rows for other items are ignored.
    pub fn from_rows(item: PantryItemRow, locations: &[PantryLocationRow]) -> Self {
        let locations: Vec<PantryLocation> = locations
            .iter()
            .filter(|loc| loc.pantry_item_id == item.id)
            .map(PantryLocation::from)
            .collect();

        let mut assembled = PantryItem {
            id: item.id,
            name: item.name,
            unit: non_blank_or(item.unit, DEFAULT_PANTRY_UNIT),
            category: non_blank_or(item.category, DEFAULT_PANTRY_CATEGORY),
            min_threshold: item.min_threshold.unwrap_or_default(),
            locations,
            total_quantity: Decimal::ZERO,
            notes: item.notes.unwrap_or_default(),
        };
        assembled.recompute_total();
        assembled
    }

    /// Joins item rows with location rows, preserving item order.
    pub fn assemble(items: Vec<PantryItemRow>, locations: Vec<PantryLocationRow>) -> Vec<Self> {
        let mut by_item: HashMap<String, Vec<PantryLocationRow>> = HashMap::new();
        for loc in locations {
            by_item.entry(loc.pantry_item_id.clone()).or_default().push(loc);
        }

        items
            .into_iter()
            .map(|item| {
                let rows = by_item.remove(&item.id).unwrap_or_default();
                PantryItem::from_rows(item, &rows)
            })
            .collect()
    }

    pub fn recompute_total(&mut self) {
        self.total_quantity = self.locations.iter().map(|loc| loc.quantity).sum();
    }

    pub fn is_below_threshold(&self) -> bool {
        self.total_quantity < self.min_threshold
    }

    /// Splits the composite back into the rows the backend stores.
    pub fn to_rows(&self, household_id: &HouseholdId) -> (PantryItemRow, Vec<PantryLocationRow>) {
        let item = PantryItemRow {
            id: self.id.clone(),
            household_id: household_id.to_string(),
            name: self.name.clone(),
            unit: Some(non_blank_or(Some(self.unit.clone()), DEFAULT_PANTRY_UNIT)),
            category: Some(non_blank_or(
                Some(self.category.clone()),
                DEFAULT_PANTRY_CATEGORY,
            )),
            min_threshold: Some(self.min_threshold),
            notes: Some(self.notes.clone()),
        };

        let locations = self
            .locations
            .iter()
            .map(|loc| PantryLocationRow {
                id: loc.id.clone(),
                pantry_item_id: self.id.clone(),
                location_name: Some(loc.location.clone()),
                quantity: Some(loc.quantity),
                expiration_date: loc.expiration_date,
            })
            .collect();

        (item, locations)
    }
}

fn non_blank_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_string(),
    }
}
