use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pantry::{PantryItem, PantryLocation};

pub const DEFAULT_BULK_UNIT: &str = "units";
pub const DEFAULT_BULK_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_BULK_LOCATION: &str = "Pantry";

/// One row of the `bulk_entry_drafts` table: a line of the shared
/// spreadsheet-style entry form, saved while it is being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDraftRow {
    pub id: String,
    pub household_id: String,
    #[serde(default)]
    pub row_index: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A draft line that is complete enough to become a pantry item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEntryItem {
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub category: String,
    pub location: String,
}

impl BulkDraftRow {
    /// Rows with a blank name are placeholders and yield nothing.
    pub fn to_entry(&self) -> Option<BulkEntryItem> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return None;
        }

        Some(BulkEntryItem {
            name: name.to_string(),
            quantity: self.quantity.unwrap_or_default(),
            unit: trimmed_or(self.unit.as_deref(), DEFAULT_BULK_UNIT),
            category: trimmed_or(self.category.as_deref(), DEFAULT_BULK_CATEGORY),
            location: trimmed_or(self.location.as_deref(), DEFAULT_BULK_LOCATION),
        })
    }
}

impl BulkEntryItem {
    pub fn into_pantry_item(self, item_id: String, location_id: String) -> PantryItem {
        let mut item = PantryItem {
            id: item_id,
            name: self.name,
            unit: self.unit,
            category: self.category,
            min_threshold: Decimal::ZERO,
            locations: vec![PantryLocation {
                id: location_id,
                location: self.location,
                quantity: self.quantity,
                expiration_date: None,
            }],
            total_quantity: Decimal::ZERO,
            notes: String::new(),
        };
        item.recompute_total();
        item
    }
}

/// Ready entries in form order.
pub fn collect_bulk_entries(rows: &[BulkDraftRow]) -> Vec<BulkEntryItem> {
    let mut ordered: Vec<&BulkDraftRow> = rows.iter().collect();
    ordered.sort_by_key(|row| row.row_index);
    ordered.into_iter().filter_map(BulkDraftRow::to_entry).collect()
}

fn trimmed_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft(index: i32, name: Option<&str>) -> BulkDraftRow {
        BulkDraftRow {
            id: format!("d{}", index),
            household_id: "hh".to_string(),
            row_index: index,
            name: name.map(str::to_string),
            quantity: None,
            unit: Some("  ".to_string()),
            category: None,
            location: Some(" Fridge ".to_string()),
            updated_at: None,
        }
    }

    #[test]
    fn blank_rows_are_skipped_and_defaults_applied() {
        let entries = collect_bulk_entries(&[
            draft(2, Some(" Milk ")),
            draft(0, Some("   ")),
            draft(1, Some("Eggs")),
            draft(3, None),
        ]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Eggs");
        assert_eq!(entries[1].name, "Milk");
        assert_eq!(entries[1].unit, DEFAULT_BULK_UNIT);
        assert_eq!(entries[1].category, DEFAULT_BULK_CATEGORY);
        assert_eq!(entries[1].location, "Fridge");
        assert_eq!(entries[1].quantity, Decimal::ZERO);
    }

    #[test]
    fn entry_becomes_single_location_pantry_item() {
        let mut row = draft(0, Some("Flour"));
        row.quantity = Some(dec!(2.5));
        let item = row
            .to_entry()
            .expect("named row")
            .into_pantry_item("p1".to_string(), "l1".to_string());

        assert_eq!(item.locations.len(), 1);
        assert_eq!(item.total_quantity, dec!(2.5));
        assert_eq!(item.locations[0].location, "Fridge");
    }
}
