use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bulk_entry::BulkDraftRow;
use crate::errors::{Error, Result};
use crate::meal_plans::Planner;
use crate::pantry::PantryItem;
use crate::recipes::Recipe;
use crate::shopping::ShoppingCustomItem;

/// Device-cache keys, one per reloadable collection.
pub const PANTRY_CACHE_KEY: &str = "pantry";
pub const RECIPES_CACHE_KEY: &str = "recipes";
pub const PLANNER_CACHE_KEY: &str = "planner";
pub const SHOPPING_CUSTOM_CACHE_KEY: &str = "shopping_custom";
pub const BULK_DRAFTS_CACHE_KEY: &str = "bulk_entry_drafts";

/// Opaque household identifier handed out by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseholdId(String);

impl HouseholdId {
    pub fn new(id: impl Into<String>) -> Self {
        HouseholdId(id.into())
    }

    /// Returns `None` for blank input, which callers treat as "no household yet".
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(HouseholdId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HouseholdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A full, authoritative collection as returned by a reload.
#[derive(Debug, Clone, PartialEq)]
pub enum HouseholdCollection {
    Pantry(Vec<PantryItem>),
    Recipes(Vec<Recipe>),
    MealPlans(Planner),
    ShoppingCustom(Vec<ShoppingCustomItem>),
    BulkDrafts(Vec<BulkDraftRow>),
}

impl HouseholdCollection {
    pub fn cache_key(&self) -> &'static str {
        match self {
            HouseholdCollection::Pantry(_) => PANTRY_CACHE_KEY,
            HouseholdCollection::Recipes(_) => RECIPES_CACHE_KEY,
            HouseholdCollection::MealPlans(_) => PLANNER_CACHE_KEY,
            HouseholdCollection::ShoppingCustom(_) => SHOPPING_CUSTOM_CACHE_KEY,
            HouseholdCollection::BulkDrafts(_) => BULK_DRAFTS_CACHE_KEY,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HouseholdCollection::Pantry(items) => items.len(),
            HouseholdCollection::Recipes(items) => items.len(),
            HouseholdCollection::MealPlans(planner) => planner.values().map(Vec::len).sum(),
            HouseholdCollection::ShoppingCustom(items) => items.len(),
            HouseholdCollection::BulkDrafts(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        let value = match self {
            HouseholdCollection::Pantry(items) => serde_json::to_value(items)?,
            HouseholdCollection::Recipes(items) => serde_json::to_value(items)?,
            HouseholdCollection::MealPlans(planner) => serde_json::to_value(planner)?,
            HouseholdCollection::ShoppingCustom(items) => serde_json::to_value(items)?,
            HouseholdCollection::BulkDrafts(rows) => serde_json::to_value(rows)?,
        };
        Ok(value)
    }

    /// Rebuilds a collection from a cached payload stored under `key`.
    pub fn from_cache(key: &str, payload: serde_json::Value) -> Result<Self> {
        let collection = match key {
            PANTRY_CACHE_KEY => HouseholdCollection::Pantry(serde_json::from_value(payload)?),
            RECIPES_CACHE_KEY => HouseholdCollection::Recipes(serde_json::from_value(payload)?),
            PLANNER_CACHE_KEY => HouseholdCollection::MealPlans(serde_json::from_value(payload)?),
            SHOPPING_CUSTOM_CACHE_KEY => {
                HouseholdCollection::ShoppingCustom(serde_json::from_value(payload)?)
            }
            BULK_DRAFTS_CACHE_KEY => {
                HouseholdCollection::BulkDrafts(serde_json::from_value(payload)?)
            }
            other => {
                return Err(Error::invalid_input(format!(
                    "Unknown cache key '{}'",
                    other
                )))
            }
        };
        Ok(collection)
    }

    pub fn all_cache_keys() -> [&'static str; 5] {
        [
            PANTRY_CACHE_KEY,
            RECIPES_CACHE_KEY,
            PLANNER_CACHE_KEY,
            SHOPPING_CUSTOM_CACHE_KEY,
            BULK_DRAFTS_CACHE_KEY,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn blank_household_ids_are_rejected() {
        assert!(HouseholdId::parse("   ").is_none());
        assert_eq!(
            HouseholdId::parse(" hh-1 ").map(|id| id.to_string()),
            Some("hh-1".to_string())
        );
    }

    #[test]
    fn cached_payload_restores_the_same_collection() {
        let collection = HouseholdCollection::ShoppingCustom(vec![ShoppingCustomItem {
            id: "s1".to_string(),
            name: "Soap".to_string(),
            quantity: dec!(2),
            unit: "pcs".to_string(),
            checked: true,
        }]);

        let payload = collection.to_json().expect("serialize");
        let restored =
            HouseholdCollection::from_cache(collection.cache_key(), payload).expect("restore");
        assert_eq!(restored, collection);
    }

    #[test]
    fn unknown_cache_key_is_invalid_input() {
        let err = HouseholdCollection::from_cache("landing", serde_json::json!([]))
            .expect_err("unknown key");
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
