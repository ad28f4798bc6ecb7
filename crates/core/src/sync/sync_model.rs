//! Watched entity kinds and change operations.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::households::{
    BULK_DRAFTS_CACHE_KEY, PANTRY_CACHE_KEY, PLANNER_CACHE_KEY, RECIPES_CACHE_KEY,
    SHOPPING_CUSTOM_CACHE_KEY,
};

/// Entity kinds with their own change channel and reconciliation handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntity {
    PantryItem,
    PantryLocation,
    Recipe,
    MealPlan,
    ShoppingCustomItem,
    BulkEntryDraft,
}

impl SyncEntity {
    pub const ALL: [SyncEntity; 6] = [
        SyncEntity::PantryItem,
        SyncEntity::PantryLocation,
        SyncEntity::Recipe,
        SyncEntity::MealPlan,
        SyncEntity::ShoppingCustomItem,
        SyncEntity::BulkEntryDraft,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            SyncEntity::PantryItem => "pantry_items",
            SyncEntity::PantryLocation => "pantry_locations",
            SyncEntity::Recipe => "recipes",
            SyncEntity::MealPlan => "meal_plans",
            SyncEntity::ShoppingCustomItem => "shopping_list_custom",
            SyncEntity::BulkEntryDraft => "bulk_entry_drafts",
        }
    }

    pub fn from_table(table: &str) -> Option<Self> {
        SyncEntity::ALL
            .into_iter()
            .find(|entity| entity.table_name() == table)
    }

    pub fn channel_name(self) -> &'static str {
        match self {
            SyncEntity::PantryItem => "pantry_items_changes",
            SyncEntity::PantryLocation => "pantry_locations_changes",
            SyncEntity::Recipe => "recipes_changes",
            SyncEntity::MealPlan => "meal_plans_changes",
            SyncEntity::ShoppingCustomItem => "shopping_list_changes",
            SyncEntity::BulkEntryDraft => "bulk_entry_changes",
        }
    }

    /// Key of the device-cache entry the reloaded collection is mirrored to.
    /// Items and locations share the composite pantry collection.
    pub fn cache_key(self) -> &'static str {
        match self {
            SyncEntity::PantryItem | SyncEntity::PantryLocation => PANTRY_CACHE_KEY,
            SyncEntity::Recipe => RECIPES_CACHE_KEY,
            SyncEntity::MealPlan => PLANNER_CACHE_KEY,
            SyncEntity::ShoppingCustomItem => SHOPPING_CUSTOM_CACHE_KEY,
            SyncEntity::BulkEntryDraft => BULK_DRAFTS_CACHE_KEY,
        }
    }

    /// Locations have no household column; their channel is scoped through
    /// the pantry items they belong to.
    pub fn is_household_scoped(self) -> bool {
        !matches!(self, SyncEntity::PantryLocation)
    }

    pub fn regenerates_shopping_list(self) -> bool {
        !matches!(self, SyncEntity::BulkEntryDraft)
    }

    pub fn refreshes_dashboard(self) -> bool {
        matches!(
            self,
            SyncEntity::PantryItem
                | SyncEntity::PantryLocation
                | SyncEntity::Recipe
                | SyncEntity::MealPlan
        )
    }

    /// Toast text for a change made elsewhere. Location changes stay silent:
    /// they almost always ride along with an item change that was announced.
    pub fn remote_change_message(self) -> Option<&'static str> {
        match self {
            SyncEntity::PantryItem => Some("Pantry updated by another user"),
            SyncEntity::PantryLocation => None,
            SyncEntity::Recipe => Some("Recipes updated by another user"),
            SyncEntity::MealPlan => Some("Meal plan updated by another user"),
            SyncEntity::ShoppingCustomItem => Some("Shopping list updated by another user"),
            SyncEntity::BulkEntryDraft => Some("Bulk entry updated by another user"),
        }
    }
}

impl std::fmt::Display for SyncEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Row-level operation reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

impl ChangeOperation {
    pub fn parse(event_type: &str) -> Result<Self> {
        match event_type.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(ChangeOperation::Insert),
            "UPDATE" => Ok(ChangeOperation::Update),
            "DELETE" => Ok(ChangeOperation::Delete),
            other => Err(Error::invalid_input(format!(
                "Unsupported change event type '{}'",
                other
            ))),
        }
    }
}
