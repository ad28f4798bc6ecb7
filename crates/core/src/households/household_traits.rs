use async_trait::async_trait;
use chrono::NaiveDate;

use crate::bulk_entry::BulkDraftRow;
use crate::errors::Result;
use crate::meal_plans::{Planner, PlannedMeal};
use crate::pantry::PantryItem;
use crate::recipes::Recipe;
use crate::shopping::ShoppingCustomItem;
use crate::sync::SyncEntity;

use super::household_model::{HouseholdCollection, HouseholdId};

/// Relational storage for one household's data.
///
/// Loads return the full, current collection. Writes must go through
/// [`HouseholdWriter`](super::HouseholdWriter) so the local-write marker is
/// recorded before the request leaves the client.
#[async_trait]
pub trait HouseholdStore: Send + Sync {
    /// Pantry items joined with their location rows.
    async fn load_pantry(&self, household_id: &HouseholdId) -> Result<Vec<PantryItem>>;

    async fn load_recipes(&self, household_id: &HouseholdId) -> Result<Vec<Recipe>>;

    async fn load_meal_plans(&self, household_id: &HouseholdId) -> Result<Planner>;

    async fn load_shopping_items(
        &self,
        household_id: &HouseholdId,
    ) -> Result<Vec<ShoppingCustomItem>>;

    async fn load_bulk_drafts(&self, household_id: &HouseholdId) -> Result<Vec<BulkDraftRow>>;

    /// Upserts the item row and replaces all of its location rows.
    async fn save_pantry_item(&self, household_id: &HouseholdId, item: &PantryItem)
        -> Result<()>;

    /// Deletes the item; location rows cascade.
    async fn delete_pantry_item(&self, item_id: &str) -> Result<()>;

    async fn save_recipe(&self, household_id: &HouseholdId, recipe: &Recipe) -> Result<()>;

    async fn delete_recipe(&self, recipe_id: &str) -> Result<()>;

    /// Replaces every meal planned for `date`.
    async fn save_meal_plans_for_date(
        &self,
        household_id: &HouseholdId,
        date: NaiveDate,
        meals: &[PlannedMeal],
    ) -> Result<()>;

    async fn delete_meal_plan(&self, meal_id: &str) -> Result<()>;

    async fn save_shopping_item(
        &self,
        household_id: &HouseholdId,
        item: &ShoppingCustomItem,
    ) -> Result<()>;

    /// Checkout: removes every checked custom item.
    async fn delete_checked_shopping_items(&self, household_id: &HouseholdId) -> Result<()>;

    async fn save_bulk_draft(&self, household_id: &HouseholdId, row: &BulkDraftRow) -> Result<()>;

    async fn delete_bulk_draft(&self, draft_id: &str) -> Result<()>;

    /// Reloads the collection a change to `entity` affects.
    async fn reload_collection(
        &self,
        entity: SyncEntity,
        household_id: &HouseholdId,
    ) -> Result<HouseholdCollection> {
        let collection = match entity {
            SyncEntity::PantryItem | SyncEntity::PantryLocation => {
                HouseholdCollection::Pantry(self.load_pantry(household_id).await?)
            }
            SyncEntity::Recipe => HouseholdCollection::Recipes(self.load_recipes(household_id).await?),
            SyncEntity::MealPlan => {
                HouseholdCollection::MealPlans(self.load_meal_plans(household_id).await?)
            }
            SyncEntity::ShoppingCustomItem => {
                HouseholdCollection::ShoppingCustom(self.load_shopping_items(household_id).await?)
            }
            SyncEntity::BulkEntryDraft => {
                HouseholdCollection::BulkDrafts(self.load_bulk_drafts(household_id).await?)
            }
        };
        Ok(collection)
    }
}

/// Device-local mirror of reloaded collections, keyed by collection name.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn store(
        &self,
        household_id: &HouseholdId,
        key: &str,
        payload: serde_json::Value,
    ) -> Result<()>;

    /// Returns `None` when nothing is cached under `key` for this household.
    async fn load(&self, household_id: &HouseholdId, key: &str)
        -> Result<Option<serde_json::Value>>;
}

/// Presentation callbacks. Implementations must not block.
pub trait SyncHooks: Send + Sync {
    /// The in-memory collection behind `entity` was replaced.
    fn collection_replaced(&self, entity: SyncEntity);

    fn regenerate_shopping_list(&self);

    fn refresh_dashboard(&self);

    /// Non-blocking, user-visible notification.
    fn notify(&self, message: &str);
}
