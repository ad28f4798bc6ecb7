use std::sync::Arc;

use chrono::NaiveDate;
use log::{info, warn};

use crate::bulk_entry::BulkDraftRow;
use crate::errors::Result;
use crate::meal_plans::{Planner, PlannedMeal};
use crate::pantry::PantryItem;
use crate::recipes::Recipe;
use crate::shopping::ShoppingCustomItem;
use crate::sync::{EchoSuppressor, SyncEntity};

use super::household_model::HouseholdId;
use super::household_traits::HouseholdStore;

/// Pantry item writes touch the item row and its location rows, so both
/// kinds will echo back.
const PANTRY_WRITE_KINDS: [SyncEntity; 2] = [SyncEntity::PantryItem, SyncEntity::PantryLocation];

/// Outcome of pushing every local collection to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncAllReport {
    pub attempted: usize,
    pub failed: usize,
}

impl SyncAllReport {
    fn record(&mut self, result: Result<()>, what: &str) {
        self.attempted += 1;
        if let Err(err) = result {
            self.failed += 1;
            warn!("[SyncAll] Failed to push {}: {}", what, err);
        }
    }
}

/// The write path shared by every feature.
///
/// Each operation records the local-write marker for the kinds it touches
/// synchronously, before the backend request is issued.
#[derive(Clone)]
pub struct HouseholdWriter {
    store: Arc<dyn HouseholdStore>,
    echo: Arc<EchoSuppressor>,
}

impl HouseholdWriter {
    pub fn new(store: Arc<dyn HouseholdStore>, echo: Arc<EchoSuppressor>) -> Self {
        Self { store, echo }
    }

    pub fn echo_suppressor(&self) -> Arc<EchoSuppressor> {
        Arc::clone(&self.echo)
    }

    pub async fn save_pantry_item(&self, household_id: &HouseholdId, item: &PantryItem) -> Result<()> {
        self.echo.mark_local_writes(&PANTRY_WRITE_KINDS);
        self.store.save_pantry_item(household_id, item).await
    }

    pub async fn delete_pantry_item(&self, item_id: &str) -> Result<()> {
        self.echo.mark_local_writes(&PANTRY_WRITE_KINDS);
        self.store.delete_pantry_item(item_id).await
    }

    pub async fn save_recipe(&self, household_id: &HouseholdId, recipe: &Recipe) -> Result<()> {
        self.echo.mark_local_write(SyncEntity::Recipe);
        self.store.save_recipe(household_id, recipe).await
    }

    pub async fn delete_recipe(&self, recipe_id: &str) -> Result<()> {
        self.echo.mark_local_write(SyncEntity::Recipe);
        self.store.delete_recipe(recipe_id).await
    }

    pub async fn save_meal_plans_for_date(
        &self,
        household_id: &HouseholdId,
        date: NaiveDate,
        meals: &[PlannedMeal],
    ) -> Result<()> {
        self.echo.mark_local_write(SyncEntity::MealPlan);
        self.store
            .save_meal_plans_for_date(household_id, date, meals)
            .await
    }

    pub async fn delete_meal_plan(&self, meal_id: &str) -> Result<()> {
        self.echo.mark_local_write(SyncEntity::MealPlan);
        self.store.delete_meal_plan(meal_id).await
    }

    pub async fn save_shopping_item(
        &self,
        household_id: &HouseholdId,
        item: &ShoppingCustomItem,
    ) -> Result<()> {
        self.echo.mark_local_write(SyncEntity::ShoppingCustomItem);
        self.store.save_shopping_item(household_id, item).await
    }

    pub async fn delete_checked_shopping_items(&self, household_id: &HouseholdId) -> Result<()> {
        self.echo.mark_local_write(SyncEntity::ShoppingCustomItem);
        self.store.delete_checked_shopping_items(household_id).await
    }

    pub async fn save_bulk_draft(&self, household_id: &HouseholdId, row: &BulkDraftRow) -> Result<()> {
        self.echo.mark_local_write(SyncEntity::BulkEntryDraft);
        self.store.save_bulk_draft(household_id, row).await
    }

    pub async fn delete_bulk_draft(&self, draft_id: &str) -> Result<()> {
        self.echo.mark_local_write(SyncEntity::BulkEntryDraft);
        self.store.delete_bulk_draft(draft_id).await
    }

    /// Pushes every local collection, e.g. after the first sign-in on a
    /// device that was used offline. Individual failures are logged and
    /// counted; the push carries on with the remaining records.
    pub async fn sync_all(
        &self,
        household_id: &HouseholdId,
        pantry: &[PantryItem],
        recipes: &[Recipe],
        planner: &Planner,
        custom_shopping: &[ShoppingCustomItem],
    ) -> SyncAllReport {
        info!("[SyncAll] Pushing local data for household {}", household_id);
        let mut report = SyncAllReport::default();

        for item in pantry {
            let result = self.save_pantry_item(household_id, item).await;
            report.record(result, &format!("pantry item {}", item.id));
        }
        for recipe in recipes {
            let result = self.save_recipe(household_id, recipe).await;
            report.record(result, &format!("recipe {}", recipe.id));
        }
        for (date, meals) in planner {
            let result = self.save_meal_plans_for_date(household_id, *date, meals).await;
            report.record(result, &format!("meal plans for {}", date));
        }
        for item in custom_shopping {
            let result = self.save_shopping_item(household_id, item).await;
            report.record(result, &format!("shopping item {}", item.id));
        }

        info!(
            "[SyncAll] Finished: {} writes, {} failed",
            report.attempted, report.failed
        );
        report
    }
}
