//! In-memory household data, bound to one household at a time.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use larder_core::bulk_entry::BulkDraftRow;
use larder_core::households::LocalCache;
use larder_core::meal_plans::Planner;
use larder_core::pantry::PantryItem;
use larder_core::recipes::Recipe;
use larder_core::shopping::ShoppingCustomItem;
use larder_core::{HouseholdCollection, HouseholdId};
use log::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HouseholdSnapshot {
    pub pantry: Vec<PantryItem>,
    pub recipes: Vec<Recipe>,
    pub planner: Planner,
    pub shopping_custom: Vec<ShoppingCustomItem>,
    pub bulk_drafts: Vec<BulkDraftRow>,
}

impl HouseholdSnapshot {
    fn replace(&mut self, collection: HouseholdCollection) {
        match collection {
            HouseholdCollection::Pantry(items) => self.pantry = items,
            HouseholdCollection::Recipes(items) => self.recipes = items,
            HouseholdCollection::MealPlans(planner) => self.planner = planner,
            HouseholdCollection::ShoppingCustom(items) => self.shopping_custom = items,
            HouseholdCollection::BulkDrafts(rows) => self.bulk_drafts = rows,
        }
    }
}

#[derive(Debug, Default)]
struct StateInner {
    scope: Option<HouseholdId>,
    data: HouseholdSnapshot,
}

/// Holds the collections of the bound household. Collections for any other
/// household are refused, so a reload that finishes after a household
/// switch cannot leak into the new household's view.
#[derive(Debug, Default)]
pub struct HouseholdState {
    inner: RwLock<StateInner>,
}

impl HouseholdState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StateInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn scope(&self) -> Option<HouseholdId> {
        self.read().scope.clone()
    }

    pub fn is_bound_to(&self, household_id: &HouseholdId) -> bool {
        self.read().scope.as_ref() == Some(household_id)
    }

    /// Binds the state to `household_id`. Switching to a different
    /// household drops the previous household's data and returns true.
    pub fn bind(&self, household_id: Option<HouseholdId>) -> bool {
        let mut inner = self.write();
        if inner.scope == household_id {
            return false;
        }
        inner.data = HouseholdSnapshot::default();
        inner.scope = household_id;
        true
    }

    /// Replaces one collection. Returns false when `household_id` is not the
    /// bound household.
    pub fn apply(&self, household_id: &HouseholdId, collection: HouseholdCollection) -> bool {
        let mut inner = self.write();
        if inner.scope.as_ref() != Some(household_id) {
            return false;
        }
        inner.data.replace(collection);
        true
    }

    pub fn snapshot(&self) -> HouseholdSnapshot {
        self.read().data.clone()
    }

    pub fn pantry(&self) -> Vec<PantryItem> {
        self.read().data.pantry.clone()
    }

    pub fn recipes(&self) -> Vec<Recipe> {
        self.read().data.recipes.clone()
    }

    pub fn planner(&self) -> Planner {
        self.read().data.planner.clone()
    }

    pub fn shopping_custom(&self) -> Vec<ShoppingCustomItem> {
        self.read().data.shopping_custom.clone()
    }

    pub fn bulk_drafts(&self) -> Vec<BulkDraftRow> {
        self.read().data.bulk_drafts.clone()
    }

    /// Restores every cached collection of `household_id` and binds the
    /// state to it. Unreadable entries are skipped. Returns how many
    /// collections were restored.
    pub async fn hydrate_from_cache(&self, cache: &dyn LocalCache, household_id: &HouseholdId) -> usize {
        self.bind(Some(household_id.clone()));

        let mut restored = 0;
        for key in HouseholdCollection::all_cache_keys() {
            let payload = match cache.load(household_id, key).await {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    debug!("[LocalCache] Nothing cached under '{}'", key);
                    continue;
                }
                Err(err) => {
                    warn!("[LocalCache] Failed to read '{}': {}", key, err);
                    continue;
                }
            };

            match HouseholdCollection::from_cache(key, payload) {
                Ok(collection) => {
                    if self.apply(household_id, collection) {
                        restored += 1;
                    }
                }
                Err(err) => warn!("[LocalCache] Ignoring unreadable '{}' entry: {}", key, err),
            }
        }

        info!(
            "[LocalCache] Restored {} cached collections for household {}",
            restored, household_id
        );
        restored
    }
}
