//! Fakes shared by the realtime tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use larder_core::bulk_entry::BulkDraftRow;
use larder_core::households::{
    HouseholdStore, LocalCache, SyncHooks, BULK_DRAFTS_CACHE_KEY, PANTRY_CACHE_KEY,
    PLANNER_CACHE_KEY, RECIPES_CACHE_KEY, SHOPPING_CUSTOM_CACHE_KEY,
};
use larder_core::meal_plans::{Planner, PlannedMeal};
use larder_core::pantry::{PantryItem, PantryLocation};
use larder_core::recipes::Recipe;
use larder_core::shopping::ShoppingCustomItem;
use larder_core::sync::SyncEntity;
use larder_core::{Error, HouseholdId, Result};
use rust_decimal::Decimal;

pub fn pantry_item(id: &str, quantity: Decimal) -> PantryItem {
    PantryItem {
        id: id.to_string(),
        name: format!("item {}", id),
        unit: "pcs".to_string(),
        category: "Other".to_string(),
        min_threshold: Decimal::ZERO,
        locations: vec![PantryLocation {
            id: format!("{}-loc", id),
            location: "Pantry".to_string(),
            quantity,
            expiration_date: None,
        }],
        total_quantity: quantity,
        notes: String::new(),
    }
}

/// In-memory store. Loads return whatever was last set, captured when the
/// load starts, after an optional per-call delay for pantry loads.
#[derive(Default)]
pub struct StubStore {
    pantry: Mutex<Vec<PantryItem>>,
    bulk_drafts: Mutex<Vec<BulkDraftRow>>,
    pantry_delays: Mutex<VecDeque<Duration>>,
    loads: Mutex<HashMap<&'static str, usize>>,
    fail: AtomicBool,
}

impl StubStore {
    pub fn set_pantry(&self, items: Vec<PantryItem>) {
        *self.pantry.lock().unwrap() = items;
    }

    pub fn set_bulk_drafts(&self, rows: Vec<BulkDraftRow>) {
        *self.bulk_drafts.lock().unwrap() = rows;
    }

    pub fn delay_pantry_loads(&self, delays: Vec<Duration>) {
        *self.pantry_delays.lock().unwrap() = delays.into();
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Loads of the collection a change to `entity` reloads.
    pub fn reload_count(&self, entity: SyncEntity) -> usize {
        self.loads
            .lock()
            .unwrap()
            .get(entity.cache_key())
            .copied()
            .unwrap_or(0)
    }

    fn begin_load(&self, key: &'static str) -> Result<()> {
        *self.loads.lock().unwrap().entry(key).or_default() += 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::backend("backend unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl HouseholdStore for StubStore {
    async fn load_pantry(&self, _: &HouseholdId) -> Result<Vec<PantryItem>> {
        self.begin_load(PANTRY_CACHE_KEY)?;
        let items = self.pantry.lock().unwrap().clone();
        let delay = self.pantry_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(items)
    }

    async fn load_recipes(&self, _: &HouseholdId) -> Result<Vec<Recipe>> {
        self.begin_load(RECIPES_CACHE_KEY)?;
        Ok(Vec::new())
    }

    async fn load_meal_plans(&self, _: &HouseholdId) -> Result<Planner> {
        self.begin_load(PLANNER_CACHE_KEY)?;
        Ok(Planner::new())
    }

    async fn load_shopping_items(&self, _: &HouseholdId) -> Result<Vec<ShoppingCustomItem>> {
        self.begin_load(SHOPPING_CUSTOM_CACHE_KEY)?;
        Ok(Vec::new())
    }

    async fn load_bulk_drafts(&self, _: &HouseholdId) -> Result<Vec<BulkDraftRow>> {
        self.begin_load(BULK_DRAFTS_CACHE_KEY)?;
        Ok(self.bulk_drafts.lock().unwrap().clone())
    }

    async fn save_pantry_item(&self, _: &HouseholdId, item: &PantryItem) -> Result<()> {
        let mut pantry = self.pantry.lock().unwrap();
        pantry.retain(|existing| existing.id != item.id);
        pantry.push(item.clone());
        Ok(())
    }

    async fn delete_pantry_item(&self, item_id: &str) -> Result<()> {
        self.pantry.lock().unwrap().retain(|item| item.id != item_id);
        Ok(())
    }

    async fn save_recipe(&self, _: &HouseholdId, _: &Recipe) -> Result<()> {
        Ok(())
    }

    async fn delete_recipe(&self, _: &str) -> Result<()> {
        Ok(())
    }

    async fn save_meal_plans_for_date(
        &self,
        _: &HouseholdId,
        _: NaiveDate,
        _: &[PlannedMeal],
    ) -> Result<()> {
        Ok(())
    }

    async fn delete_meal_plan(&self, _: &str) -> Result<()> {
        Ok(())
    }

    async fn save_shopping_item(&self, _: &HouseholdId, _: &ShoppingCustomItem) -> Result<()> {
        Ok(())
    }

    async fn delete_checked_shopping_items(&self, _: &HouseholdId) -> Result<()> {
        Ok(())
    }

    async fn save_bulk_draft(&self, _: &HouseholdId, row: &BulkDraftRow) -> Result<()> {
        self.bulk_drafts.lock().unwrap().push(row.clone());
        Ok(())
    }

    async fn delete_bulk_draft(&self, draft_id: &str) -> Result<()> {
        self.bulk_drafts.lock().unwrap().retain(|row| row.id != draft_id);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    Replaced(SyncEntity),
    RegenerateShoppingList,
    RefreshDashboard,
    Notify(String),
}

#[derive(Default)]
pub struct RecordingHooks {
    calls: Mutex<Vec<HookCall>>,
}

impl RecordingHooks {
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &HookCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                HookCall::Notify(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SyncHooks for RecordingHooks {
    fn collection_replaced(&self, entity: SyncEntity) {
        self.calls.lock().unwrap().push(HookCall::Replaced(entity));
    }

    fn regenerate_shopping_list(&self) {
        self.calls.lock().unwrap().push(HookCall::RegenerateShoppingList);
    }

    fn refresh_dashboard(&self) {
        self.calls.lock().unwrap().push(HookCall::RefreshDashboard);
    }

    fn notify(&self, message: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(HookCall::Notify(message.to_string()));
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(HouseholdId, String), serde_json::Value>>,
    fail: AtomicBool,
}

impl MemoryCache {
    pub fn put(&self, household_id: &HouseholdId, key: &str, payload: serde_json::Value) {
        self.entries
            .lock()
            .unwrap()
            .insert((household_id.clone(), key.to_string()), payload);
    }

    pub fn get(&self, household_id: &HouseholdId, key: &str) -> Option<serde_json::Value> {
        self.entries
            .lock()
            .unwrap()
            .get(&(household_id.clone(), key.to_string()))
            .cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn store(
        &self,
        household_id: &HouseholdId,
        key: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::cache("disk full"));
        }
        self.put(household_id, key, payload);
        Ok(())
    }

    async fn load(&self, household_id: &HouseholdId, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.get(household_id, key))
    }
}
