//! Applies remote changes by reloading whole collections.
//!
//! Change events are never merged row by row. Pantry items carry a quantity
//! derived from their location rows, so a partial event cannot produce a
//! correct item; every accepted event reloads the full collection instead.

use std::sync::{Arc, Mutex, PoisonError};

use larder_core::bulk_entry::BulkDraftRow;
use larder_core::households::{HouseholdStore, LocalCache, SyncHooks};
use larder_core::sync::{ChangeEvent, EchoSuppressor, SyncEntity};
use larder_core::{HouseholdCollection, HouseholdId};
use log::{debug, info, warn};

use crate::household_state::HouseholdState;

/// Receives the reloaded draft rows while the bulk-entry form is open.
pub type BulkEntryListener = Arc<dyn Fn(&[BulkDraftRow]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event was this client's own echo.
    Suppressed,
    /// The collection was reloaded and replaced.
    Applied,
    /// The reload failed; state is unchanged.
    ReloadFailed,
    /// The event or its reload belongs to a household that is no longer bound.
    OutOfScope,
}

pub struct ChangeReconciler {
    store: Arc<dyn HouseholdStore>,
    state: Arc<HouseholdState>,
    echo: Arc<EchoSuppressor>,
    hooks: Arc<dyn SyncHooks>,
    cache: Option<Arc<dyn LocalCache>>,
    bulk_entry_listener: Mutex<Option<BulkEntryListener>>,
}

impl ChangeReconciler {
    pub fn new(
        store: Arc<dyn HouseholdStore>,
        state: Arc<HouseholdState>,
        echo: Arc<EchoSuppressor>,
        hooks: Arc<dyn SyncHooks>,
    ) -> Self {
        Self {
            store,
            state,
            echo,
            hooks,
            cache: None,
            bulk_entry_listener: Mutex::new(None),
        }
    }

    /// Mirrors every applied collection into `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn LocalCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn state(&self) -> &Arc<HouseholdState> {
        &self.state
    }

    /// Binds the state to `household_id`. Entering a new household restores
    /// its cached collections first.
    pub async fn set_scope(&self, household_id: Option<HouseholdId>) {
        if !self.state.bind(household_id.clone()) {
            return;
        }
        if let (Some(cache), Some(household_id)) = (&self.cache, household_id) {
            self.state.hydrate_from_cache(cache.as_ref(), &household_id).await;
        }
    }

    pub fn set_bulk_entry_listener(&self, listener: BulkEntryListener) {
        *self
            .bulk_entry_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn clear_bulk_entry_listener(&self) {
        self.bulk_entry_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Handles one change event received on a channel of `household_id`.
    pub async fn handle(&self, household_id: &HouseholdId, event: &ChangeEvent) -> ReconcileOutcome {
        let entity = event.entity;

        if !self.state.is_bound_to(household_id) {
            debug!(
                "[Reconcile] Dropping {} change for inactive household {}",
                entity, household_id
            );
            return ReconcileOutcome::OutOfScope;
        }

        if self.echo.should_suppress(entity, event.received_at) {
            return ReconcileOutcome::Suppressed;
        }

        debug!(
            "[Reconcile] {:?} on {} (row {:?}), reloading",
            event.operation,
            entity,
            event.row_id()
        );

        let collection = match self.store.reload_collection(entity, household_id).await {
            Ok(collection) => collection,
            Err(err) => {
                warn!("[Reconcile] Failed to reload after {} change: {}", entity, err);
                return ReconcileOutcome::ReloadFailed;
            }
        };

        let bulk_rows = match &collection {
            HouseholdCollection::BulkDrafts(rows) => Some(rows.clone()),
            _ => None,
        };

        if !self.state.apply(household_id, collection.clone()) {
            debug!(
                "[Reconcile] Discarding {} reload for household {}, scope changed",
                entity, household_id
            );
            return ReconcileOutcome::OutOfScope;
        }

        self.mirror(household_id, &collection).await;
        self.notify_dependents(entity, bulk_rows.as_deref());
        ReconcileOutcome::Applied
    }

    async fn mirror(&self, household_id: &HouseholdId, collection: &HouseholdCollection) {
        let Some(cache) = &self.cache else {
            return;
        };

        let payload = match collection.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                warn!("[LocalCache] Failed to encode {}: {}", collection.cache_key(), err);
                return;
            }
        };

        if let Err(err) = cache.store(household_id, collection.cache_key(), payload).await {
            warn!("[LocalCache] Failed to mirror {}: {}", collection.cache_key(), err);
        }
    }

    fn notify_dependents(&self, entity: SyncEntity, bulk_rows: Option<&[BulkDraftRow]>) {
        self.hooks.collection_replaced(entity);

        if entity.regenerates_shopping_list() {
            self.hooks.regenerate_shopping_list();
        }
        if entity.refreshes_dashboard() {
            self.hooks.refresh_dashboard();
        }

        if let Some(rows) = bulk_rows {
            let listener = self
                .bulk_entry_listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(listener) = listener {
                listener(rows);
            }
        }

        if let Some(message) = entity.remote_change_message() {
            info!("[Reconcile] {}", message);
            self.hooks.notify(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pantry_item, HookCall, MemoryCache, RecordingHooks, StubStore};
    use larder_core::households::PANTRY_CACHE_KEY;
    use larder_core::sync::ChangeOperation;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    struct Fixture {
        store: Arc<StubStore>,
        hooks: Arc<RecordingHooks>,
        echo: Arc<EchoSuppressor>,
        cache: Arc<MemoryCache>,
        reconciler: ChangeReconciler,
        household: HouseholdId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(StubStore::default());
        let hooks = Arc::new(RecordingHooks::default());
        let echo = Arc::new(EchoSuppressor::default());
        let cache = Arc::new(MemoryCache::default());
        let state = Arc::new(HouseholdState::new());
        let household = HouseholdId::new("hh");
        state.bind(Some(household.clone()));
        let reconciler =
            ChangeReconciler::new(store.clone(), state, echo.clone(), hooks.clone())
                .with_cache(cache.clone());
        Fixture {
            store,
            hooks,
            echo,
            cache,
            reconciler,
            household,
        }
    }

    fn event(entity: SyncEntity) -> ChangeEvent {
        ChangeEvent::new(entity, ChangeOperation::Update, None, None)
    }

    #[tokio::test(start_paused = true)]
    async fn echo_changes_leave_state_alone() {
        let f = fixture();
        f.echo.mark_local_write(SyncEntity::Recipe);

        let outcome = f.reconciler.handle(&f.household, &event(SyncEntity::Recipe)).await;

        assert_eq!(outcome, ReconcileOutcome::Suppressed);
        assert_eq!(f.store.reload_count(SyncEntity::Recipe), 0);
        assert!(f.hooks.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn location_change_reloads_pantry_silently() {
        let f = fixture();
        f.store.set_pantry(vec![pantry_item("p1", dec!(4))]);

        let outcome = f
            .reconciler
            .handle(&f.household, &event(SyncEntity::PantryLocation))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Applied);
        assert_eq!(f.reconciler.state().pantry()[0].total_quantity, dec!(4));
        assert_eq!(
            f.hooks.calls(),
            vec![
                HookCall::Replaced(SyncEntity::PantryLocation),
                HookCall::RegenerateShoppingList,
                HookCall::RefreshDashboard,
            ]
        );
        assert!(f.cache.get(&f.household, PANTRY_CACHE_KEY).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn shopping_change_skips_dashboard() {
        let f = fixture();

        f.reconciler
            .handle(&f.household, &event(SyncEntity::ShoppingCustomItem))
            .await;

        assert_eq!(f.hooks.count(&HookCall::RegenerateShoppingList), 1);
        assert_eq!(f.hooks.count(&HookCall::RefreshDashboard), 0);
        assert_eq!(
            f.hooks.notifications(),
            vec!["Shopping list updated by another user".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reload_failure_keeps_previous_state() {
        let f = fixture();
        f.reconciler
            .state()
            .apply(&f.household, HouseholdCollection::Pantry(vec![pantry_item("p1", dec!(1))]));
        f.store.fail_loads(true);

        let outcome = f.reconciler.handle(&f.household, &event(SyncEntity::PantryItem)).await;

        assert_eq!(outcome, ReconcileOutcome::ReloadFailed);
        assert_eq!(f.reconciler.state().pantry().len(), 1);
        assert!(f.hooks.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cache_failure_is_not_fatal() {
        let f = fixture();
        f.cache.fail_writes(true);

        let outcome = f.reconciler.handle(&f.household, &event(SyncEntity::Recipe)).await;

        assert_eq!(outcome, ReconcileOutcome::Applied);
        assert_eq!(f.hooks.notifications().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_drafts_reach_the_registered_listener() {
        let f = fixture();
        f.store.set_bulk_drafts(vec![BulkDraftRow {
            id: "d1".to_string(),
            household_id: "hh".to_string(),
            row_index: 0,
            name: Some("Rice".to_string()),
            quantity: Some(dec!(2)),
            unit: None,
            category: None,
            location: None,
            updated_at: None,
        }]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        f.reconciler.set_bulk_entry_listener(Arc::new(move |rows: &[BulkDraftRow]| {
            sink.lock().unwrap().extend(rows.iter().map(|row| row.id.clone()));
        }));

        f.reconciler
            .handle(&f.household, &event(SyncEntity::BulkEntryDraft))
            .await;
        assert_eq!(*seen.lock().unwrap(), vec!["d1".to_string()]);
        assert_eq!(f.hooks.count(&HookCall::RegenerateShoppingList), 0);

        f.reconciler.clear_bulk_entry_listener();
        f.reconciler
            .handle(&f.household, &event(SyncEntity::BulkEntryDraft))
            .await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_finishing_after_switch_is_discarded() {
        let f = fixture();
        f.store.set_pantry(vec![pantry_item("old", dec!(1))]);
        f.store.delay_pantry_loads(vec![Duration::from_millis(300)]);

        let reconciler = Arc::new(f.reconciler);
        let task = {
            let reconciler = reconciler.clone();
            let household = f.household.clone();
            tokio::spawn(async move {
                reconciler
                    .handle(&household, &event(SyncEntity::PantryItem))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        reconciler.set_scope(Some(HouseholdId::new("other"))).await;

        assert_eq!(task.await.unwrap(), ReconcileOutcome::OutOfScope);
        assert!(reconciler.state().pantry().is_empty());
        assert!(f.hooks.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn last_applied_reload_wins() {
        let f = fixture();
        let reconciler = Arc::new(f.reconciler);
        f.store.delay_pantry_loads(vec![Duration::from_millis(300), Duration::from_millis(10)]);

        f.store.set_pantry(vec![pantry_item("p1", dec!(1))]);
        let slow = {
            let reconciler = reconciler.clone();
            let household = f.household.clone();
            tokio::spawn(async move {
                reconciler.handle(&household, &event(SyncEntity::PantryItem)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        f.store.set_pantry(vec![pantry_item("p1", dec!(2))]);
        let fast = {
            let reconciler = reconciler.clone();
            let household = f.household.clone();
            tokio::spawn(async move {
                reconciler.handle(&household, &event(SyncEntity::PantryItem)).await
            })
        };

        assert_eq!(fast.await.unwrap(), ReconcileOutcome::Applied);
        assert_eq!(reconciler.state().pantry()[0].total_quantity, dec!(2));

        assert_eq!(slow.await.unwrap(), ReconcileOutcome::Applied);
        assert_eq!(reconciler.state().pantry()[0].total_quantity, dec!(1));
        assert_eq!(f.store.reload_count(SyncEntity::PantryItem), 2);
        assert_eq!(f.hooks.count(&HookCall::Replaced(SyncEntity::PantryItem)), 2);
    }
}
