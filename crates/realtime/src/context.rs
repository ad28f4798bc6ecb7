use std::sync::Arc;

use larder_core::households::{HouseholdStore, HouseholdWriter, LocalCache, SyncHooks};
use larder_core::sync::{ChangeTransport, EchoSuppressor};
use log::info;

use crate::config::RealtimeConfig;
use crate::household_state::HouseholdState;
use crate::reconciler::ChangeReconciler;
use crate::subscription_manager::{StartOutcome, SubscriptionManager};

/// The realtime components for one session, wired to share a single echo
/// suppressor and household state.
pub struct SyncContext {
    pub config: RealtimeConfig,
    pub echo: Arc<EchoSuppressor>,
    pub state: Arc<HouseholdState>,
    pub reconciler: Arc<ChangeReconciler>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub writer: HouseholdWriter,
}

impl SyncContext {
    pub fn new(
        config: RealtimeConfig,
        transport: Arc<dyn ChangeTransport>,
        store: Arc<dyn HouseholdStore>,
        hooks: Arc<dyn SyncHooks>,
        cache: Option<Arc<dyn LocalCache>>,
    ) -> Self {
        let echo = Arc::new(EchoSuppressor::new(config.echo_debounce));
        let state = Arc::new(HouseholdState::new());

        let mut reconciler = ChangeReconciler::new(
            Arc::clone(&store),
            Arc::clone(&state),
            Arc::clone(&echo),
            hooks,
        );
        if let Some(cache) = cache {
            reconciler = reconciler.with_cache(cache);
        }
        let reconciler = Arc::new(reconciler);

        let subscriptions = SubscriptionManager::new(transport, Arc::clone(&reconciler), &config);
        let writer = HouseholdWriter::new(store, Arc::clone(&echo));

        Self {
            config,
            echo,
            state,
            reconciler,
            subscriptions,
            writer,
        }
    }

    /// Subscribes to the household's changes. Entering a new household
    /// restores its cached collections before any channel opens.
    pub async fn activate(&self, household_id: &str) -> StartOutcome {
        self.subscriptions.start(household_id).await
    }

    /// Leaves the household: closes every channel and forgets local-write
    /// markers.
    pub async fn deactivate(&self) {
        self.subscriptions.stop().await;
        self.echo.clear();
        info!("[Realtime] Session deactivated");
    }
}
