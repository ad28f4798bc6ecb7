//! Owns the set of change-feed channels for the active household.
//!
//! Every (re)subscription is a full teardown followed by one channel per
//! watched kind. Each channel gets a pump task that forwards its change
//! events to the reconciler and its status transitions back here. Pumps are
//! tagged with the subscription generation they were opened under, and
//! signals from an older generation are ignored.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use larder_core::sync::{
    ChangeEvent, ChangeTransport, ChannelId, ChannelRequest, ChannelSignal, ChannelStatus,
    SyncEntity,
};
use larder_core::HouseholdId;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::RealtimeConfig;
use crate::reconciler::{ChangeReconciler, ReconcileOutcome};
use crate::reconnection::{ReconnectTarget, ReconnectionController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Channels were (re)opened for the household.
    Started,
    /// No household: existing channels were closed and nothing was opened.
    Skipped,
    /// Another start was already in progress; this call did nothing.
    AlreadyRunning,
    /// `stop()` ran while this start was opening channels.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub entity: SyncEntity,
    pub status: ChannelStatus,
}

struct ActiveChannel {
    id: ChannelId,
    entity: SyncEntity,
    status: ChannelStatus,
    pump: JoinHandle<()>,
}

#[derive(Default)]
struct ManagerInner {
    household: Option<HouseholdId>,
    channels: Vec<ActiveChannel>,
}

/// Resets the start flag however `start` returns.
struct StartGuard<'a>(&'a AtomicBool);

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SubscriptionManager {
    this: Weak<SubscriptionManager>,
    transport: Arc<dyn ChangeTransport>,
    reconciler: Arc<ChangeReconciler>,
    reconnection: Arc<ReconnectionController>,
    starting: AtomicBool,
    generation: AtomicU64,
    inner: Mutex<ManagerInner>,
}

impl SubscriptionManager {
    pub fn new(
        transport: Arc<dyn ChangeTransport>,
        reconciler: Arc<ChangeReconciler>,
        config: &RealtimeConfig,
    ) -> Arc<Self> {
        let delay = config.reconnect_delay;
        Arc::new_cyclic(|this: &Weak<SubscriptionManager>| {
            let target: Weak<dyn ReconnectTarget> = this.clone();
            SubscriptionManager {
                this: this.clone(),
                transport,
                reconciler,
                reconnection: Arc::new(ReconnectionController::new(target, delay)),
                starting: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                inner: Mutex::new(ManagerInner::default()),
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, ManagerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn reconnection(&self) -> &Arc<ReconnectionController> {
        &self.reconnection
    }

    pub fn reconciler(&self) -> &Arc<ChangeReconciler> {
        &self.reconciler
    }

    pub fn current_household(&self) -> Option<HouseholdId> {
        self.lock().household.clone()
    }

    pub fn channels(&self) -> Vec<ChannelSnapshot> {
        self.lock()
            .channels
            .iter()
            .map(|channel| ChannelSnapshot {
                id: channel.id.clone(),
                entity: channel.entity,
                status: channel.status,
            })
            .collect()
    }

    /// Tears down every channel and opens one per watched kind for
    /// `household_id`. A blank id only tears down.
    pub async fn start(&self, household_id: &str) -> StartOutcome {
        if self
            .starting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[Realtime] Subscription setup already in progress");
            return StartOutcome::AlreadyRunning;
        }
        let guard = StartGuard(&self.starting);

        let household = HouseholdId::parse(household_id);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let previous = {
            let mut inner = self.lock();
            inner.household = household.clone();
            std::mem::take(&mut inner.channels)
        };
        self.reconciler.set_scope(household.clone()).await;
        self.close_all(previous).await;

        let Some(household) = household else {
            info!("[Realtime] No household, realtime sync not started");
            return StartOutcome::Skipped;
        };

        info!("[Realtime] Subscribing to changes for household {}", household);
        let mut failed = Vec::new();
        for entity in SyncEntity::ALL {
            let request = ChannelRequest::for_entity(entity, household.clone());
            let opened = match self.transport.open_channel(request).await {
                Ok(opened) => opened,
                Err(err) => {
                    warn!("[Realtime] Failed to open {} channel: {}", entity, err);
                    failed.push(entity);
                    continue;
                }
            };

            // The entry is registered before its pump can run, so the first
            // status signal always finds it.
            let registered = {
                let mut inner = self.lock();
                if self.current_generation() == generation {
                    let pump = tokio::spawn(Self::pump(
                        self.this.clone(),
                        generation,
                        opened.id.clone(),
                        entity,
                        household.clone(),
                        opened.signals,
                    ));
                    inner.channels.push(ActiveChannel {
                        id: opened.id.clone(),
                        entity,
                        status: ChannelStatus::Pending,
                        pump,
                    });
                    true
                } else {
                    false
                }
            };

            if !registered {
                self.close_channel(&opened.id).await;
                info!(
                    "[Realtime] Subscription for household {} was stopped mid-setup",
                    household
                );
                return StartOutcome::Superseded;
            }
        }

        drop(guard);
        if !failed.is_empty() {
            warn!(
                "[Realtime] {} of {} channels failed to open, scheduling reconnection",
                failed.len(),
                SyncEntity::ALL.len()
            );
            self.reconnection.attempt_reconnection();
        }
        StartOutcome::Started
    }

    /// Closes every channel and forgets the household. Safe to call with
    /// nothing subscribed.
    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.reconnection.cancel();
        let channels = {
            let mut inner = self.lock();
            inner.household = None;
            std::mem::take(&mut inner.channels)
        };
        self.reconciler.set_scope(None).await;

        let count = channels.len();
        self.close_all(channels).await;
        info!("[Realtime] Stopped ({} channels closed)", count);
    }

    async fn close_all(&self, channels: Vec<ActiveChannel>) {
        for channel in channels {
            // Abort first so the close itself is not read as a failure.
            channel.pump.abort();
            self.close_channel(&channel.id).await;
        }
    }

    async fn close_channel(&self, channel_id: &ChannelId) {
        if let Err(err) = self.transport.close_channel(channel_id).await {
            warn!("[Realtime] Failed to close channel {}: {}", channel_id, err);
        }
    }

    async fn pump(
        this: Weak<SubscriptionManager>,
        generation: u64,
        channel_id: ChannelId,
        entity: SyncEntity,
        household: HouseholdId,
        mut signals: mpsc::UnboundedReceiver<ChannelSignal>,
    ) {
        while let Some(signal) = signals.recv().await {
            let Some(manager) = this.upgrade() else {
                return;
            };
            match signal {
                ChannelSignal::Change(event) => manager.dispatch_change(generation, &household, event),
                ChannelSignal::Status(status) => {
                    manager.handle_status(generation, &channel_id, entity, status)
                }
            }
        }

        if let Some(manager) = this.upgrade() {
            debug!("[Realtime] {} channel feed ended", entity);
            manager.handle_status(generation, &channel_id, entity, ChannelStatus::Closed);
        }
    }

    fn dispatch_change(&self, generation: u64, household: &HouseholdId, event: ChangeEvent) {
        if self.current_generation() != generation {
            debug!("[Realtime] Ignoring {} change from a retired channel", event.entity);
            return;
        }

        let reconciler = Arc::clone(&self.reconciler);
        let household = household.clone();
        tokio::spawn(async move {
            let outcome = reconciler.handle(&household, &event).await;
            if outcome != ReconcileOutcome::Applied {
                debug!("[Realtime] {} change: {:?}", event.entity, outcome);
            }
        });
    }

    fn handle_status(
        &self,
        generation: u64,
        channel_id: &ChannelId,
        entity: SyncEntity,
        status: ChannelStatus,
    ) {
        {
            let mut inner = self.lock();
            if self.current_generation() != generation {
                return;
            }
            if let Some(channel) = inner.channels.iter_mut().find(|c| &c.id == channel_id) {
                channel.status = status;
            }
        }

        match status {
            ChannelStatus::Subscribed => info!("[Realtime] {} channel ready", entity),
            ChannelStatus::Pending => debug!("[Realtime] {} channel pending", entity),
            ChannelStatus::Closed | ChannelStatus::Errored => {
                warn!("[Realtime] {} channel {:?}, reconnecting", entity, status);
                self.reconnection.attempt_reconnection();
            }
        }
    }
}

#[async_trait]
impl ReconnectTarget for SubscriptionManager {
    fn current_household(&self) -> Option<HouseholdId> {
        SubscriptionManager::current_household(self)
    }

    async fn resubscribe(&self, household_id: &HouseholdId) -> StartOutcome {
        self.start(household_id.as_str()).await
    }

    fn needs_reconnect(&self) -> bool {
        let inner = self.lock();
        inner.household.is_some()
            && (inner.channels.len() < SyncEntity::ALL.len()
                || inner.channels.iter().any(|c| c.status.is_failure()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::household_state::HouseholdState;
    use crate::in_process_transport::InProcessTransport;
    use crate::test_support::{RecordingHooks, StubStore};
    use larder_core::sync::EchoSuppressor;
    use std::time::Duration;

    fn manager_with(transport: Arc<InProcessTransport>) -> Arc<SubscriptionManager> {
        let reconciler = Arc::new(ChangeReconciler::new(
            Arc::new(StubStore::default()),
            Arc::new(HouseholdState::new()),
            Arc::new(EchoSuppressor::default()),
            Arc::new(RecordingHooks::default()),
        ));
        SubscriptionManager::new(transport, reconciler, &RealtimeConfig::default())
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_opens_one_channel_per_kind() {
        let transport = Arc::new(InProcessTransport::new());
        let manager = manager_with(transport.clone());

        assert_eq!(manager.start("hh").await, StartOutcome::Started);
        settle().await;

        let channels = manager.channels();
        assert_eq!(channels.len(), SyncEntity::ALL.len());
        assert!(channels.iter().all(|c| c.status == ChannelStatus::Subscribed));
        assert_eq!(manager.current_household(), Some(HouseholdId::new("hh")));
        assert!(!manager.needs_reconnect());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_tears_down_before_rebuilding() {
        let transport = Arc::new(InProcessTransport::new());
        let manager = manager_with(transport.clone());

        manager.start("hh").await;
        manager.start("hh").await;

        for entity in SyncEntity::ALL {
            assert_eq!(transport.open_channels_for(entity), 1);
        }
        assert_eq!(transport.closed_total(), SyncEntity::ALL.len());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_household_only_tears_down() {
        let transport = Arc::new(InProcessTransport::new());
        let manager = manager_with(transport.clone());
        manager.start("hh").await;

        assert_eq!(manager.start("  ").await, StartOutcome::Skipped);
        assert_eq!(transport.open_channel_count(), 0);
        assert!(manager.channels().is_empty());
        assert_eq!(manager.current_household(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_safe_without_channels() {
        let transport = Arc::new(InProcessTransport::new());
        let manager = manager_with(transport.clone());

        manager.stop().await;
        manager.start("hh").await;
        manager.stop().await;

        assert_eq!(transport.open_channel_count(), 0);
        assert!(manager.channels().is_empty());
        assert!(!manager.reconnection().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn intentional_close_does_not_reconnect() {
        let transport = Arc::new(InProcessTransport::new());
        let manager = manager_with(transport.clone());
        manager.start("hh").await;
        settle().await;

        manager.start("other").await;
        settle().await;
        assert!(!manager.reconnection().is_pending());

        manager.stop().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.opened_total(), 2 * SyncEntity::ALL.len());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_open_schedules_reconnection() {
        let transport = Arc::new(InProcessTransport::new());
        let manager = manager_with(transport.clone());
        transport.fail_next_open(SyncEntity::Recipe);

        assert_eq!(manager.start("hh").await, StartOutcome::Started);
        assert_eq!(manager.channels().len(), SyncEntity::ALL.len() - 1);
        assert!(manager.reconnection().is_pending());

        tokio::time::sleep(Duration::from_millis(5_001)).await;
        assert_eq!(manager.channels().len(), SyncEntity::ALL.len());
        assert!(!manager.reconnection().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_feed_counts_as_closed() {
        let transport = Arc::new(InProcessTransport::new());
        let manager = manager_with(transport.clone());
        manager.start("hh").await;
        settle().await;

        transport.disconnect(SyncEntity::MealPlan);
        settle().await;

        let meal_plans = manager
            .channels()
            .into_iter()
            .find(|c| c.entity == SyncEntity::MealPlan)
            .unwrap();
        assert_eq!(meal_plans.status, ChannelStatus::Closed);
        assert!(manager.reconnection().is_pending());
    }
}
