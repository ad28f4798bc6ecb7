//! Fixed-delay recovery after a channel failure.
//!
//! However many channels fail, at most one rebuild is scheduled at a time.
//! The flag covers both the waiting period and the rebuild itself and is
//! cleared only after the rebuild finishes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use larder_core::HouseholdId;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::subscription_manager::StartOutcome;

/// What the controller rebuilds.
#[async_trait]
pub trait ReconnectTarget: Send + Sync {
    fn current_household(&self) -> Option<HouseholdId>;

    /// Tears down every channel and subscribes again for `household_id`.
    async fn resubscribe(&self, household_id: &HouseholdId) -> StartOutcome;

    /// True when some watched kind has no healthy channel.
    fn needs_reconnect(&self) -> bool;
}

pub struct ReconnectionController {
    target: Weak<dyn ReconnectTarget>,
    delay: Duration,
    pending: AtomicBool,
    attempt: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectionController {
    pub fn new(target: Weak<dyn ReconnectTarget>, delay: Duration) -> Self {
        Self {
            target,
            delay,
            pending: AtomicBool::new(false),
            attempt: AtomicU64::new(0),
            timer: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// True while a rebuild is scheduled or running.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Schedules one rebuild for the current household after the fixed
    /// delay. Returns false when an attempt is already pending or there is
    /// no household to rebuild for.
    pub fn attempt_reconnection(self: &Arc<Self>) -> bool {
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[Reconnect] Attempt already pending, ignoring");
            return false;
        }

        let household_id = match self.target.upgrade().and_then(|t| t.current_household()) {
            Some(id) => id,
            None => {
                debug!("[Reconnect] No household bound, nothing to reconnect");
                self.pending.store(false, Ordering::Release);
                return false;
            }
        };

        let attempt = self.attempt.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            "[Reconnect] Re-subscribing household {} in {}ms",
            household_id,
            self.delay.as_millis()
        );

        // Held across the spawn so the timer cannot take its own handle
        // before it is stored.
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(controller.delay).await;
            controller.fire(attempt, household_id).await;
        });
        if let Some(previous) = timer.replace(handle) {
            previous.abort();
        }
        true
    }

    /// Aborts a scheduled rebuild and clears the flag. A rebuild that has
    /// already started runs to completion.
    pub fn cancel(&self) {
        self.attempt.fetch_add(1, Ordering::AcqRel);
        if let Some(handle) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.pending.store(false, Ordering::Release);
    }

    async fn fire(self: Arc<Self>, attempt: u64, household_id: HouseholdId) {
        // Past this point the rebuild is no longer cancellable.
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(target) = self.target.upgrade() else {
            self.finish(attempt);
            return;
        };

        if target.current_household().as_ref() != Some(&household_id) {
            info!(
                "[Reconnect] Household {} is no longer active, abandoning re-subscription",
                household_id
            );
            self.finish(attempt);
            return;
        }

        let outcome = target.resubscribe(&household_id).await;
        self.finish(attempt);

        match outcome {
            StartOutcome::Started => {
                if target.needs_reconnect() {
                    warn!("[Reconnect] Channels failed during re-subscription, trying again");
                    self.attempt_reconnection();
                } else {
                    info!("[Reconnect] Re-subscribed household {}", household_id);
                }
            }
            other => debug!("[Reconnect] Re-subscription ended with {:?}", other),
        }
    }

    fn finish(&self, attempt: u64) {
        if self.attempt.load(Ordering::Acquire) == attempt {
            self.pending.store(false, Ordering::Release);
        }
    }
}
