//! Local-write markers and echo classification.
//!
//! Every local write path records a marker for the entity kind it touches
//! *before* issuing the backend call, because the resulting change
//! notification can arrive ahead of the call's own response. A notification
//! for the same kind that arrives within the debounce window is treated as
//! this client's own echo and dropped.
//!
//! This is a heuristic with known false negatives: two local writes to the
//! same kind inside one window are indistinguishable, and a genuine remote
//! change that lands inside the window of an unrelated local write is
//! dropped as well. The next change event for that kind converges state.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::sync_constants::echo_debounce_window;
use super::sync_model::SyncEntity;

#[derive(Debug)]
pub struct EchoSuppressor {
    window: Duration,
    markers: Mutex<HashMap<SyncEntity, Instant>>,
}

impl Default for EchoSuppressor {
    fn default() -> Self {
        Self::new(echo_debounce_window())
    }
}

impl EchoSuppressor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            markers: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records that this client is about to write `entity`.
    pub fn mark_local_write(&self, entity: SyncEntity) {
        self.mark_local_write_at(entity, Instant::now());
    }

    pub fn mark_local_writes(&self, entities: &[SyncEntity]) {
        let now = Instant::now();
        for entity in entities {
            self.mark_local_write_at(*entity, now);
        }
    }

    pub fn mark_local_write_at(&self, entity: SyncEntity, at: Instant) {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity, at);
    }

    pub fn last_local_write(&self, entity: SyncEntity) -> Option<Instant> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entity)
            .copied()
    }

    /// True when an event for `entity` observed at `event_at` falls inside
    /// the debounce window of the last local write. Events observed before
    /// the marker count as inside the window.
    pub fn should_suppress(&self, entity: SyncEntity, event_at: Instant) -> bool {
        let Some(last_write) = self.last_local_write(entity) else {
            return false;
        };

        let elapsed = event_at.saturating_duration_since(last_write);
        let suppress = elapsed < self.window;
        if suppress {
            debug!(
                "[Realtime] Treating {} change as local echo ({}ms after local write)",
                entity,
                elapsed.as_millis()
            );
        }
        suppress
    }

    pub fn clear(&self) {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
