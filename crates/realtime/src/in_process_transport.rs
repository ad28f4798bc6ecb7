//! Change feed that lives inside the process.
//!
//! Used in offline/demo mode, where every writer shares one process, and by
//! tests that need to publish changes or fail channels on demand.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use larder_core::sync::{
    ChangeEvent, ChangeTransport, ChannelId, ChannelRequest, ChannelSignal, ChannelStatus,
    OpenedChannel, SyncEntity,
};
use larder_core::{Error, HouseholdId, Result};
use log::debug;
use tokio::sync::mpsc;

struct OpenChannel {
    request: ChannelRequest,
    sender: mpsc::UnboundedSender<ChannelSignal>,
}

#[derive(Default)]
struct TransportInner {
    channels: HashMap<ChannelId, OpenChannel>,
    fail_next_open: HashSet<SyncEntity>,
    opened_total: usize,
    closed_total: usize,
}

#[derive(Default)]
pub struct InProcessTransport {
    inner: Mutex<TransportInner>,
}

impl InProcessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `event` to every open channel for its kind and household.
    /// Returns the number of channels reached.
    pub fn publish(&self, household_id: &HouseholdId, event: ChangeEvent) -> usize {
        let inner = self.lock();
        let mut delivered = 0;
        for channel in inner.channels.values() {
            if channel.request.entity != event.entity
                || channel.request.filter.household_id() != household_id
            {
                continue;
            }
            if channel
                .sender
                .send(ChannelSignal::Change(event.clone()))
                .is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }

    /// Reports `status` on every open channel for `entity`.
    pub fn report_status(&self, entity: SyncEntity, status: ChannelStatus) -> usize {
        let inner = self.lock();
        inner
            .channels
            .values()
            .filter(|channel| channel.request.entity == entity)
            .filter(|channel| channel.sender.send(ChannelSignal::Status(status)).is_ok())
            .count()
    }

    /// Drops the feed side of every channel for `entity` without a status,
    /// as a lost connection would.
    pub fn disconnect(&self, entity: SyncEntity) -> usize {
        let mut inner = self.lock();
        let before = inner.channels.len();
        inner
            .channels
            .retain(|_, channel| channel.request.entity != entity);
        before - inner.channels.len()
    }

    /// Makes the next open for `entity` fail.
    pub fn fail_next_open(&self, entity: SyncEntity) {
        self.lock().fail_next_open.insert(entity);
    }

    pub fn open_channel_count(&self) -> usize {
        self.lock().channels.len()
    }

    pub fn open_channels_for(&self, entity: SyncEntity) -> usize {
        self.lock()
            .channels
            .values()
            .filter(|channel| channel.request.entity == entity)
            .count()
    }

    pub fn opened_total(&self) -> usize {
        self.lock().opened_total
    }

    pub fn closed_total(&self) -> usize {
        self.lock().closed_total
    }
}

#[async_trait]
impl ChangeTransport for InProcessTransport {
    async fn open_channel(&self, request: ChannelRequest) -> Result<OpenedChannel> {
        let mut inner = self.lock();
        if inner.fail_next_open.remove(&request.entity) {
            return Err(Error::transport(format!(
                "channel {} refused",
                request.name
            )));
        }

        let (sender, signals) = mpsc::unbounded_channel();
        let id = ChannelId::generate();
        // The receiver is returned below, so this send cannot fail.
        let _ = sender.send(ChannelSignal::Status(ChannelStatus::Subscribed));

        debug!(
            "[Realtime] In-process channel {} opened for {} ({:?})",
            id,
            request.name,
            request.filter.to_wire_filter()
        );
        inner.opened_total += 1;
        inner
            .channels
            .insert(id.clone(), OpenChannel { request, sender });

        Ok(OpenedChannel { id, signals })
    }

    async fn close_channel(&self, channel_id: &ChannelId) -> Result<()> {
        let mut inner = self.lock();
        if inner.channels.remove(channel_id).is_some() {
            inner.closed_total += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::sync::ChangeOperation;

    #[tokio::test]
    async fn publish_reaches_only_matching_household_and_kind() {
        let transport = InProcessTransport::new();
        let a = HouseholdId::new("a");
        let b = HouseholdId::new("b");

        let mut recipes_a = transport
            .open_channel(ChannelRequest::for_entity(SyncEntity::Recipe, a.clone()))
            .await
            .unwrap();
        let _recipes_b = transport
            .open_channel(ChannelRequest::for_entity(SyncEntity::Recipe, b))
            .await
            .unwrap();
        let _meals_a = transport
            .open_channel(ChannelRequest::for_entity(SyncEntity::MealPlan, a.clone()))
            .await
            .unwrap();

        let event = ChangeEvent::new(SyncEntity::Recipe, ChangeOperation::Insert, None, None);
        assert_eq!(transport.publish(&a, event), 1);

        assert_eq!(
            recipes_a.signals.recv().await,
            Some(ChannelSignal::Status(ChannelStatus::Subscribed))
        );
        assert!(matches!(
            recipes_a.signals.recv().await,
            Some(ChannelSignal::Change(_))
        ));
    }

    #[tokio::test]
    async fn close_and_disconnect_track_counts() {
        let transport = InProcessTransport::new();
        let household = HouseholdId::new("a");
        let first = transport
            .open_channel(ChannelRequest::for_entity(SyncEntity::PantryItem, household.clone()))
            .await
            .unwrap();
        let mut second = transport
            .open_channel(ChannelRequest::for_entity(SyncEntity::PantryLocation, household))
            .await
            .unwrap();

        transport.close_channel(&first.id).await.unwrap();
        transport.close_channel(&first.id).await.unwrap();
        assert_eq!(transport.closed_total(), 1);

        assert_eq!(transport.disconnect(SyncEntity::PantryLocation), 1);
        assert_eq!(
            second.signals.recv().await,
            Some(ChannelSignal::Status(ChannelStatus::Subscribed))
        );
        assert_eq!(second.signals.recv().await, None);
        assert_eq!(transport.open_channel_count(), 0);
        assert_eq!(transport.opened_total(), 2);
    }

    #[tokio::test]
    async fn failed_open_is_one_shot() {
        let transport = InProcessTransport::new();
        let household = HouseholdId::new("a");
        transport.fail_next_open(SyncEntity::MealPlan);

        let request = ChannelRequest::for_entity(SyncEntity::MealPlan, household);
        assert!(transport.open_channel(request.clone()).await.is_err());
        assert!(transport.open_channel(request).await.is_ok());
    }
}
