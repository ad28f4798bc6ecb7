//! Change-feed transport contract.
//!
//! A transport opens one named channel per watched table and reports both
//! row changes and channel lifecycle on a single signal stream, so the
//! subscription layer never depends on a particular provider's callback API.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::errors::Result;
use crate::households::HouseholdId;

use super::change_event::ChangeEvent;
use super::sync_model::SyncEntity;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        ChannelId(id.into())
    }

    pub fn generate() -> Self {
        ChannelId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which rows a channel should receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFilter {
    /// Rows whose `household_id` column equals the household.
    Household(HouseholdId),
    /// Rows related to the household's pantry items. The table has no
    /// household column, so nothing is filtered on the wire and row-level
    /// security scopes the feed.
    PantryItemsOf(HouseholdId),
}

impl ChannelFilter {
    pub fn for_entity(entity: SyncEntity, household_id: HouseholdId) -> Self {
        if entity.is_household_scoped() {
            ChannelFilter::Household(household_id)
        } else {
            ChannelFilter::PantryItemsOf(household_id)
        }
    }

    pub fn household_id(&self) -> &HouseholdId {
        match self {
            ChannelFilter::Household(id) | ChannelFilter::PantryItemsOf(id) => id,
        }
    }

    /// Row filter expression as understood by a PostgREST-style change feed.
    pub fn to_wire_filter(&self) -> Option<String> {
        match self {
            ChannelFilter::Household(id) => Some(format!("household_id=eq.{}", id)),
            ChannelFilter::PantryItemsOf(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRequest {
    pub name: String,
    pub entity: SyncEntity,
    pub filter: ChannelFilter,
}

impl ChannelRequest {
    pub fn for_entity(entity: SyncEntity, household_id: HouseholdId) -> Self {
        ChannelRequest {
            name: entity.channel_name().to_string(),
            entity,
            filter: ChannelFilter::for_entity(entity, household_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Pending,
    Subscribed,
    Closed,
    Errored,
}

impl ChannelStatus {
    pub fn is_failure(self) -> bool {
        matches!(self, ChannelStatus::Closed | ChannelStatus::Errored)
    }
}

/// Everything a channel reports: row changes and lifecycle transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    Change(ChangeEvent),
    Status(ChannelStatus),
}

/// A freshly opened channel. Dropping the sender side of `signals` is read
/// as the channel closing.
#[derive(Debug)]
pub struct OpenedChannel {
    pub id: ChannelId,
    pub signals: mpsc::UnboundedReceiver<ChannelSignal>,
}

#[async_trait]
pub trait ChangeTransport: Send + Sync {
    async fn open_channel(&self, request: ChannelRequest) -> Result<OpenedChannel>;

    async fn close_channel(&self, channel_id: &ChannelId) -> Result<()>;
}
