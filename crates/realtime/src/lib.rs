//! Realtime household sync: channel subscriptions per watched kind, fixed
//! delay reconnection, and reconciliation of remote changes into the
//! in-memory household state.

pub mod config;
pub mod context;
pub mod household_state;
pub mod in_process_transport;
pub mod reconciler;
pub mod reconnection;
pub mod subscription_manager;

#[cfg(test)]
mod test_support;

pub use config::RealtimeConfig;
pub use context::SyncContext;
pub use household_state::{HouseholdSnapshot, HouseholdState};
pub use in_process_transport::InProcessTransport;
pub use reconciler::{BulkEntryListener, ChangeReconciler, ReconcileOutcome};
pub use reconnection::{ReconnectTarget, ReconnectionController};
pub use subscription_manager::{ChannelSnapshot, StartOutcome, SubscriptionManager};
