//! Larder core: household domain models, watched entity kinds, change events,
//! echo suppression, and the collaborator contracts consumed by the realtime
//! sync layer.

pub mod bulk_entry;
pub mod errors;
pub mod households;
pub mod meal_plans;
pub mod pantry;
pub mod recipes;
pub mod shopping;
pub mod sync;

pub use errors::{Error, Result};
pub use households::{HouseholdCollection, HouseholdId};
