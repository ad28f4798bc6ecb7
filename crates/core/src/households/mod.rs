//! Household scope, reloadable collections, and the persistence/presentation
//! contracts the sync layer depends on.

mod household_model;
mod household_traits;
mod household_writer;

pub use household_model::*;
pub use household_traits::*;
pub use household_writer::*;
