//! Realtime sync domain: watched kinds, change events, echo suppression and
//! the transport contract.

mod change_event;
mod echo_suppressor;
mod sync_constants;
mod sync_model;
mod transport;

pub use change_event::*;
pub use echo_suppressor::*;
pub use sync_constants::*;
pub use sync_model::*;
pub use transport::*;
