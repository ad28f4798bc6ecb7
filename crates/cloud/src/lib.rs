//! REST backend for household data.
//!
//! [`BackendClient`] implements the core `HouseholdStore` contract against a
//! PostgREST-style API (`/rest/v1/<table>`).

mod client;
mod config;
mod error;

pub use client::BackendClient;
pub use config::BackendConfig;
pub use error::{CloudError, Result};
