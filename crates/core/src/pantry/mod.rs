//! Pantry inventory models.

mod pantry_model;

pub use pantry_model::*;
