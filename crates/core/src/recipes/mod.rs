//! Recipe models.

mod recipes_model;

pub use recipes_model::*;
