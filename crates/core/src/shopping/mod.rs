//! Custom shopping list items (the manually added part of the list).

mod shopping_model;

pub use shopping_model::*;
