//! Spreadsheet-style bulk entry draft rows shared between household members.

mod bulk_entry_model;

pub use bulk_entry_model::*;
