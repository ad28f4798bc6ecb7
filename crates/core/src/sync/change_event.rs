//! Typed change events delivered by the change feed.

use log::debug;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::bulk_entry::BulkDraftRow;
use crate::errors::Result;
use crate::meal_plans::MealPlanRow;
use crate::pantry::{PantryItemRow, PantryLocationRow};
use crate::recipes::RecipeRow;
use crate::shopping::ShoppingCustomRow;

use super::sync_model::{ChangeOperation, SyncEntity};

/// Row image carried by a change event, resolved by the entity tag.
///
/// Delete events usually carry only the primary key, so an image that does
/// not decode into the full row shape is kept as `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRow {
    PantryItem(PantryItemRow),
    PantryLocation(PantryLocationRow),
    Recipe(RecipeRow),
    MealPlan(MealPlanRow),
    ShoppingCustomItem(ShoppingCustomRow),
    BulkEntryDraft(BulkDraftRow),
    Raw(serde_json::Value),
}

impl ChangeRow {
    /// Decodes a wire image for `entity`. Null and `{}` images yield `None`.
    pub fn decode(entity: SyncEntity, image: serde_json::Value) -> Option<Self> {
        match &image {
            serde_json::Value::Null => return None,
            serde_json::Value::Object(map) if map.is_empty() => return None,
            _ => {}
        }

        let decoded = match entity {
            SyncEntity::PantryItem => typed(&image).map(ChangeRow::PantryItem),
            SyncEntity::PantryLocation => typed(&image).map(ChangeRow::PantryLocation),
            SyncEntity::Recipe => typed(&image).map(ChangeRow::Recipe),
            SyncEntity::MealPlan => typed(&image).map(ChangeRow::MealPlan),
            SyncEntity::ShoppingCustomItem => typed(&image).map(ChangeRow::ShoppingCustomItem),
            SyncEntity::BulkEntryDraft => typed(&image).map(ChangeRow::BulkEntryDraft),
        };

        match decoded {
            Ok(row) => Some(row),
            Err(err) => {
                debug!(
                    "[Realtime] Keeping partial {} row image as raw JSON: {}",
                    entity, err
                );
                Some(ChangeRow::Raw(image))
            }
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ChangeRow::PantryItem(row) => Some(&row.id),
            ChangeRow::PantryLocation(row) => Some(&row.id),
            ChangeRow::Recipe(row) => Some(&row.id),
            ChangeRow::MealPlan(row) => Some(&row.id),
            ChangeRow::ShoppingCustomItem(row) => Some(&row.id),
            ChangeRow::BulkEntryDraft(row) => Some(&row.id),
            ChangeRow::Raw(value) => value.get("id").and_then(|id| id.as_str()),
        }
    }
}

fn typed<T: DeserializeOwned>(image: &serde_json::Value) -> serde_json::Result<T> {
    T::deserialize(image)
}

/// One change notification: `{entity, operation, new_row, old_row}` plus
/// the local arrival instant used for echo classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub entity: SyncEntity,
    pub operation: ChangeOperation,
    pub new_row: Option<ChangeRow>,
    pub old_row: Option<ChangeRow>,
    pub received_at: Instant,
}

impl ChangeEvent {
    pub fn new(
        entity: SyncEntity,
        operation: ChangeOperation,
        new_row: Option<ChangeRow>,
        old_row: Option<ChangeRow>,
    ) -> Self {
        ChangeEvent {
            entity,
            operation,
            new_row,
            old_row,
            received_at: Instant::now(),
        }
    }

    /// Builds an event from the raw feed payload (`eventType`, `new`, `old`).
    pub fn decode(
        entity: SyncEntity,
        event_type: &str,
        new_image: serde_json::Value,
        old_image: serde_json::Value,
    ) -> Result<Self> {
        let operation = ChangeOperation::parse(event_type)?;
        Ok(ChangeEvent::new(
            entity,
            operation,
            ChangeRow::decode(entity, new_image),
            ChangeRow::decode(entity, old_image),
        ))
    }

    pub fn received_at(mut self, at: Instant) -> Self {
        self.received_at = at;
        self
    }

    /// Id of the affected row, preferring the new image.
    pub fn row_id(&self) -> Option<&str> {
        self.new_row
            .as_ref()
            .and_then(ChangeRow::id)
            .or_else(|| self.old_row.as_ref().and_then(ChangeRow::id))
    }
}
