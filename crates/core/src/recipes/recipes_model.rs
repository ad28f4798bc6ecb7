use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::households::HouseholdId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    #[serde(default, alias = "qty")]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
}

/// One row of the `recipes` table. Ingredients and tags are JSON columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRow {
    pub id: String,
    pub household_id: String,
    pub name: String,
    #[serde(default)]
    pub ingredients: Option<Vec<RecipeIngredient>>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub photo_url: Option<String>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            name: row.name,
            ingredients: row.ingredients.unwrap_or_default(),
            instructions: row.instructions.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
            tags: row.tags.unwrap_or_default(),
            photo_url: row.photo_url,
        }
    }
}

impl Recipe {
    pub fn to_row(&self, household_id: &HouseholdId) -> RecipeRow {
        RecipeRow {
            id: self.id.clone(),
            household_id: household_id.to_string(),
            name: self.name.clone(),
            ingredients: Some(self.ingredients.clone()),
            instructions: Some(self.instructions.clone()),
            notes: Some(self.notes.clone()),
            tags: Some(self.tags.clone()),
            photo_url: self.photo_url.clone(),
        }
    }
}
