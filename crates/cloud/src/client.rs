//! REST client for the hosted household database.
//!
//! Every table is reached through `/rest/v1/<table>` with PostgREST filter
//! syntax (`column=eq.value`, `column=in.(a,b)`). Upserts rely on
//! `Prefer: resolution=merge-duplicates`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use larder_core::bulk_entry::BulkDraftRow;
use larder_core::households::HouseholdStore;
use larder_core::meal_plans::{
    group_meal_plans, meal_plan_rows_for_date, MealPlanRow, PlannedMeal, Planner,
};
use larder_core::pantry::{PantryItem, PantryItemRow, PantryLocationRow};
use larder_core::recipes::{Recipe, RecipeRow};
use larder_core::shopping::{ShoppingCustomItem, ShoppingCustomRow};
use larder_core::sync::SyncEntity;
use larder_core::HouseholdId;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::{CloudError, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";
const PREFER_MINIMAL: &str = "return=minimal";

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// One `column=<op>.<value>` filter.
struct Filter {
    column: &'static str,
    expression: String,
}

impl Filter {
    fn eq(column: &'static str, value: impl std::fmt::Display) -> Self {
        Self {
            column,
            expression: format!("eq.{}", value),
        }
    }

    fn is_in<'a>(column: &'static str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let quoted: Vec<String> = values
            .into_iter()
            .map(|value| format!("\"{}\"", value.replace('"', "\\\"")))
            .collect();
        Self {
            column,
            expression: format!("in.({})", quoted.join(",")),
        }
    }
}

fn filter_query(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(|filter| {
            format!(
                "{}={}",
                filter.column,
                urlencoding::encode(&filter.expression)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Client for the household tables of the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    config: BackendConfig,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(CloudError::invalid_request("Backend URL and key are not configured"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Backend] Response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Backend] Response error ({}): {}", status, preview);
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    fn headers(&self, prefer: Option<&'static str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = HeaderValue::from_str(&self.config.anon_key)
            .map_err(|_| CloudError::auth("Invalid API key format"))?;
        headers.insert("apikey", api_key);

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.config.bearer_token()))
            .map_err(|_| CloudError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        if let Some(prefer) = prefer {
            headers.insert("Prefer", HeaderValue::from_static(prefer));
        }

        Ok(headers)
    }

    async fn read_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                let message = match error.code {
                    Some(code) => format!("{}: {}", code, error.message),
                    None => error.message,
                };
                return Err(CloudError::api(status.as_u16(), message));
            }
            return Err(CloudError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        Ok(body)
    }

    /// GET /rest/v1/{table}?select=*&{filters}
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&str>,
    ) -> Result<Vec<T>> {
        let mut url = format!("{}?select=*", self.table_url(table));
        if !filters.is_empty() {
            url = format!("{}&{}", url, filter_query(filters));
        }
        if let Some(order) = order {
            url = format!("{}&order={}", url, order);
        }
        debug!("[Backend] GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(None)?)
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST /rest/v1/{table} with merge-duplicates.
    async fn upsert<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> Result<()> {
        self.post(table, rows, PREFER_UPSERT).await
    }

    /// POST /rest/v1/{table}
    async fn insert<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> Result<()> {
        self.post(table, rows, PREFER_MINIMAL).await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        table: &str,
        rows: &T,
        prefer: &'static str,
    ) -> Result<()> {
        let url = self.table_url(table);
        debug!("[Backend] POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(Some(prefer))?)
            .json(rows)
            .send()
            .await?;

        Self::read_body(response).await.map(|_| ())
    }

    /// DELETE /rest/v1/{table}?{filters}
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        if filters.is_empty() {
            return Err(CloudError::invalid_request(format!(
                "Refusing unfiltered delete on {}",
                table
            )));
        }
        let url = format!("{}?{}", self.table_url(table), filter_query(filters));
        debug!("[Backend] DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers(Some(PREFER_MINIMAL))?)
            .send()
            .await?;

        Self::read_body(response).await.map(|_| ())
    }

    async fn fetch_pantry(&self, household_id: &HouseholdId) -> Result<Vec<PantryItem>> {
        let items: Vec<PantryItemRow> = self
            .select(
                SyncEntity::PantryItem.table_name(),
                &[Filter::eq("household_id", household_id)],
                None,
            )
            .await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let locations: Vec<PantryLocationRow> = self
            .select(
                SyncEntity::PantryLocation.table_name(),
                &[Filter::is_in(
                    "pantry_item_id",
                    items.iter().map(|item| item.id.as_str()),
                )],
                None,
            )
            .await?;

        Ok(PantryItem::assemble(items, locations))
    }

    async fn store_pantry_item(&self, household_id: &HouseholdId, item: &PantryItem) -> Result<()> {
        let (item_row, location_rows) = item.to_rows(household_id);
        self.upsert(SyncEntity::PantryItem.table_name(), &[item_row])
            .await?;
        self.delete(
            SyncEntity::PantryLocation.table_name(),
            &[Filter::eq("pantry_item_id", &item.id)],
        )
        .await?;
        if !location_rows.is_empty() {
            self.insert(SyncEntity::PantryLocation.table_name(), &location_rows)
                .await?;
        }
        debug!("[Backend] Saved pantry item {}", item.id);
        Ok(())
    }

    async fn store_meal_plans_for_date(
        &self,
        household_id: &HouseholdId,
        date: NaiveDate,
        meals: &[PlannedMeal],
    ) -> Result<()> {
        self.delete(
            SyncEntity::MealPlan.table_name(),
            &[
                Filter::eq("household_id", household_id),
                Filter::eq("planned_date", date),
            ],
        )
        .await?;

        let rows: Vec<MealPlanRow> = meal_plan_rows_for_date(household_id, date, meals);
        if !rows.is_empty() {
            self.insert(SyncEntity::MealPlan.table_name(), &rows).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl HouseholdStore for BackendClient {
    async fn load_pantry(&self, household_id: &HouseholdId) -> larder_core::Result<Vec<PantryItem>> {
        Ok(self.fetch_pantry(household_id).await?)
    }

    async fn load_recipes(&self, household_id: &HouseholdId) -> larder_core::Result<Vec<Recipe>> {
        let rows: Vec<RecipeRow> = self
            .select(
                SyncEntity::Recipe.table_name(),
                &[Filter::eq("household_id", household_id)],
                None,
            )
            .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn load_meal_plans(&self, household_id: &HouseholdId) -> larder_core::Result<Planner> {
        let rows: Vec<MealPlanRow> = self
            .select(
                SyncEntity::MealPlan.table_name(),
                &[Filter::eq("household_id", household_id)],
                None,
            )
            .await?;
        Ok(group_meal_plans(rows))
    }

    async fn load_shopping_items(
        &self,
        household_id: &HouseholdId,
    ) -> larder_core::Result<Vec<ShoppingCustomItem>> {
        let rows: Vec<ShoppingCustomRow> = self
            .select(
                SyncEntity::ShoppingCustomItem.table_name(),
                &[Filter::eq("household_id", household_id)],
                None,
            )
            .await?;
        Ok(rows.into_iter().map(ShoppingCustomItem::from).collect())
    }

    async fn load_bulk_drafts(
        &self,
        household_id: &HouseholdId,
    ) -> larder_core::Result<Vec<BulkDraftRow>> {
        Ok(self
            .select(
                SyncEntity::BulkEntryDraft.table_name(),
                &[Filter::eq("household_id", household_id)],
                Some("row_index.asc"),
            )
            .await?)
    }

    async fn save_pantry_item(
        &self,
        household_id: &HouseholdId,
        item: &PantryItem,
    ) -> larder_core::Result<()> {
        Ok(self.store_pantry_item(household_id, item).await?)
    }

    async fn delete_pantry_item(&self, item_id: &str) -> larder_core::Result<()> {
        Ok(self
            .delete(SyncEntity::PantryItem.table_name(), &[Filter::eq("id", item_id)])
            .await?)
    }

    async fn save_recipe(&self, household_id: &HouseholdId, recipe: &Recipe) -> larder_core::Result<()> {
        Ok(self
            .upsert(SyncEntity::Recipe.table_name(), &[recipe.to_row(household_id)])
            .await?)
    }

    async fn delete_recipe(&self, recipe_id: &str) -> larder_core::Result<()> {
        Ok(self
            .delete(SyncEntity::Recipe.table_name(), &[Filter::eq("id", recipe_id)])
            .await?)
    }

    async fn save_meal_plans_for_date(
        &self,
        household_id: &HouseholdId,
        date: NaiveDate,
        meals: &[PlannedMeal],
    ) -> larder_core::Result<()> {
        Ok(self
            .store_meal_plans_for_date(household_id, date, meals)
            .await?)
    }

    async fn delete_meal_plan(&self, meal_id: &str) -> larder_core::Result<()> {
        Ok(self
            .delete(SyncEntity::MealPlan.table_name(), &[Filter::eq("id", meal_id)])
            .await?)
    }

    async fn save_shopping_item(
        &self,
        household_id: &HouseholdId,
        item: &ShoppingCustomItem,
    ) -> larder_core::Result<()> {
        Ok(self
            .upsert(
                SyncEntity::ShoppingCustomItem.table_name(),
                &[item.to_row(household_id)],
            )
            .await?)
    }

    async fn delete_checked_shopping_items(
        &self,
        household_id: &HouseholdId,
    ) -> larder_core::Result<()> {
        Ok(self
            .delete(
                SyncEntity::ShoppingCustomItem.table_name(),
                &[
                    Filter::eq("household_id", household_id),
                    Filter::eq("checked", true),
                ],
            )
            .await?)
    }

    async fn save_bulk_draft(
        &self,
        household_id: &HouseholdId,
        row: &BulkDraftRow,
    ) -> larder_core::Result<()> {
        let mut row = row.clone();
        row.household_id = household_id.to_string();
        Ok(self
            .upsert(SyncEntity::BulkEntryDraft.table_name(), &[row])
            .await?)
    }

    async fn delete_bulk_draft(&self, draft_id: &str) -> larder_core::Result<()> {
        Ok(self
            .delete(SyncEntity::BulkEntryDraft.table_name(), &[Filter::eq("id", draft_id)])
            .await?)
    }
}
