// SPDX-License-Identifier: MIT

//! Record client for the provider's row storage.
//!
//! Speaks the provider's table API (`/rest/v1/{table}` with `eq.` filters
//! and return-representation inserts) and exposes typed row operations for
//! the two protected tables, `profiles` and `recipes`. Authorization is not
//! decided here; the ownership checks live in [`crate::store`].

use crate::error::AppError;
use crate::models::{Profile, Recipe, RecipeUpdate};
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const RECIPES: &str = "recipes";
}

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 100;

/// Optional filters for recipe listings.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub category: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<u32>,
}

impl RecipeFilter {
    fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }
}

/// Record client. Cheap to clone; all modes share their state.
#[derive(Clone)]
pub struct RecordClient {
    inner: RecordBackend,
}

#[derive(Clone)]
enum RecordBackend {
    Http(HttpRecords),
    InMemory(Arc<InMemoryRecords>),
}

impl RecordClient {
    /// Client against the hosted provider's table endpoints.
    pub fn new(provider_url: &str, api_key: &str) -> Self {
        Self {
            inner: RecordBackend::Http(HttpRecords {
                http: reqwest::Client::new(),
                base_url: format!("{}/rest/v1", provider_url),
                api_key: api_key.to_string(),
            }),
        }
    }

    /// Client against process-local state, for offline development and tests.
    pub fn in_memory() -> Self {
        Self {
            inner: RecordBackend::InMemory(Arc::new(InMemoryRecords {
                profiles: DashMap::new(),
                recipes: DashMap::new(),
            })),
        }
    }

    // ─── Profile rows ────────────────────────────────────────────

    /// Insert a profile row. `Conflict` on duplicate id or username.
    pub async fn insert_profile(&self, profile: &Profile) -> Result<Profile, AppError> {
        match &self.inner {
            RecordBackend::Http(http) => http.insert(tables::PROFILES, profile).await,
            RecordBackend::InMemory(mem) => mem.insert_profile(profile),
        }
    }

    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        match &self.inner {
            RecordBackend::Http(http) => http.get_one(tables::PROFILES, "id", id).await,
            RecordBackend::InMemory(mem) => Ok(mem.profiles.get(id).map(|p| p.value().clone())),
        }
    }

    pub async fn get_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Profile>, AppError> {
        match &self.inner {
            RecordBackend::Http(http) => http.get_one(tables::PROFILES, "username", username).await,
            RecordBackend::InMemory(mem) => Ok(mem
                .profiles
                .iter()
                .find(|p| p.username == username)
                .map(|p| p.value().clone())),
        }
    }

    // ─── Recipe rows ─────────────────────────────────────────────

    /// Insert a fully formed recipe row (id and timestamps already set).
    pub async fn insert_recipe(&self, recipe: &Recipe) -> Result<Recipe, AppError> {
        match &self.inner {
            RecordBackend::Http(http) => http.insert(tables::RECIPES, recipe).await,
            RecordBackend::InMemory(mem) => mem.insert_recipe(recipe),
        }
    }

    pub async fn get_recipe(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        match &self.inner {
            RecordBackend::Http(http) => http.get_one(tables::RECIPES, "id", id).await,
            RecordBackend::InMemory(mem) => Ok(mem.recipes.get(id).map(|r| r.value().clone())),
        }
    }

    /// Apply a field-wise patch; `None` when the row no longer exists.
    pub async fn update_recipe(
        &self,
        id: &str,
        patch: &RecipeUpdate,
    ) -> Result<Option<Recipe>, AppError> {
        match &self.inner {
            RecordBackend::Http(http) => http.patch_one(tables::RECIPES, id, patch).await,
            RecordBackend::InMemory(mem) => Ok(mem.recipes.get_mut(id).map(|mut r| {
                patch.apply_to(&mut r);
                r.value().clone()
            })),
        }
    }

    /// Delete a row; `false` when it no longer exists.
    pub async fn delete_recipe(&self, id: &str) -> Result<bool, AppError> {
        match &self.inner {
            RecordBackend::Http(http) => http.delete_one(tables::RECIPES, id).await,
            RecordBackend::InMemory(mem) => Ok(mem.recipes.remove(id).is_some()),
        }
    }

    /// List recipes, newest first.
    pub async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, AppError> {
        match &self.inner {
            RecordBackend::Http(http) => http.list_recipes(filter).await,
            RecordBackend::InMemory(mem) => Ok(mem.list_recipes(filter)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP mode
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct HttpRecords {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRecords {
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn insert<T: Serialize + for<'de> serde::Deserialize<'de>>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, table);
        let response = self
            .request(reqwest::Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(AppError::Conflict(format!(
                "unique constraint violated on {}",
                table
            )));
        }
        let mut rows: Vec<T> = Self::read_json(response).await?;
        rows.pop()
            .ok_or_else(|| AppError::Network("insert returned no row".to_string()))
    }

    async fn get_one<T: for<'de> serde::Deserialize<'de>>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<T>, AppError> {
        let url = format!(
            "{}/{}?{}=eq.{}&limit=1",
            self.base_url, table, column, value
        );
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let mut rows: Vec<T> = Self::read_json(response).await?;
        Ok(rows.pop())
    }

    async fn patch_one(
        &self,
        table: &str,
        id: &str,
        patch: &RecipeUpdate,
    ) -> Result<Option<Recipe>, AppError> {
        let url = format!("{}/{}?id=eq.{}", self.base_url, table, id);
        let response = self
            .request(reqwest::Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(&patch_body(patch))
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let mut rows: Vec<Recipe> = Self::read_json(response).await?;
        Ok(rows.pop())
    }

    async fn delete_one(&self, table: &str, id: &str) -> Result<bool, AppError> {
        let url = format!("{}/{}?id=eq.{}", self.base_url, table, id);
        let response = self
            .request(reqwest::Method::DELETE, &url)
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let rows: Vec<serde_json::Value> = Self::read_json(response).await?;
        Ok(!rows.is_empty())
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, AppError> {
        let mut url = format!(
            "{}/{}?order=created_at.desc&limit={}",
            self.base_url,
            tables::RECIPES,
            filter.effective_limit()
        );
        if let Some(category) = &filter.category {
            url.push_str(&format!("&category=eq.{}", category));
        }
        if let Some(user_id) = &filter.user_id {
            url.push_str(&format!("&user_id=eq.{}", user_id));
        }

        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!("HTTP {}: {}", status, body)));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Network(format!("JSON parse error: {}", e)))
    }
}

/// Only the fields present in the patch go on the wire.
fn patch_body(patch: &RecipeUpdate) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    if let Some(v) = &patch.title {
        body.insert("title".into(), v.clone().into());
    }
    if let Some(v) = &patch.description {
        body.insert("description".into(), v.clone().into());
    }
    if let Some(v) = &patch.ingredients {
        body.insert("ingredients".into(), v.clone().into());
    }
    if let Some(v) = &patch.instructions {
        body.insert("instructions".into(), v.clone().into());
    }
    if let Some(v) = patch.cooking_time {
        body.insert("cooking_time".into(), v.into());
    }
    if let Some(v) = &patch.difficulty {
        body.insert("difficulty".into(), v.clone().into());
    }
    if let Some(v) = &patch.category {
        body.insert("category".into(), v.clone().into());
    }
    serde_json::Value::Object(body)
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory mode
// ─────────────────────────────────────────────────────────────────────────────

struct InMemoryRecords {
    profiles: DashMap<String, Profile>,
    recipes: DashMap<String, Recipe>,
}

impl InMemoryRecords {
    /// Enforces the same unique constraints the provider's schema carries:
    /// primary key on `profiles.id`, unique index on `profiles.username`.
    fn insert_profile(&self, profile: &Profile) -> Result<Profile, AppError> {
        if self.profiles.contains_key(&profile.id) {
            return Err(AppError::Conflict(
                "unique constraint violated on profiles".to_string(),
            ));
        }
        if self
            .profiles
            .iter()
            .any(|p| p.username == profile.username)
        {
            return Err(AppError::Conflict(
                "unique constraint violated on profiles".to_string(),
            ));
        }
        self.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }

    fn insert_recipe(&self, recipe: &Recipe) -> Result<Recipe, AppError> {
        if self.recipes.contains_key(&recipe.id) {
            return Err(AppError::Conflict(
                "unique constraint violated on recipes".to_string(),
            ));
        }
        self.recipes.insert(recipe.id.clone(), recipe.clone());
        Ok(recipe.clone())
    }

    fn list_recipes(&self, filter: &RecipeFilter) -> Vec<Recipe> {
        let mut rows: Vec<Recipe> = self
            .recipes
            .iter()
            .filter(|r| {
                filter
                    .category
                    .as_ref()
                    .is_none_or(|c| &r.category == c)
            })
            .filter(|r| filter.user_id.as_ref().is_none_or(|u| &r.user_id == u))
            .map(|r| r.value().clone())
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(filter.effective_limit() as usize);
        rows
    }
}
