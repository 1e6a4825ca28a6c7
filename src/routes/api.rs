// SPDX-License-Identifier: MIT

//! API routes for profiles and recipes.
//!
//! Reads are public. Writes go through the ownership-scoped store, which
//! decides `Unauthenticated`/`Forbidden` from the gateway's identity
//! context.

use crate::error::Result;
use crate::middleware::session::CurrentIdentity;
use crate::models::{NewProfile, NewRecipe, Profile, Recipe, RecipeUpdate};
use crate::provider::RecipeFilter;
use crate::routes::auth::IdentityResponse;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/profile", post(create_profile))
        .route("/api/profiles/{id}", get(get_profile))
        .route("/api/profiles/username/{username}", get(get_profile_by_username))
        .route("/api/me", get(get_me))
}

// ─── Recipes ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct RecipesQuery {
    category: Option<String>,
    user_id: Option<String>,
    limit: Option<u32>,
}

/// List recipes, newest first. Public.
async fn list_recipes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecipesQuery>,
) -> Result<Json<Vec<Recipe>>> {
    let recipes = state
        .store
        .list_recipes(RecipeFilter {
            category: params.category,
            user_id: params.user_id,
            limit: params.limit,
        })
        .await?;
    Ok(Json(recipes))
}

/// Fetch one recipe. Public.
async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>> {
    Ok(Json(state.store.get_recipe(&id).await?))
}

/// Create a recipe owned by the acting identity.
async fn create_recipe(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<CurrentIdentity>,
    Json(input): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Recipe>)> {
    let recipe = state.store.create_recipe(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// Update a recipe. Owner only.
async fn update_recipe(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<CurrentIdentity>,
    Path(id): Path<String>,
    Json(patch): Json<RecipeUpdate>,
) -> Result<Json<Recipe>> {
    let recipe = state.store.update_recipe(&identity, &id, patch).await?;
    Ok(Json(recipe))
}

/// Delete a recipe. Owner only.
async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<CurrentIdentity>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_recipe(&identity, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Profiles ────────────────────────────────────────────────

/// Create the acting identity's profile.
async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<CurrentIdentity>,
    Json(input): Json<NewProfile>,
) -> Result<(StatusCode, Json<Profile>)> {
    let profile = state.store.create_profile(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Fetch a profile by id. Public.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Profile>> {
    Ok(Json(state.store.get_profile(&id).await?))
}

/// Fetch a profile by username. Public.
async fn get_profile_by_username(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Profile>> {
    Ok(Json(state.store.get_profile_by_username(&username).await?))
}

// ─── Current user ────────────────────────────────────────────

/// Current identity plus its profile, when one exists.
#[derive(Serialize)]
pub struct MeResponse {
    pub identity: IdentityResponse,
    pub profile: Option<Profile>,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<CurrentIdentity>,
) -> Result<Json<MeResponse>> {
    let acting = identity.require()?;
    let profile = state.store.profile_of(&identity).await?;

    Ok(Json(MeResponse {
        identity: IdentityResponse::from(acting),
        profile,
    }))
}
