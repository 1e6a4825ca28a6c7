// SPDX-License-Identifier: MIT

//! Ownership-scoped data store.
//!
//! Every content record is bound to exactly one owning identity; only that
//! identity may mutate or delete it. Writes validate fields and ownership
//! here before any row reaches the provider, and `user_id` is always taken
//! from the acting identity, never from caller input. Reads are public.

use crate::error::AppError;
use crate::middleware::session::CurrentIdentity;
use crate::models::{NewProfile, NewRecipe, Profile, Recipe, RecipeUpdate};
use crate::provider::{RecipeFilter, RecordClient};
use chrono::Utc;

const MAX_USERNAME_LEN: usize = 32;

/// Store over the provider's `profiles` and `recipes` tables.
#[derive(Clone)]
pub struct ContentStore {
    records: RecordClient,
}

impl ContentStore {
    pub fn new(records: RecordClient) -> Self {
        Self { records }
    }

    // ─── Recipes ─────────────────────────────────────────────────

    /// Create a recipe owned by the acting identity.
    pub async fn create_recipe(
        &self,
        actor: &CurrentIdentity,
        input: NewRecipe,
    ) -> Result<Recipe, AppError> {
        let identity = actor.require()?;

        require_field("title", &input.title)?;
        require_field("ingredients", &input.ingredients)?;
        require_field("instructions", &input.instructions)?;
        require_field("category", &input.category)?;
        check_cooking_time(input.cooking_time)?;

        let recipe = Recipe {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: identity.id.clone(),
            title: input.title.trim().to_string(),
            description: input.description,
            ingredients: input.ingredients,
            instructions: input.instructions,
            cooking_time: input.cooking_time,
            difficulty: input.difficulty,
            category: input.category.trim().to_string(),
            created_at: Utc::now(),
        };

        let created = self.records.insert_recipe(&recipe).await?;
        tracing::info!(recipe_id = %created.id, user_id = %created.user_id, "Recipe created");
        Ok(created)
    }

    /// Update a recipe. Only the owner may do this.
    pub async fn update_recipe(
        &self,
        actor: &CurrentIdentity,
        recipe_id: &str,
        patch: RecipeUpdate,
    ) -> Result<Recipe, AppError> {
        let identity = actor.require()?;

        let existing = self
            .records
            .get_recipe(recipe_id)
            .await?
            .ok_or_else(|| AppError::NotFound("recipe".to_string()))?;
        if existing.user_id != identity.id {
            return Err(AppError::Forbidden);
        }

        if patch.is_empty() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }
        // A patch may not blank out a required field.
        for (name, value) in [
            ("title", &patch.title),
            ("ingredients", &patch.ingredients),
            ("instructions", &patch.instructions),
            ("category", &patch.category),
        ] {
            if let Some(value) = value {
                require_field(name, value)?;
            }
        }
        check_cooking_time(patch.cooking_time)?;

        self.records
            .update_recipe(recipe_id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound("recipe".to_string()))
    }

    /// Delete a recipe. Only the owner may do this.
    pub async fn delete_recipe(
        &self,
        actor: &CurrentIdentity,
        recipe_id: &str,
    ) -> Result<(), AppError> {
        let identity = actor.require()?;

        let existing = self
            .records
            .get_recipe(recipe_id)
            .await?
            .ok_or_else(|| AppError::NotFound("recipe".to_string()))?;
        if existing.user_id != identity.id {
            return Err(AppError::Forbidden);
        }

        self.records.delete_recipe(recipe_id).await?;
        tracing::info!(recipe_id, user_id = %identity.id, "Recipe deleted");
        Ok(())
    }

    /// Public read.
    pub async fn get_recipe(&self, recipe_id: &str) -> Result<Recipe, AppError> {
        self.records
            .get_recipe(recipe_id)
            .await?
            .ok_or_else(|| AppError::NotFound("recipe".to_string()))
    }

    /// Public read, newest first.
    pub async fn list_recipes(&self, filter: RecipeFilter) -> Result<Vec<Recipe>, AppError> {
        self.records.list_recipes(&filter).await
    }

    // ─── Profiles ────────────────────────────────────────────────

    /// Create the acting identity's profile. At most one per identity; the
    /// username must be unique across all profiles.
    pub async fn create_profile(
        &self,
        actor: &CurrentIdentity,
        input: NewProfile,
    ) -> Result<Profile, AppError> {
        let identity = actor.require()?;

        let username = input.username.trim().to_string();
        require_field("username", &username)?;
        if username.len() > MAX_USERNAME_LEN {
            return Err(AppError::Validation(format!(
                "username may be at most {} characters",
                MAX_USERNAME_LEN
            )));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AppError::Validation(
                "username may only contain letters, digits, '_' and '-'".to_string(),
            ));
        }

        if self.records.get_profile(&identity.id).await?.is_some() {
            return Err(AppError::Conflict(
                "a profile already exists for this account".to_string(),
            ));
        }
        if self
            .records
            .get_profile_by_username(&username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("username is already taken".to_string()));
        }

        let now = Utc::now();
        let profile = Profile {
            id: identity.id.clone(),
            username,
            full_name: input.full_name,
            created_at: now,
            updated_at: now,
        };

        // The provider's unique constraints still backstop the checks above
        // against concurrent creation.
        let created = self.records.insert_profile(&profile).await?;
        tracing::info!(user_id = %created.id, username = %created.username, "Profile created");
        Ok(created)
    }

    /// Public read.
    pub async fn get_profile(&self, id: &str) -> Result<Profile, AppError> {
        self.records
            .get_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound("profile".to_string()))
    }

    /// Public read.
    pub async fn get_profile_by_username(&self, username: &str) -> Result<Profile, AppError> {
        self.records
            .get_profile_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("profile".to_string()))
    }

    /// The acting identity's own profile, if created.
    pub async fn profile_of(&self, actor: &CurrentIdentity) -> Result<Option<Profile>, AppError> {
        let identity = actor.require()?;
        self.records.get_profile(&identity.id).await
    }
}

fn require_field(name: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", name)));
    }
    Ok(())
}

fn check_cooking_time(minutes: Option<u32>) -> Result<(), AppError> {
    if minutes == Some(0) {
        return Err(AppError::Validation(
            "cooking_time must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    fn store() -> ContentStore {
        ContentStore::new(RecordClient::in_memory())
    }

    fn actor(id: &str) -> CurrentIdentity {
        let now = Utc::now();
        CurrentIdentity::Authenticated(Identity {
            id: id.to_string(),
            email: format!("{}@x.com", id),
            issued_at: now,
            expires_at: now + chrono::Duration::hours(1),
        })
    }

    fn soup() -> NewRecipe {
        NewRecipe {
            title: "Soup".to_string(),
            description: None,
            ingredients: "water".to_string(),
            instructions: "boil".to_string(),
            cooking_time: None,
            difficulty: None,
            category: "dinner".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_recipe_takes_owner_from_identity() {
        let store = store();
        let recipe = store.create_recipe(&actor("u1"), soup()).await.unwrap();
        assert_eq!(recipe.user_id, "u1");
    }

    #[tokio::test]
    async fn test_create_recipe_requires_identity() {
        let store = store();
        assert!(matches!(
            store.create_recipe(&CurrentIdentity::Anonymous, soup()).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_blank_required_fields_rejected() {
        let store = store();

        let mut input = soup();
        input.title = "   ".to_string();
        let err = store.create_recipe(&actor("u1"), input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("title")));

        let mut input = soup();
        input.cooking_time = Some(0);
        assert!(matches!(
            store.create_recipe(&actor("u1"), input).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_enforces_ownership() {
        let store = store();
        let recipe = store.create_recipe(&actor("u1"), soup()).await.unwrap();

        let patch = RecipeUpdate {
            title: Some("Stew".to_string()),
            ..Default::default()
        };
        let err = store
            .update_recipe(&actor("u2"), &recipe.id, patch.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        // Record unchanged after the forbidden attempt
        assert_eq!(store.get_recipe(&recipe.id).await.unwrap().title, "Soup");

        let updated = store
            .update_recipe(&actor("u1"), &recipe.id, patch)
            .await
            .unwrap();
        assert_eq!(updated.title, "Stew");
        assert_eq!(updated.user_id, "u1");
    }

    #[tokio::test]
    async fn test_update_cannot_blank_required_field() {
        let store = store();
        let recipe = store.create_recipe(&actor("u1"), soup()).await.unwrap();

        let patch = RecipeUpdate {
            ingredients: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_recipe(&actor("u1"), &recipe.id, patch).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_enforces_ownership() {
        let store = store();
        let recipe = store.create_recipe(&actor("u1"), soup()).await.unwrap();

        assert!(matches!(
            store.delete_recipe(&actor("u2"), &recipe.id).await,
            Err(AppError::Forbidden)
        ));
        store.delete_recipe(&actor("u1"), &recipe.id).await.unwrap();
        assert!(matches!(
            store.get_recipe(&recipe.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_recipe_is_not_found() {
        let store = store();
        assert!(matches!(
            store.delete_recipe(&actor("u1"), "missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_created_once() {
        let store = store();

        let profile = store
            .create_profile(
                &actor("u1"),
                NewProfile {
                    username: "alice".to_string(),
                    full_name: Some("Alice".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.id, "u1");

        // Second creation for the same identity conflicts and leaves the
        // original untouched.
        let err = store
            .create_profile(
                &actor("u1"),
                NewProfile {
                    username: "alice2".to_string(),
                    full_name: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.get_profile("u1").await.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_username_unique_across_identities() {
        let store = store();

        store
            .create_profile(
                &actor("u1"),
                NewProfile {
                    username: "alice".to_string(),
                    full_name: None,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            store
                .create_profile(
                    &actor("u2"),
                    NewProfile {
                        username: "alice".to_string(),
                        full_name: None,
                    },
                )
                .await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_username_charset() {
        let store = store();
        assert!(matches!(
            store
                .create_profile(
                    &actor("u1"),
                    NewProfile {
                        username: "not valid!".to_string(),
                        full_name: None,
                    },
                )
                .await,
            Err(AppError::Validation(_))
        ));
    }
}
