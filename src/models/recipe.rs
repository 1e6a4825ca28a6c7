//! Recipe model: user-authored content owned by exactly one identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recipe record, stored in the `recipes` table.
///
/// `user_id` is immutable after creation; mutation and deletion require the
/// acting identity's id to equal it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    /// Owning identity's id (foreign key to `profiles.id`)
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: String,
    pub instructions: String,
    /// Minutes, when given
    pub cooking_time: Option<u32>,
    pub difficulty: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for recipe creation.
///
/// There is no `user_id` field here: ownership is always taken from the
/// acting identity, so a spoofed `user_id` in the incoming JSON is dropped
/// by deserialization rather than trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub ingredients: String,
    pub instructions: String,
    #[serde(default)]
    pub cooking_time: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub category: String,
}

/// Field-wise patch for recipe updates. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub cooking_time: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl RecipeUpdate {
    /// Whether the patch changes anything at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.ingredients.is_none()
            && self.instructions.is_none()
            && self.cooking_time.is_none()
            && self.difficulty.is_none()
            && self.category.is_none()
    }

    /// Apply the patch to an existing record.
    pub fn apply_to(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.clone();
        }
        if let Some(description) = &self.description {
            recipe.description = Some(description.clone());
        }
        if let Some(ingredients) = &self.ingredients {
            recipe.ingredients = ingredients.clone();
        }
        if let Some(instructions) = &self.instructions {
            recipe.instructions = instructions.clone();
        }
        if let Some(cooking_time) = self.cooking_time {
            recipe.cooking_time = Some(cooking_time);
        }
        if let Some(difficulty) = &self.difficulty {
            recipe.difficulty = Some(difficulty.clone());
        }
        if let Some(category) = &self.category {
            recipe.category = category.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recipe_ignores_spoofed_user_id() {
        // Unknown fields (including user_id) are dropped, not rejected.
        let input: NewRecipe = serde_json::from_value(serde_json::json!({
            "title": "Soup",
            "ingredients": "water",
            "instructions": "boil",
            "category": "dinner",
            "user_id": "someone-else"
        }))
        .unwrap();

        assert_eq!(input.title, "Soup");
    }

    #[test]
    fn test_update_patch_leaves_owner_untouched() {
        let mut recipe = Recipe {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            title: "Soup".to_string(),
            description: None,
            ingredients: "water".to_string(),
            instructions: "boil".to_string(),
            cooking_time: None,
            difficulty: None,
            category: "dinner".to_string(),
            created_at: Utc::now(),
        };

        let patch = RecipeUpdate {
            title: Some("Stew".to_string()),
            cooking_time: Some(45),
            ..Default::default()
        };
        patch.apply_to(&mut recipe);

        assert_eq!(recipe.title, "Stew");
        assert_eq!(recipe.cooking_time, Some(45));
        assert_eq!(recipe.user_id, "u1");
        assert_eq!(recipe.ingredients, "water");
    }
}
