// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod identity;
pub mod profile;
pub mod recipe;

pub use identity::{Identity, Session};
pub use profile::{NewProfile, Profile};
pub use recipe::{NewRecipe, Recipe, RecipeUpdate};
