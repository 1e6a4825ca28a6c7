// SPDX-License-Identifier: MIT

//! Clients for the hosted identity/storage provider.

pub mod auth;
pub mod records;

pub use auth::{AuthClient, InMemoryAuth};
pub use records::{RecordClient, RecipeFilter};
