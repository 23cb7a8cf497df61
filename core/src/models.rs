use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RecipeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub recipe_type: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub steps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
}

impl Recipe {
    /// Build a brand-new record with a freshly generated id.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        recipe_type: impl Into<String>,
        ingredients: impl Into<String>,
        steps: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            recipe_type: recipe_type.into(),
            ingredients: ingredients.into(),
            steps: steps.into(),
            image: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: Option<Vec<u8>>) -> Self {
        self.image = image;
        self
    }
}

/// Predicate accepted by the store's `find_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecipeFilter {
    #[default]
    All,
    /// Exact match on the type label.
    Type(String),
    /// Title is one of the given values (exact, case-sensitive).
    Titles(Vec<String>),
}

impl RecipeFilter {
    #[must_use]
    pub fn by_type(recipe_type: Option<&str>) -> Self {
        recipe_type.map_or(Self::All, |t| Self::Type(t.to_string()))
    }

    #[must_use]
    pub fn matches(&self, recipe: &Recipe) -> bool {
        match self {
            Self::All => true,
            Self::Type(t) => recipe.recipe_type == *t,
            Self::Titles(titles) => titles.iter().any(|t| *t == recipe.title),
        }
    }
}

pub fn validate_recipe(recipe: &Recipe) -> Result<(), RecipeError> {
    if recipe.title.is_empty() {
        return Err(RecipeError::Validation("Title is required".to_string()));
    }
    Ok(())
}

/// Case-insensitive substring match on the title. An empty needle matches everything.
#[must_use]
pub fn title_matches(recipe: &Recipe, search: &str) -> bool {
    search.is_empty() || recipe.title.to_lowercase().contains(&search.to_lowercase())
}
