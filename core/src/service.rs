use std::sync::Arc;

use uuid::Uuid;

use crate::error::{RecipeError, Result};
use crate::models::{Recipe, validate_recipe};
use crate::query::RefreshTrigger;
use crate::recipe_types::{RecipeTypeSource, load_recipe_types};
use crate::repository::RecipeRepository;

/// Fields for a brand-new recipe. The id is generated on create.
#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub title: String,
    /// Falls back to the first available category when `None`.
    pub recipe_type: Option<String>,
    pub ingredients: String,
    pub steps: String,
    pub image: Option<Vec<u8>>,
}

/// Edits applied on top of the stored record before it is written back in full.
#[derive(Debug, Clone, Default)]
#[allow(clippy::option_option)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub recipe_type: Option<String>,
    pub ingredients: Option<String>,
    pub steps: Option<String>,
    /// `Some(None)` removes the image.
    pub image: Option<Option<Vec<u8>>>,
}

impl RecipeChanges {
    #[must_use]
    pub fn apply(self, mut recipe: Recipe) -> Recipe {
        if let Some(title) = self.title {
            recipe.title = title;
        }
        if let Some(recipe_type) = self.recipe_type {
            recipe.recipe_type = recipe_type;
        }
        if let Some(ingredients) = self.ingredients {
            recipe.ingredients = ingredients;
        }
        if let Some(steps) = self.steps {
            recipe.steps = steps;
        }
        if let Some(image) = self.image {
            recipe.image = image;
        }
        recipe
    }
}

/// Caller-facing recipe API: validation, persistence, and the list refresh that
/// follows every successful write.
pub struct RecipeService {
    repo: Arc<dyn RecipeRepository>,
    types: Arc<dyn RecipeTypeSource>,
    refresh: Option<RefreshTrigger>,
}

impl RecipeService {
    pub fn new(repo: Arc<dyn RecipeRepository>, types: Arc<dyn RecipeTypeSource>) -> Self {
        Self {
            repo,
            types,
            refresh: None,
        }
    }

    #[must_use]
    pub fn with_refresh(mut self, trigger: RefreshTrigger) -> Self {
        self.refresh = Some(trigger);
        self
    }

    pub fn recipe_types(&self) -> Vec<String> {
        load_recipe_types(self.types.as_ref())
    }

    pub async fn fetch_recipes(&self, recipe_type: Option<&str>) -> Result<Vec<Recipe>> {
        self.repo.fetch_recipes(recipe_type).await
    }

    pub async fn get_recipe(&self, id: Uuid) -> Result<Recipe> {
        self.repo
            .get_recipe(id)
            .await?
            .ok_or_else(|| RecipeError::NotFound(id.to_string()))
    }

    /// Rejects an empty title before anything reaches the store.
    pub async fn save_recipe(&self, recipe: Recipe) -> Result<()> {
        validate_recipe(&recipe)?;
        self.repo.save_recipe(recipe).await?;
        self.fire_refresh();
        Ok(())
    }

    /// Idempotent. Returns whether a recipe with this id existed.
    pub async fn delete_recipe(&self, id: Uuid) -> Result<bool> {
        let existed = self.repo.delete_recipe(id).await?;
        self.fire_refresh();
        Ok(existed)
    }

    pub async fn create_recipe(&self, new: NewRecipe) -> Result<Recipe> {
        let recipe_type = match new.recipe_type {
            Some(t) if !t.is_empty() => t,
            _ => self.recipe_types().into_iter().next().ok_or_else(|| {
                RecipeError::Validation("Title and type are required".to_string())
            })?,
        };
        if new.title.is_empty() {
            return Err(RecipeError::Validation(
                "Title and type are required".to_string(),
            ));
        }

        let recipe = Recipe::new(new.title, recipe_type, new.ingredients, new.steps)
            .with_image(new.image);
        self.save_recipe(recipe.clone()).await?;
        Ok(recipe)
    }

    pub async fn update_recipe(&self, id: Uuid, changes: RecipeChanges) -> Result<Recipe> {
        let current = self.get_recipe(id).await?;
        let updated = changes.apply(current);
        self.save_recipe(updated.clone()).await?;
        Ok(updated)
    }

    fn fire_refresh(&self) {
        if let Some(trigger) = &self.refresh {
            trigger.fire();
        }
    }
}
