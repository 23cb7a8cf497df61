use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Recipe, RecipeFilter};
use crate::store::RecipeStore;

/// Domain-facing recipe operations. Keeps the query pipeline independent of the
/// storage technology.
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Recipes of the given type, or every recipe when `recipe_type` is `None`.
    async fn fetch_recipes(&self, recipe_type: Option<&str>) -> Result<Vec<Recipe>>;

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>>;

    async fn save_recipe(&self, recipe: Recipe) -> Result<()>;

    async fn delete_recipe(&self, id: Uuid) -> Result<bool>;
}

/// Pass-through over a [`RecipeStore`]. No caching, no validation.
#[derive(Clone)]
pub struct StoreRepository {
    store: Arc<dyn RecipeStore>,
}

impl StoreRepository {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecipeRepository for StoreRepository {
    async fn fetch_recipes(&self, recipe_type: Option<&str>) -> Result<Vec<Recipe>> {
        self.store.find_all(RecipeFilter::by_type(recipe_type)).await
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>> {
        self.store.get(id).await
    }

    async fn save_recipe(&self, recipe: Recipe) -> Result<()> {
        self.store.upsert(recipe).await
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<bool> {
        self.store.delete_by_id(id).await
    }
}
