//! Durable keyed recipe storage.
//!
//! Every store is single-writer: operations on one instance are applied one at a
//! time in arrival order (the async mutex used here is FIFO-fair), so no caller ever
//! observes a half-applied write.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Recipe, RecipeFilter};

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// All records matching `filter`, in insertion order.
    async fn find_all(&self, filter: RecipeFilter) -> Result<Vec<Recipe>>;

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>>;

    /// Insert, or overwrite every field of the record with the same id.
    async fn upsert(&self, recipe: Recipe) -> Result<()>;

    /// Remove the record if present. Returns whether one existed.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
}

/// SQLite-backed store. The blocking connection work runs on tokio's blocking pool
/// while the instance lock is held.
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.db).lock_owned().await;
        let value = tokio::task::spawn_blocking(move || f(&guard)).await??;
        Ok(value)
    }
}

#[async_trait]
impl RecipeStore for SqliteStore {
    async fn find_all(&self, filter: RecipeFilter) -> Result<Vec<Recipe>> {
        self.with_db(move |db| db.find_recipes(&filter)).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>> {
        self.with_db(move |db| db.get_recipe(id)).await
    }

    async fn upsert(&self, recipe: Recipe) -> Result<()> {
        self.with_db(move |db| db.upsert_recipe(&recipe).map(|_| ()))
            .await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        self.with_db(move |db| db.delete_recipe(id)).await
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    recipes: Mutex<Vec<Recipe>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_recipes(recipes: Vec<Recipe>) -> Self {
        Self {
            recipes: Mutex::new(recipes),
        }
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn find_all(&self, filter: RecipeFilter) -> Result<Vec<Recipe>> {
        let recipes = self.recipes.lock().await;
        Ok(recipes
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>> {
        let recipes = self.recipes.lock().await;
        Ok(recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn upsert(&self, recipe: Recipe) -> Result<()> {
        let mut recipes = self.recipes.lock().await;
        if let Some(existing) = recipes.iter_mut().find(|r| r.id == recipe.id) {
            *existing = recipe;
        } else {
            recipes.push(recipe);
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let mut recipes = self.recipes.lock().await;
        let before = recipes.len();
        recipes.retain(|r| r.id != id);
        Ok(recipes.len() != before)
    }
}
