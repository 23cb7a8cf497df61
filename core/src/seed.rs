//! First-launch default dataset.
//!
//! Candidates get fresh ids on every run, so dedup is keyed on title: a default is
//! inserted only when no stored record carries the same title. A user recipe that
//! happens to share a default's title therefore suppresses that default.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Recipe, RecipeFilter};
use crate::store::RecipeStore;

#[must_use]
pub fn default_recipes() -> Vec<Recipe> {
    vec![
        Recipe::new(
            "Pancakes",
            "Breakfast",
            "Flour, Eggs, Milk",
            "1. Mix ingredients \n2. Cook on skillet",
        ),
        Recipe::new(
            "Chocolate Cake",
            "Dessert",
            "Flour, Cocoa, Sugar",
            "1. Mix ingredients \n2. Bake at 350°F",
        ),
    ]
}

/// Insert the default recipes that are not already present. Returns how many were inserted.
pub async fn seed_defaults(store: &dyn RecipeStore) -> Result<usize> {
    seed_recipes(store, default_recipes()).await
}

pub async fn seed_recipes(store: &dyn RecipeStore, candidates: Vec<Recipe>) -> Result<usize> {
    let titles: Vec<String> = candidates.iter().map(|r| r.title.clone()).collect();
    let existing: HashSet<String> = store
        .find_all(RecipeFilter::Titles(titles))
        .await?
        .into_iter()
        .map(|r| r.title)
        .collect();

    let mut inserted = 0;
    for recipe in candidates {
        if existing.contains(&recipe.title) {
            continue;
        }
        debug!(title = %recipe.title, "seeding default recipe");
        store.upsert(recipe).await?;
        inserted += 1;
    }

    if inserted > 0 {
        info!(inserted, "seeded default recipes");
    }
    Ok(inserted)
}
