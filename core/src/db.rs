use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use crate::models::{Recipe, RecipeFilter};

const RECIPE_COLUMNS: &str = "id, title, type, ingredients, steps, image";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            // `seq` keeps insertion order stable across in-place updates.
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    type TEXT NOT NULL,
                    ingredients TEXT NOT NULL DEFAULT '',
                    steps TEXT NOT NULL DEFAULT '',
                    image BLOB
                );

                CREATE UNIQUE INDEX IF NOT EXISTS idx_recipes_id ON recipes(id);
                CREATE INDEX IF NOT EXISTS idx_recipes_type ON recipes(type);
                CREATE INDEX IF NOT EXISTS idx_recipes_title ON recipes(title);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects columns in RECIPE_COLUMNS order.
    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        let raw_id: String = row.get(0)?;
        let id = Uuid::parse_str(&raw_id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Recipe {
            id,
            title: row.get(1)?,
            recipe_type: row.get(2)?,
            ingredients: row.get(3)?,
            steps: row.get(4)?,
            image: row.get(5)?,
        })
    }

    // --- Recipes ---

    pub fn find_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let recipes = match filter {
            RecipeFilter::All => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY seq"))?;
                let rows = stmt
                    .query_map([], Self::recipe_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            RecipeFilter::Type(recipe_type) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {RECIPE_COLUMNS} FROM recipes WHERE type = ?1 ORDER BY seq"
                ))?;
                let rows = stmt
                    .query_map(params![recipe_type], Self::recipe_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            RecipeFilter::Titles(titles) => {
                if titles.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = (1..=titles.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {RECIPE_COLUMNS} FROM recipes WHERE title IN ({placeholders}) ORDER BY seq"
                ))?;
                let rows = stmt
                    .query_map(params_from_iter(titles.iter()), Self::recipe_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(recipes)
    }

    pub fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>> {
        self.conn
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
                params![id.to_string()],
                Self::recipe_from_row,
            )
            .optional()
            .context("Failed to load recipe")
    }

    /// Insert the recipe, or overwrite every field of the existing row with the same id.
    ///
    /// The existence check and the write share one transaction. Returns `true` when a
    /// new row was inserted.
    pub fn upsert_recipe(&self, recipe: &Recipe) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let id = recipe.id.to_string();

        let existing: Option<i64> = tx
            .query_row(
                "SELECT seq FROM recipes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let inserted = if let Some(seq) = existing {
            tx.execute(
                "UPDATE recipes SET title = ?1, type = ?2, ingredients = ?3, steps = ?4, image = ?5
                 WHERE seq = ?6",
                params![
                    recipe.title,
                    recipe.recipe_type,
                    recipe.ingredients,
                    recipe.steps,
                    recipe.image,
                    seq,
                ],
            )?;
            false
        } else {
            tx.execute(
                "INSERT INTO recipes (id, title, type, ingredients, steps, image)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    recipe.title,
                    recipe.recipe_type,
                    recipe.ingredients,
                    recipe.steps,
                    recipe.image,
                ],
            )?;
            true
        };

        tx.commit()
            .with_context(|| format!("Failed to save recipe {id}"))?;
        Ok(inserted)
    }

    /// Deleting an id that does not exist is not an error; returns whether a row was removed.
    pub fn delete_recipe(&self, id: Uuid) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![id.to_string()])?;
        Ok(rows > 0)
    }

    #[cfg(test)]
    fn count_recipes(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count)
    }
}
