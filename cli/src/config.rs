use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use recipebox_core::query::{DEFAULT_DEBOUNCE, QueryConfig};
use recipebox_core::recipe_types::{BundledRecipeTypes, FileRecipeTypeSource, RecipeTypeSource};

pub const DB_ENV: &str = "RECIPEBOX_DB";
pub const DEBOUNCE_ENV: &str = "RECIPEBOX_DEBOUNCE_MS";

pub struct Config {
    pub db_path: PathBuf,
    pub recipe_types_path: PathBuf,
    pub debounce: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "recipebox").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = std::env::var_os(DB_ENV)
            .map_or_else(|| data_dir.join("recipebox.db"), PathBuf::from);
        let debounce = parse_debounce(std::env::var(DEBOUNCE_ENV).ok().as_deref())?;

        Ok(Config {
            db_path,
            recipe_types_path: data_dir.join("recipetypes.json"),
            debounce,
        })
    }

    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            debounce: self.debounce,
        }
    }

    /// A `recipetypes.json` in the data directory replaces the bundled list.
    pub fn recipe_type_source(&self) -> Arc<dyn RecipeTypeSource> {
        if self.recipe_types_path.exists() {
            Arc::new(FileRecipeTypeSource::new(&self.recipe_types_path))
        } else {
            Arc::new(BundledRecipeTypes)
        }
    }
}

fn parse_debounce(raw: Option<&str>) -> Result<Duration> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_DEBOUNCE),
        Some(ms) => {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("Invalid {DEBOUNCE_ENV} '{ms}'. Use milliseconds"))?;
            Ok(Duration::from_millis(ms))
        }
    }
}
