//! Category labels offered when creating or filtering recipes.
//!
//! The list comes from a small JSON document of the form
//! `{"recipeTypes": ["Breakfast", ...]}`. A copy is compiled into the binary; a file
//! on disk can replace it.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

const BUNDLED_RECIPE_TYPES: &str = include_str!("../recipetypes.json");

pub trait RecipeTypeSource: Send + Sync {
    fn fetch_recipe_types(&self) -> Result<Vec<String>>;
}

pub struct BundledRecipeTypes;

impl RecipeTypeSource for BundledRecipeTypes {
    fn fetch_recipe_types(&self) -> Result<Vec<String>> {
        parse_recipe_types(BUNDLED_RECIPE_TYPES).context("Bundled recipe types are malformed")
    }
}

pub struct FileRecipeTypeSource {
    path: PathBuf,
}

impl FileRecipeTypeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecipeTypeSource for FileRecipeTypeSource {
    fn fetch_recipe_types(&self) -> Result<Vec<String>> {
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        parse_recipe_types(&data)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

pub fn parse_recipe_types(json: &str) -> Result<Vec<String>> {
    let doc: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
    Ok(doc.get("recipeTypes").cloned().unwrap_or_default())
}

/// Never fails: a broken source is logged and treated as "no categories".
pub fn load_recipe_types(source: &dyn RecipeTypeSource) -> Vec<String> {
    match source.fetch_recipe_types() {
        Ok(types) => types,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "could not load recipe types");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_types() {
        let types = load_recipe_types(&BundledRecipeTypes);
        assert_eq!(types.first().map(String::as_str), Some("Breakfast"));
        assert!(types.iter().any(|t| t == "Dessert"));
    }

    #[test]
    fn test_parse_missing_key_is_empty() {
        assert!(parse_recipe_types(r#"{"other": ["x"]}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_recipe_types("not json").is_err());
        assert!(parse_recipe_types(r#"{"recipeTypes": "Breakfast"}"#).is_err());
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipetypes.json");
        std::fs::write(&path, r#"{"recipeTypes": ["Soup", "Bread"]}"#).unwrap();

        let source = FileRecipeTypeSource::new(&path);
        assert_eq!(load_recipe_types(&source), vec!["Soup", "Bread"]);
    }

    #[test]
    fn test_missing_file_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileRecipeTypeSource::new(dir.path().join("nope.json"));
        assert!(source.fetch_recipe_types().is_err());
        assert!(load_recipe_types(&source).is_empty());
    }

    #[test]
    fn test_malformed_file_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipetypes.json");
        std::fs::write(&path, "{").unwrap();
        assert!(load_recipe_types(&FileRecipeTypeSource::new(path)).is_empty());
    }
}
