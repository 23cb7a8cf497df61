use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::Path;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use uuid::Uuid;

use recipebox_core::models::Recipe;

const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

pub(crate) fn parse_recipe_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).with_context(|| format!("Invalid recipe ID '{s}'"))
}

/// Read an image file into memory. The bytes are stored as-is.
pub(crate) fn read_image(path: &Path) -> Result<Vec<u8>> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    if meta.len() > MAX_IMAGE_BYTES {
        bail!(
            "Image {} is too large ({} bytes, max {MAX_IMAGE_BYTES})",
            path.display(),
            meta.len()
        );
    }
    std::fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Type")]
        recipe_type: String,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
        #[tabled(rename = "Image")]
        image: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .enumerate()
        .map(|(i, r)| RecipeRow {
            idx: i + 1,
            id: r.id.to_string(),
            title: truncate(&r.title, 30),
            recipe_type: r.recipe_type.clone(),
            ingredients: truncate(&one_line(&r.ingredients), 30),
            image: r.image.as_ref().map_or("-".into(), |b| format_size(b.len())),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_recipe_detail(recipe: &Recipe) {
    let title = &recipe.title;
    let recipe_type = &recipe.recipe_type;
    let id = recipe.id;
    println!("=== {title} ===");
    println!("  Type: {recipe_type}  |  ID: {id}");
    if let Some(image) = &recipe.image {
        println!("  Image: {}", format_size(image.len()));
    }

    println!("\n  INGREDIENTS:");
    for line in recipe.ingredients.lines().filter(|l| !l.trim().is_empty()) {
        println!("    {}", line.trim());
    }

    println!("\n  STEPS:");
    for line in recipe.steps.lines().filter(|l| !l.trim().is_empty()) {
        println!("    {}", line.trim());
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
