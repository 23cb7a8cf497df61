use anyhow::Result;
use std::path::PathBuf;
use std::process;

use recipebox_core::RecipeError;
use recipebox_core::service::{NewRecipe, RecipeChanges, RecipeService};

use super::helpers::{json_error, parse_recipe_id, print_recipe_detail, read_image};

pub(crate) struct AddArgs {
    pub title: String,
    pub recipe_type: Option<String>,
    pub ingredients: String,
    pub steps: String,
    pub image: Option<PathBuf>,
}

pub(crate) struct EditArgs {
    pub title: Option<String>,
    pub recipe_type: Option<String>,
    pub ingredients: Option<String>,
    pub steps: Option<String>,
    pub image: Option<PathBuf>,
    pub clear_image: bool,
}

pub(crate) async fn cmd_recipe_show(svc: &RecipeService, id: &str, json: bool) -> Result<()> {
    let id = parse_recipe_id(id)?;
    match svc.get_recipe(id).await {
        Ok(recipe) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&recipe)?);
            } else {
                print_recipe_detail(&recipe);
            }
            Ok(())
        }
        Err(RecipeError::NotFound(_)) => not_found(&id.to_string(), json),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn cmd_recipe_add(svc: &RecipeService, args: AddArgs, json: bool) -> Result<()> {
    let image = args.image.as_deref().map(read_image).transpose()?;
    let recipe = svc
        .create_recipe(NewRecipe {
            title: args.title,
            recipe_type: args.recipe_type,
            ingredients: args.ingredients,
            steps: args.steps,
            image,
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let title = &recipe.title;
        let recipe_type = &recipe.recipe_type;
        let id = recipe.id;
        println!("Added recipe: {title} ({recipe_type}, id: {id})");
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_edit(
    svc: &RecipeService,
    id: &str,
    args: EditArgs,
    json: bool,
) -> Result<()> {
    let id = parse_recipe_id(id)?;
    let image = if args.clear_image {
        Some(None)
    } else {
        args.image.as_deref().map(read_image).transpose()?.map(Some)
    };
    let changes = RecipeChanges {
        title: args.title,
        recipe_type: args.recipe_type,
        ingredients: args.ingredients,
        steps: args.steps,
        image,
    };

    match svc.update_recipe(id, changes).await {
        Ok(recipe) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&recipe)?);
            } else {
                let title = &recipe.title;
                println!("Updated recipe: {title} (id: {id})");
            }
            Ok(())
        }
        Err(RecipeError::NotFound(_)) => not_found(&id.to_string(), json),
        Err(e) => Err(e.into()),
    }
}

/// Deleting an unknown id succeeds; the output says whether anything was removed.
pub(crate) async fn cmd_recipe_delete(svc: &RecipeService, id: &str, json: bool) -> Result<()> {
    let id = parse_recipe_id(id)?;
    let existed = svc.delete_recipe(id).await?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "id": id.to_string(), "deleted": existed })
        );
    } else if existed {
        println!("Deleted recipe {id}");
    } else {
        println!("No recipe with id {id}; nothing to delete");
    }
    Ok(())
}

pub(crate) fn cmd_types(svc: &RecipeService, json: bool) -> Result<()> {
    let types = svc.recipe_types();
    if json {
        println!("{}", serde_json::to_string_pretty(&types)?);
        return Ok(());
    }
    if types.is_empty() {
        eprintln!("No recipe types available");
        process::exit(2);
    }
    for t in &types {
        println!("{t}");
    }
    Ok(())
}

fn not_found(id: &str, json: bool) -> Result<()> {
    let message = format!("Recipe '{id}' not found");
    if json {
        println!("{}", json_error(&message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}
