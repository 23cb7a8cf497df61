use anyhow::{Context, Result, bail};
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use recipebox_core::query::{QueryCoordinator, QueryInputs, ResultSet};
use recipebox_core::service::RecipeService;

use super::helpers::{parse_recipe_id, print_recipe_table};

/// One-shot listing through the query pipeline. The filters are applied and then
/// refreshed so the query runs without waiting out the debounce.
pub(crate) async fn cmd_list(
    coordinator: &QueryCoordinator,
    recipe_type: Option<String>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let expected = QueryInputs {
        recipe_type,
        search_text: search.unwrap_or_default(),
    };

    let mut results = coordinator.subscribe();
    let mut failures = coordinator.subscribe_failures();
    let after = if expected == QueryInputs::default() {
        0
    } else {
        let issued = results.borrow().tick;
        coordinator.set_type(expected.recipe_type.clone());
        coordinator.set_search_text(expected.search_text.clone());
        coordinator.refresh();
        issued
    };

    let set = loop {
        tokio::select! {
            set = results.wait_for(|r| r.tick > after && r.inputs == expected) => {
                break set.context("Query pipeline stopped")?.clone();
            }
            failure = failures.recv() => match failure {
                Ok(f) if f.inputs == expected => bail!("Failed to list recipes: {}", f.error),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => bail!("Query pipeline stopped"),
            },
        }
    };

    if set.recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&set.recipes)?);
    } else {
        print_recipe_table(&set.recipes);
    }
    Ok(())
}

/// Interactive list. Each stdin line edits the query inputs; the list is reprinted
/// whenever the pipeline publishes a new result set.
///
/// - plain text sets the search text (an empty line clears it)
/// - `:type <name>` filters by type, `:type` alone clears the filter
/// - `:delete <id>` removes a recipe and the list refreshes
/// - `:refresh` re-runs the current query, `:quit` exits
pub(crate) async fn cmd_browse(
    coordinator: &QueryCoordinator,
    svc: &RecipeService,
    json: bool,
) -> Result<()> {
    let printer = tokio::spawn(print_results(coordinator.subscribe(), json));
    let mut failures = coordinator.subscribe_failures();
    let reporter = tokio::spawn(async move {
        loop {
            match failures.recv().await {
                Ok(f) => eprintln!("Query failed: {}", f.error),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    if !json {
        eprintln!("Type to search. Commands: :type [name], :delete <id>, :refresh, :quit");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_browse_line(&line) {
            BrowseInput::Search(text) => coordinator.set_search_text(text),
            BrowseInput::Type(recipe_type) => coordinator.set_type(recipe_type),
            BrowseInput::Refresh => coordinator.refresh(),
            BrowseInput::Delete(id) => {
                delete_from_browse(svc, &id).await;
            }
            BrowseInput::Quit => break,
        }
    }

    printer.abort();
    reporter.abort();
    Ok(())
}

/// Errors are reported and the session carries on. Returns whether a recipe was removed.
async fn delete_from_browse(svc: &RecipeService, raw_id: &str) -> bool {
    let id = match parse_recipe_id(raw_id) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e:#}");
            return false;
        }
    };
    match svc.delete_recipe(id).await {
        Ok(true) => true,
        Ok(false) => {
            eprintln!("No recipe with id {id}");
            false
        }
        Err(e) => {
            eprintln!("Failed to delete {id}: {e}");
            false
        }
    }
}

async fn print_results(mut results: tokio::sync::watch::Receiver<ResultSet>, json: bool) {
    while results.changed().await.is_ok() {
        let set = results.borrow_and_update().clone();
        if json {
            if let Ok(line) = serde_json::to_string(&set.recipes) {
                println!("{line}");
            }
            continue;
        }
        println!("\n{}", describe_inputs(&set.inputs));
        if set.recipes.is_empty() {
            println!("  (no recipes)");
        } else {
            print_recipe_table(&set.recipes);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum BrowseInput {
    Search(String),
    Type(Option<String>),
    Delete(String),
    Refresh,
    Quit,
}

fn parse_browse_line(line: &str) -> BrowseInput {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix(':') else {
        return BrowseInput::Search(trimmed.to_string());
    };
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(n, a)| (n, a.trim()));
    match name {
        "type" | "t" if arg.is_empty() => BrowseInput::Type(None),
        "type" | "t" => BrowseInput::Type(Some(arg.to_string())),
        "delete" | "d" => BrowseInput::Delete(arg.to_string()),
        "refresh" | "r" => BrowseInput::Refresh,
        "quit" | "q" => BrowseInput::Quit,
        _ => BrowseInput::Search(trimmed.to_string()),
    }
}

fn describe_inputs(inputs: &QueryInputs) -> String {
    let recipe_type = inputs.recipe_type.as_deref().unwrap_or("all types");
    if inputs.search_text.is_empty() {
        format!("Recipes ({recipe_type})")
    } else {
        format!("Recipes ({recipe_type}, matching '{}')", inputs.search_text)
    }
}
