mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    AddArgs, EditArgs, cmd_browse, cmd_list, cmd_recipe_add, cmd_recipe_delete, cmd_recipe_edit,
    cmd_recipe_show, cmd_types,
};
use crate::config::Config;
use recipebox_core::query::QueryCoordinator;
use recipebox_core::repository::{RecipeRepository, StoreRepository};
use recipebox_core::seed::seed_defaults;
use recipebox_core::service::RecipeService;
use recipebox_core::store::{RecipeStore, SqliteStore};

const LOG_ENV: &str = "RECIPEBOX_LOG";

#[derive(Parser)]
#[command(name = "recipebox", version, about = "A small local-first recipe box")]
struct Cli {
    /// Log debug output to stderr (overrides RECIPEBOX_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recipes, optionally filtered by type and title search
    List {
        /// Only show recipes of this type
        #[arg(short = 't', long = "type")]
        recipe_type: Option<String>,
        /// Case-insensitive title search
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactively filter the recipe list from stdin
    Browse {
        /// Print each result set as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Show one recipe
    Show {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a recipe
    Add {
        /// Recipe title
        title: String,
        /// Recipe type (default: first available type)
        #[arg(short = 't', long = "type")]
        recipe_type: Option<String>,
        /// Ingredients text
        #[arg(short, long, default_value = "")]
        ingredients: String,
        /// Steps text
        #[arg(long, default_value = "")]
        steps: String,
        /// Path to an image file
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a recipe; fields not given keep their current value
    Edit {
        /// Recipe ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New recipe type
        #[arg(short = 't', long = "type")]
        recipe_type: Option<String>,
        /// New ingredients text
        #[arg(short, long)]
        ingredients: Option<String>,
        /// New steps text
        #[arg(long)]
        steps: Option<String>,
        /// Replace the image with this file
        #[arg(long, value_name = "PATH", conflicts_with = "clear_image")]
        image: Option<PathBuf>,
        /// Remove the image
        #[arg(long)]
        clear_image: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe by ID
    Delete {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the available recipe types
    Types {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    debug!(
        db = %config.db_path.display(),
        debounce = ?config.debounce,
        "opening recipe store"
    );
    let store: Arc<dyn RecipeStore> = Arc::new(
        SqliteStore::open(&config.db_path)
            .with_context(|| format!("Failed to open {}", config.db_path.display()))?,
    );
    let seeded = seed_defaults(store.as_ref())
        .await
        .context("Failed to seed default recipes")?;
    debug!(seeded, "store ready");

    let repo: Arc<dyn RecipeRepository> = Arc::new(StoreRepository::new(store));
    let types = config.recipe_type_source();

    match cli.command {
        Commands::List {
            recipe_type,
            search,
            json,
        } => {
            let coordinator = QueryCoordinator::spawn(repo, config.query_config());
            cmd_list(&coordinator, recipe_type, search, json).await
        }
        Commands::Browse { json } => {
            let coordinator = QueryCoordinator::spawn(Arc::clone(&repo), config.query_config());
            let svc = RecipeService::new(repo, types).with_refresh(coordinator.refresh_trigger());
            cmd_browse(&coordinator, &svc, json).await
        }
        Commands::Show { id, json } => {
            cmd_recipe_show(&RecipeService::new(repo, types), &id, json).await
        }
        Commands::Add {
            title,
            recipe_type,
            ingredients,
            steps,
            image,
            json,
        } => {
            let args = AddArgs {
                title,
                recipe_type,
                ingredients,
                steps,
                image,
            };
            cmd_recipe_add(&RecipeService::new(repo, types), args, json).await
        }
        Commands::Edit {
            id,
            title,
            recipe_type,
            ingredients,
            steps,
            image,
            clear_image,
            json,
        } => {
            let args = EditArgs {
                title,
                recipe_type,
                ingredients,
                steps,
                image,
                clear_image,
            };
            cmd_recipe_edit(&RecipeService::new(repo, types), &id, args, json).await
        }
        Commands::Delete { id, json } => {
            cmd_recipe_delete(&RecipeService::new(repo, types), &id, json).await
        }
        Commands::Types { json } => cmd_types(&RecipeService::new(repo, types), json),
    }
}
