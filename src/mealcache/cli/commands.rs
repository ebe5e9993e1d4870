//! # CLI Layer
//!
//! One UI client for mealcache, not the application itself. This is the only
//! place that:
//! - Knows about stdout and stderr
//! - Installs the log subscriber
//! - Decides where the source export and state directory live
//!
//! ## Structure
//!
//! - `run()`: parse, set up logging and context, dispatch
//! - `init_context()`: builds the `RecipeApi` over a `DirSource` and an
//!   `FsStorage` state directory
//! - `handle_*()`: one per command, call the API then print
//!
//! Each invocation is a fresh process, so the collection starts empty and is
//! refilled from the export. Favorites, the last fetch time, the selected
//! category and config survive in the state directory.

use super::print::{
    format_time_ago, print_categories, print_load_report, print_message, print_recipe,
    print_recipes, MessageLevel,
};
use super::setup::{Cli, Commands};
use clap::Parser;
use colored::Colorize;
use directories::ProjectDirs;
use mealcache::api::RecipeApi;
use mealcache::config::CacheConfig;
use mealcache::error::{MealError, Result};
use mealcache::model::Recipe;
use mealcache::source::fs::DirSource;
use mealcache::storage::fs::FsStorage;
use mealcache::store::RecipeStore;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MEALCACHE_LOG";
const HOME_ENV: &str = "MEALCACHE_HOME";
const SOURCE_ENV: &str = "MEALCACHE_SOURCE";

struct AppContext {
    api: RecipeApi<DirSource>,
    state_dir: PathBuf,
    config: CacheConfig,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ctx = init_context(&cli)?;

    match cli.command {
        Some(Commands::List { force }) => handle_list(&ctx, force).await,
        Some(Commands::Show { recipe }) => handle_show(&ctx, &recipe).await,
        Some(Commands::Favorite { recipe }) => handle_favorite(&ctx, &recipe).await,
        Some(Commands::Favorites) => handle_favorites(&ctx).await,
        Some(Commands::Categories) => handle_categories(&ctx).await,
        Some(Commands::Category { category }) => handle_category(&ctx, &category).await,
        Some(Commands::Search { term }) => handle_search(&ctx, &term).await,
        Some(Commands::Status) => handle_status(&ctx),
        Some(Commands::Config { key, value }) => handle_config(&ctx, key, value),
        None => handle_list(&ctx, false).await,
    }
}

/// `--verbose` wins over `MEALCACHE_LOG`, which wins over the `warn` default.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("mealcache=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let state_dir = match cli.state.clone().or_else(|| env_path(HOME_ENV)) {
        Some(dir) => dir,
        None => ProjectDirs::from("com", "mealcache", "mealcache")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| MealError::Config("Could not determine state dir".into()))?,
    };
    let source_dir = cli
        .source
        .clone()
        .or_else(|| env_path(SOURCE_ENV))
        .unwrap_or_else(|| PathBuf::from("."));

    let config = CacheConfig::load(&state_dir).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "unreadable config, using defaults");
        CacheConfig::default()
    });
    tracing::debug!(state = %state_dir.display(), source = %source_dir.display(), "starting");

    let storage = Rc::new(FsStorage::new(state_dir.clone()));
    let store = RecipeStore::new(storage, &config).into_shared();
    let api = RecipeApi::new(DirSource::new(source_dir), store, config.clone());

    Ok(AppContext {
        api,
        state_dir,
        config,
    })
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

async fn handle_list(ctx: &AppContext, force: bool) -> Result<()> {
    let report = ctx
        .api
        .load_recipes_with_progress(force, |progress| {
            tracing::debug!(
                batch = progress.batch,
                total = progress.total_batches,
                loaded = progress.loaded,
                "details batch merged"
            );
        })
        .await?;

    let store = ctx.api.store();
    let store = store.borrow();
    print_recipes(store.recipes(), |id| store.is_favorite(id));
    print_load_report(&report);
    Ok(())
}

async fn handle_show(ctx: &AppContext, id_or_slug: &str) -> Result<()> {
    let recipe = ctx.api.load_recipe(id_or_slug).await?;
    let favorite = ctx.api.store().borrow().is_favorite(&recipe.id);
    print_recipe(&recipe, favorite);
    Ok(())
}

async fn handle_favorite(ctx: &AppContext, id_or_slug: &str) -> Result<()> {
    let recipe = ctx.api.load_recipe(id_or_slug).await?;
    let now_favorite = ctx.api.store().borrow_mut().toggle_favorite(&recipe.id);
    if now_favorite {
        print_message(
            MessageLevel::Success,
            &format!("Added {} to favorites", recipe.name),
        );
    } else {
        print_message(
            MessageLevel::Success,
            &format!("Removed {} from favorites", recipe.name),
        );
    }
    Ok(())
}

async fn handle_favorites(ctx: &AppContext) -> Result<()> {
    let report = ctx.api.load_recipes(false).await?;

    let store = ctx.api.store();
    let store = store.borrow();
    let favorites: Vec<Recipe> = store.favorite_recipes().into_iter().cloned().collect();
    print_recipes(&favorites, |_| true);

    let missing = store.favorite_ids().len().saturating_sub(favorites.len());
    if missing > 0 {
        print_message(
            MessageLevel::Info,
            &format!("{} favorite(s) are not in this export.", missing),
        );
    }
    print_load_report(&report);
    Ok(())
}

async fn handle_categories(ctx: &AppContext) -> Result<()> {
    let report = ctx.api.load_recipes(false).await?;
    print_categories(&ctx.api.store().borrow().used_categories());
    print_load_report(&report);
    Ok(())
}

async fn handle_category(ctx: &AppContext, id_or_slug: &str) -> Result<()> {
    let categories = ctx.api.load_categories().await?;
    let known = categories
        .iter()
        .find(|c| c.id == id_or_slug || c.slug == id_or_slug);
    let category_id = known.map_or(id_or_slug, |c| c.id.as_str()).to_string();

    let recipes = ctx.api.load_category_recipes(&category_id).await?;
    if recipes.is_empty() && known.is_none() {
        return Err(MealError::CategoryNotFound(id_or_slug.to_string()));
    }

    let store = ctx.api.store();
    store.borrow_mut().select_category(Some(category_id));
    let store = store.borrow();
    print_recipes(&recipes, |id| store.is_favorite(id));
    Ok(())
}

async fn handle_search(ctx: &AppContext, term: &str) -> Result<()> {
    let report = ctx.api.load_recipes(false).await?;

    let store = ctx.api.store();
    let store = store.borrow();
    let found: Vec<Recipe> = store.search(term).into_iter().cloned().collect();
    print_recipes(&found, |id| store.is_favorite(id));
    print_load_report(&report);
    Ok(())
}

fn handle_status(ctx: &AppContext) -> Result<()> {
    let store = ctx.api.store();
    let store = store.borrow();
    let now = store.now();

    let fetched = match store.last_fetched() {
        Some(at) => {
            let freshness = if now - at < store.cache_duration() {
                "fresh".green()
            } else {
                "stale".yellow()
            };
            format!("{} ({})", format_time_ago(at, now), freshness)
        }
        None => "never".to_string(),
    };

    println!("State dir:      {}", ctx.state_dir.display());
    println!("Source:         {}", ctx.api.source().root().display());
    println!("Last fetched:   {}", fetched);
    println!("Favorites:      {}", store.favorite_ids().len());
    println!(
        "Category:       {}",
        store.selected_category().unwrap_or("none")
    );
    println!(
        "Cache window:   {} minutes, batches of {}",
        ctx.config.cache_duration_secs / 60,
        ctx.config.batch_size
    );
    Ok(())
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let mut config = ctx.config.clone();
    match (key.as_deref(), value) {
        (None, _) => {
            println!("cache-duration = {}", config.cache_duration_secs);
            println!("batch-size = {}", config.batch_size);
            println!("page-size = {}", config.page_size);
            return Ok(());
        }
        (Some("cache-duration"), None) => println!("{}", config.cache_duration_secs),
        (Some("batch-size"), None) => println!("{}", config.batch_size),
        (Some("page-size"), None) => println!("{}", config.page_size),
        (Some("cache-duration"), Some(v)) => {
            let secs = parse_number(&v)?;
            config.set_cache_duration(std::time::Duration::from_secs(secs));
        }
        (Some("batch-size"), Some(v)) => config.set_batch_size(parse_number(&v)? as usize),
        (Some("page-size"), Some(v)) => config.page_size = (parse_number(&v)? as usize).max(1),
        (Some(other), _) => {
            return Err(MealError::Config(format!("Unknown config key: {}", other)));
        }
    }

    if config != ctx.config {
        config.save(&ctx.state_dir)?;
        print_message(MessageLevel::Success, "Configuration saved.");
    }
    Ok(())
}

fn parse_number(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| MealError::Config(format!("Not a number: {}", value)))
}
