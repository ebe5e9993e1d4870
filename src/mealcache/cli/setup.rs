use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "mealcache", bin_name = "mealcache", version = get_version())]
#[command(about = "Browse a recipe export through a local, batch-loading cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Recipe export directory (defaults to $MEALCACHE_SOURCE, then the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// State directory for favorites, session and config (defaults to $MEALCACHE_HOME)
    #[arg(long, global = true, value_name = "DIR")]
    pub state: Option<PathBuf>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recipes, loading details in batches
    #[command(alias = "ls")]
    List {
        /// Ignore the freshness window and reload everything
        #[arg(short, long)]
        force: bool,
    },

    /// Show one recipe in full
    #[command(alias = "v")]
    Show {
        /// Recipe id or slug
        recipe: String,
    },

    /// Toggle a recipe's favorite mark
    #[command(alias = "fav")]
    Favorite {
        /// Recipe id or slug
        recipe: String,
    },

    /// List favorite recipes
    Favorites,

    /// List categories used by the loaded recipes
    Categories,

    /// List the recipes in one category
    Category {
        /// Category id or slug
        category: String,
    },

    /// Search recipe names, slugs and descriptions
    Search { term: String },

    /// Show cache state
    Status,

    /// Get or set configuration
    Config {
        /// Configuration key (cache-duration, batch-size, page-size)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
