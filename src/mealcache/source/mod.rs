//! # Recipe Data Source
//!
//! The cache never talks to a server directly. Everything it knows arrives
//! through [`RecipeSource`], an async capability modelled on the recipe
//! server's REST surface: a paginated basic list, detail by id or slug,
//! categories, recipes by category, and create/update/delete.
//!
//! ## Implementations
//!
//! - [`fs::DirSource`]: reads and writes a directory export of the server
//!   (`recipes/<id>.json`, `categories.json`).
//! - [`memory::MemSource`]: in-memory double for tests, with call recording,
//!   per-id failure injection, and fetches that hang until cancelled.
//!
//! ## Cancellation
//!
//! Detail fetches take a [`CancellationToken`]. Implementations should
//! return [`MealError::Cancelled`](crate::error::MealError::Cancelled) when
//! the token fires before or during the request. The loader also races every
//! fetch against the token, so a source that ignores it still gets cut off.

use crate::error::Result;
use crate::model::{Category, Recipe};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub mod fs;
pub mod memory;

/// Query for the paginated list endpoint. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: usize,
    pub per_page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl ListParams {
    pub fn first_page(per_page: usize) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            search: None,
        }
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::first_page(50)
    }
}

/// One page of results, shaped like the server's paginated responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cuts `all` down to the page `params` asks for.
    pub fn paginate(all: Vec<T>, params: &ListParams) -> Self {
        let per_page = params.per_page.max(1);
        let page = params.page.max(1);
        let total = all.len();
        let total_pages = total.div_ceil(per_page);
        let items = all
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
        }
    }

    /// A single page holding everything.
    pub fn all(items: Vec<T>) -> Self {
        let total = items.len();
        Self {
            items,
            page: 1,
            per_page: total.max(1),
            total,
            total_pages: usize::from(total > 0),
        }
    }
}

#[async_trait(?Send)]
pub trait RecipeSource {
    /// Paginated list with basic fields only.
    async fn list_basic(&self, params: &ListParams) -> Result<Page<Recipe>>;

    /// Full detail by id.
    async fn get_by_id(&self, id: &str, cancel: &CancellationToken) -> Result<Recipe>;

    /// Full detail by slug.
    async fn get_by_slug(&self, slug: &str, cancel: &CancellationToken) -> Result<Recipe>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn list_by_category(&self, category_id: &str) -> Result<Page<Recipe>>;

    async fn create(&self, payload: &Recipe) -> Result<Recipe>;

    async fn update(&self, id: &str, payload: &Recipe) -> Result<Recipe>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Fetch full detail for `recipe`, by slug when it has one, else by id.
pub async fn fetch_detail<S: RecipeSource + ?Sized>(
    source: &S,
    recipe: &Recipe,
    cancel: &CancellationToken,
) -> Result<Recipe> {
    match recipe.slug.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => source.get_by_slug(slug, cancel).await,
        None => source.get_by_id(&recipe.id, cancel).await,
    }
}

/// Lowercase, ASCII alphanumerics, single hyphens between words.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
