//! # API Facade
//!
//! [`RecipeApi`] is the one place that talks to both the data source and the
//! shared store. UIs go through it; the store itself never performs I/O.
//!
//! ## Role
//!
//! - Runs the freshness gate before listing.
//! - Seeds or reconciles the collection from the basic list.
//! - Owns the detail loader's cancellation token and replaces it on every
//!   load, so starting a new load aborts the previous one.
//! - Mirrors source-side writes (create, update, delete) into the store.
//!
//! ## Errors
//!
//! Transport failures come back as `Err` after being logged. Cancellation
//! of the detail loader is not an error; it shows up in the returned
//! [`LoadReport`].
//!
//! ## Generic Over RecipeSource
//!
//! `RecipeApi<S: RecipeSource>`:
//! - Production: `RecipeApi<DirSource>`
//! - Testing: `RecipeApi<MemSource>`
//!
//! All methods take `&self`, so two loads may overlap on the same task. The
//! store is borrowed only between awaits.

use crate::config::CacheConfig;
use crate::error::{MealError, Result};
use crate::loader::{BatchProgress, DetailLoader, LoadReport};
use crate::model::{Category, Recipe};
use crate::source::{fetch_detail, ListParams, RecipeSource};
use crate::store::SharedStore;
use std::cell::RefCell;
use tokio_util::sync::CancellationToken;

pub struct RecipeApi<S: RecipeSource> {
    source: S,
    store: SharedStore,
    config: CacheConfig,
    loading: RefCell<CancellationToken>,
}

impl<S: RecipeSource> RecipeApi<S> {
    pub fn new(source: S, store: SharedStore, config: CacheConfig) -> Self {
        Self {
            source,
            store,
            config,
            loading: RefCell::new(CancellationToken::new()),
        }
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub async fn load_recipes(&self, force: bool) -> Result<LoadReport> {
        self.load_recipes_with_progress(force, |_| {}).await
    }

    /// List, seed the collection, then load details in batches.
    ///
    /// Served from cache (no source calls at all) while the freshness gate
    /// holds, unless `force` is set.
    pub async fn load_recipes_with_progress<F>(&self, force: bool, on_batch: F) -> Result<LoadReport>
    where
        F: FnMut(&BatchProgress),
    {
        if !force && self.store.borrow().has_recipes() {
            tracing::debug!("recipe list served from cache");
            return Ok(LoadReport::cached());
        }

        let params = ListParams::first_page(self.config.page_size);
        let page = self.source.list_basic(&params).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to list recipes");
            e
        })?;
        tracing::debug!(count = page.items.len(), total = page.total, "listed recipes");

        let pending = {
            let mut store = self.store.borrow_mut();
            if force || store.collection().is_empty() {
                store.set_basic_recipes(page.items);
            } else {
                store.refresh_basic_recipes(page.items);
            }
            store.collection().basic_recipes()
        };

        let token = self.replace_token();
        let report = DetailLoader::new(&self.source, self.store.clone())
            .batch_size(self.config.batch_size)
            .run_with_progress(&pending, &token, on_batch)
            .await;
        Ok(report)
    }

    /// Full detail for one recipe, focused as the current recipe.
    ///
    /// A cached detailed record is served as is. A cached basic record is
    /// fetched through its slug or id. Anything else is tried as an id, then
    /// as a slug.
    pub async fn load_recipe(&self, id_or_slug: &str) -> Result<Recipe> {
        let known = self.store.borrow().find(id_or_slug).cloned();
        if let Some(recipe) = known.as_ref().filter(|r| r.is_detailed()) {
            self.store
                .borrow_mut()
                .set_current_recipe(Some(recipe.clone()));
            return Ok(recipe.clone());
        }

        let token = CancellationToken::new();
        let fetched = match &known {
            Some(basic) => fetch_detail(&self.source, basic, &token).await,
            None => match self.source.get_by_id(id_or_slug, &token).await {
                Err(MealError::RecipeNotFound(_)) => {
                    self.source.get_by_slug(id_or_slug, &token).await
                }
                other => other,
            },
        }
        .map_err(|e| {
            tracing::warn!(recipe = id_or_slug, error = %e, "failed to load recipe");
            e
        })?;

        let mut store = self.store.borrow_mut();
        let stored = store.add_recipe(fetched);
        store.set_current_recipe(Some(stored.clone()));
        Ok(stored)
    }

    pub async fn load_categories(&self) -> Result<Vec<Category>> {
        let categories = self.source.list_categories().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to list categories");
            e
        })?;
        self.store.borrow_mut().set_categories(categories.clone());
        Ok(categories)
    }

    /// Fetches a category's recipes and caches them under it.
    pub async fn load_category_recipes(&self, category_id: &str) -> Result<Vec<Recipe>> {
        let page = self
            .source
            .list_by_category(category_id)
            .await
            .map_err(|e| {
                tracing::warn!(category = category_id, error = %e, "failed to list category");
                e
            })?;
        let mut store = self.store.borrow_mut();
        store.update_recipes_for_category(category_id, page.items);
        Ok(store.get_recipes_by_category(category_id))
    }

    pub async fn create_recipe(&self, payload: &Recipe) -> Result<Recipe> {
        let created = self.source.create(payload).await?;
        Ok(self.store.borrow_mut().add_recipe(created))
    }

    pub async fn save_recipe(&self, id: &str, payload: &Recipe) -> Result<Recipe> {
        let saved = self.source.update(id, payload).await?;
        Ok(self.store.borrow_mut().add_recipe(saved))
    }

    pub async fn delete_recipe(&self, id: &str) -> Result<()> {
        self.source.delete(id).await?;
        self.store.borrow_mut().remove_recipe(id);
        Ok(())
    }

    /// Stops the running detail load, if any. Already merged batches stay.
    pub fn cancel_loading(&self) {
        self.loading.borrow().cancel();
    }

    /// Cancels the previous loader token and installs a fresh one.
    fn replace_token(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        let previous = self.loading.replace(fresh.clone());
        previous.cancel();
        fresh
    }
}
