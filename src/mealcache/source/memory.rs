use super::{slugify, ListParams, Page, RecipeSource};
use crate::error::{MealError, Result};
use crate::model::{Category, DetailState, Recipe};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// In-memory recipe source for tests.
///
/// Holds full records and answers list calls with their basic view. Every
/// detail fetch is recorded by recipe id in call order. Ids can be set to
/// fail, or to hang until the caller's token is cancelled.
#[derive(Default)]
pub struct MemSource {
    recipes: RefCell<IndexMap<String, Recipe>>,
    categories: RefCell<Vec<Category>>,
    failing: RefCell<HashSet<String>>,
    hanging: RefCell<HashSet<String>>,
    detail_calls: RefCell<Vec<String>>,
    list_calls: Cell<usize>,
    yield_on_fetch: Cell<bool>,
}

impl MemSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        let source = Self::new();
        for recipe in recipes {
            source.insert(recipe);
        }
        source
    }

    pub fn insert(&self, recipe: Recipe) {
        self.recipes.borrow_mut().insert(recipe.id.clone(), recipe);
    }

    pub fn set_categories(&self, categories: Vec<Category>) {
        *self.categories.borrow_mut() = categories;
    }

    /// Detail fetches for `id` fail with a source error.
    pub fn fail(&self, id: &str) {
        self.failing.borrow_mut().insert(id.to_string());
    }

    pub fn release_failure(&self, id: &str) {
        self.failing.borrow_mut().remove(id);
    }

    /// Detail fetches for `id` never complete on their own.
    pub fn hang(&self, id: &str) {
        self.hanging.borrow_mut().insert(id.to_string());
    }

    /// Lets later fetches for `id` complete normally. Fetches already hanging
    /// still wait for their token.
    pub fn release(&self, id: &str) {
        self.hanging.borrow_mut().remove(id);
    }

    /// Yield to the runtime inside each detail fetch so batch members interleave.
    pub fn yield_on_fetch(&self, enabled: bool) {
        self.yield_on_fetch.set(enabled);
    }

    /// Ids of every detail fetch so far, in call order.
    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.borrow().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    async fn detail(&self, id: String, cancel: &CancellationToken) -> Result<Recipe> {
        if cancel.is_cancelled() {
            return Err(MealError::Cancelled);
        }
        self.detail_calls.borrow_mut().push(id.clone());

        if self.yield_on_fetch.get() {
            tokio::task::yield_now().await;
        }
        if self.hanging.borrow().contains(&id) {
            cancel.cancelled().await;
            return Err(MealError::Cancelled);
        }
        if self.failing.borrow().contains(&id) {
            return Err(MealError::Source(format!("Simulated failure for {}", id)));
        }

        let mut recipe = self
            .recipes
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(MealError::RecipeNotFound(id))?;
        // The server has no notion of our detail flag
        recipe.mark(DetailState::Basic);
        Ok(recipe)
    }
}

#[async_trait(?Send)]
impl RecipeSource for MemSource {
    async fn list_basic(&self, params: &ListParams) -> Result<Page<Recipe>> {
        self.list_calls.set(self.list_calls.get() + 1);
        let all: Vec<Recipe> = self
            .recipes
            .borrow()
            .values()
            .filter(|r| params.search.as_deref().map_or(true, |term| r.matches(term)))
            .map(Recipe::to_basic)
            .collect();
        Ok(Page::paginate(all, params))
    }

    async fn get_by_id(&self, id: &str, cancel: &CancellationToken) -> Result<Recipe> {
        self.detail(id.to_string(), cancel).await
    }

    async fn get_by_slug(&self, slug: &str, cancel: &CancellationToken) -> Result<Recipe> {
        let id = self
            .recipes
            .borrow()
            .values()
            .find(|r| r.slug.as_deref() == Some(slug))
            .map(|r| r.id.clone())
            .ok_or_else(|| MealError::RecipeNotFound(slug.to_string()))?;
        self.detail(id, cancel).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.borrow().clone())
    }

    async fn list_by_category(&self, category_id: &str) -> Result<Page<Recipe>> {
        let items: Vec<Recipe> = self
            .recipes
            .borrow()
            .values()
            .filter(|r| r.has_category(category_id))
            .cloned()
            .collect();
        Ok(Page::all(items))
    }

    async fn create(&self, payload: &Recipe) -> Result<Recipe> {
        let mut recipe = payload.clone();
        if recipe.id.is_empty() {
            recipe.id = Uuid::new_v4().to_string();
        }
        if recipe.slug.is_none() {
            recipe.slug = Some(slugify(&recipe.name));
        }
        self.insert(recipe.clone());
        Ok(recipe)
    }

    async fn update(&self, id: &str, payload: &Recipe) -> Result<Recipe> {
        let mut recipes = self.recipes.borrow_mut();
        let slot = recipes
            .get_mut(id)
            .ok_or_else(|| MealError::RecipeNotFound(id.to_string()))?;
        let mut recipe = payload.clone();
        recipe.id = id.to_string();
        *slot = recipe.clone();
        Ok(recipe)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.recipes
            .borrow_mut()
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| MealError::RecipeNotFound(id.to_string()))
    }
}
