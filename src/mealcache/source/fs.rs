use super::{slugify, ListParams, Page, RecipeSource};
use crate::error::{MealError, Result};
use crate::model::{Category, DetailState, Recipe};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A recipe server export on disk.
///
/// ```text
/// <root>/
///   categories.json        array of {id, name, slug}
///   recipes/<id>.json      one full recipe per file
/// ```
///
/// Files that fail to parse are skipped with a warning rather than failing the
/// whole listing.
///
/// Slug lookups go through a slug to id map built from the last full scan.
/// Writes through this source drop the map; a miss rescans once so files
/// added behind our back are still found.
pub struct DirSource {
    root: PathBuf,
    slugs: RefCell<Option<HashMap<String, String>>>,
    scans: Cell<usize>,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            slugs: RefCell::new(None),
            scans: Cell::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn recipes_dir(&self) -> PathBuf {
        self.root.join("recipes")
    }

    fn recipe_path(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(MealError::Source(format!("Invalid recipe id: {:?}", id)));
        }
        Ok(self.recipes_dir().join(format!("{}.json", id)))
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    fn read_recipe(&self, path: &Path) -> Result<Recipe> {
        let content = fs::read_to_string(path)?;
        let mut recipe: Recipe = serde_json::from_str(&content)?;
        recipe.mark(DetailState::Basic);
        Ok(recipe)
    }

    /// Every readable recipe, sorted by name then id.
    fn load_all(&self) -> Result<Vec<Recipe>> {
        let dir = self.recipes_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut recipes = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_recipe(&path) {
                Ok(recipe) => recipes.push(recipe),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable recipe"),
            }
        }
        recipes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        self.scans.set(self.scans.get() + 1);
        let slugs = recipes
            .iter()
            .filter_map(|r| Some((r.slug.clone()?, r.id.clone())))
            .collect();
        *self.slugs.borrow_mut() = Some(slugs);
        Ok(recipes)
    }

    fn invalidate_slugs(&self) {
        self.slugs.borrow_mut().take();
    }

    fn cached_slug(&self, slug: &str) -> Option<String> {
        self.slugs.borrow().as_ref()?.get(slug).cloned()
    }

    fn id_for_slug(&self, slug: &str) -> Result<String> {
        if let Some(id) = self.cached_slug(slug) {
            return Ok(id);
        }
        self.load_all()?;
        self.cached_slug(slug)
            .ok_or_else(|| MealError::RecipeNotFound(slug.to_string()))
    }

    fn write_recipe(&self, recipe: &Recipe) -> Result<()> {
        let path = self.recipe_path(&recipe.id)?;
        self.ensure_dir(&self.recipes_dir())?;

        let mut stored = recipe.clone();
        stored.mark(DetailState::Basic);
        let content = serde_json::to_string_pretty(&stored)?;

        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn detail(&self, id: &str, cancel: &CancellationToken) -> Result<Recipe> {
        if cancel.is_cancelled() {
            return Err(MealError::Cancelled);
        }
        let path = self.recipe_path(id)?;
        if !path.exists() {
            return Err(MealError::RecipeNotFound(id.to_string()));
        }
        self.read_recipe(&path)
    }
}

#[async_trait(?Send)]
impl RecipeSource for DirSource {
    async fn list_basic(&self, params: &ListParams) -> Result<Page<Recipe>> {
        let all = self
            .load_all()?
            .into_iter()
            .filter(|r| params.search.as_deref().map_or(true, |term| r.matches(term)))
            .map(|r| r.to_basic())
            .collect();
        Ok(Page::paginate(all, params))
    }

    async fn get_by_id(&self, id: &str, cancel: &CancellationToken) -> Result<Recipe> {
        self.detail(id, cancel)
    }

    async fn get_by_slug(&self, slug: &str, cancel: &CancellationToken) -> Result<Recipe> {
        if cancel.is_cancelled() {
            return Err(MealError::Cancelled);
        }
        let id = self.id_for_slug(slug)?;
        match self.detail(&id, cancel) {
            // Stale map entry: the file went away since the last scan
            Err(MealError::RecipeNotFound(_)) => {
                self.invalidate_slugs();
                Err(MealError::RecipeNotFound(slug.to_string()))
            }
            other => other,
        }
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let path = self.root.join("categories.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        let categories: Option<Vec<Category>> = serde_json::from_str(&content)?;
        Ok(categories.unwrap_or_default())
    }

    async fn list_by_category(&self, category_id: &str) -> Result<Page<Recipe>> {
        let items = self
            .load_all()?
            .into_iter()
            .filter(|r| r.has_category(category_id))
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
        self.write_recipe(&recipe)?;
        self.invalidate_slugs();
        Ok(recipe)
    }

    async fn update(&self, id: &str, payload: &Recipe) -> Result<Recipe> {
        if !self.recipe_path(id)?.exists() {
            return Err(MealError::RecipeNotFound(id.to_string()));
        }
        let mut recipe = payload.clone();
        recipe.id = id.to_string();
        self.write_recipe(&recipe)?;
        self.invalidate_slugs();
        Ok(recipe)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.recipe_path(id)?;
        if !path.exists() {
            return Err(MealError::RecipeNotFound(id.to_string()));
        }
        fs::remove_file(path)?;
        self.invalidate_slugs();
        Ok(())
    }
}
