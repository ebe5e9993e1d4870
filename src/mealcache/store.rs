//! # Recipe Store
//!
//! The cache proper: one [`RecipeCollection`], its [`Favorites`], the
//! [`CategoryRegistry`] and the focused "current" recipe, behind a single
//! set of operations that keeps them consistent with each other.
//!
//! ## Sharing
//!
//! There is one store per session, handed to every collaborator as a
//! [`SharedStore`] (`Rc<RefCell<_>>`). Everything runs on one thread; async
//! callers (the detail loader, the API facade) take a borrow only between
//! awaits and never hold it across one, so every operation here is atomic
//! with respect to the others.
//!
//! ## Failure policy
//!
//! Nothing in here returns an error. A missing record yields `None` or
//! `false`, an empty list yields an empty result, and persistence problems
//! are logged by the component that hit them.

use crate::categories::{self, CategoryRegistry};
use crate::clock::{Clock, SystemClock};
use crate::collection::RecipeCollection;
use crate::config::CacheConfig;
use crate::favorites::Favorites;
use crate::model::{Category, CategoryRef, DetailState, Recipe, RecipePatch};
use crate::session::SessionState;
use crate::storage::memory::MemStorage;
use crate::storage::StorageBackend;
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::rc::Rc;

pub type SharedStore = Rc<RefCell<RecipeStore>>;

pub struct RecipeStore {
    collection: RecipeCollection,
    favorites: Favorites,
    categories: CategoryRegistry,
    current: Option<Recipe>,
    clock: Rc<dyn Clock>,
    storage: Rc<dyn StorageBackend>,
    cache_duration: Duration,
}

impl RecipeStore {
    pub fn new(storage: Rc<dyn StorageBackend>, config: &CacheConfig) -> Self {
        Self::with_clock(storage, config, Rc::new(SystemClock))
    }

    /// Restores favorites and session state from `storage`.
    pub fn with_clock(
        storage: Rc<dyn StorageBackend>,
        config: &CacheConfig,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let session = SessionState::load(storage.as_ref());
        let mut collection = RecipeCollection::new();
        collection.restore_last_fetched(session.last_fetched);
        let mut categories = CategoryRegistry::new();
        categories.select(session.selected_category);

        Self {
            collection,
            favorites: Favorites::load(storage.clone()),
            categories,
            current: None,
            clock,
            storage,
            cache_duration: config.cache_duration(),
        }
    }

    /// A throwaway store with in-memory persistence and default config.
    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemStorage::new()), &CacheConfig::default())
    }

    pub fn into_shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    // --- Queries ---

    pub fn recipes(&self) -> &[Recipe] {
        self.collection.recipes()
    }

    pub fn collection(&self) -> &RecipeCollection {
        &self.collection
    }

    pub fn get_recipe_by_id(&self, id: &str) -> Option<&Recipe> {
        self.collection.get(id)
    }

    /// Lookup by id first, then by slug.
    pub fn find(&self, id_or_slug: &str) -> Option<&Recipe> {
        self.collection.get(id_or_slug).or_else(|| {
            self.collection
                .recipes()
                .iter()
                .find(|r| r.slug.as_deref() == Some(id_or_slug))
        })
    }

    pub fn search(&self, term: &str) -> Vec<&Recipe> {
        self.collection
            .recipes()
            .iter()
            .filter(|r| r.matches(term))
            .collect()
    }

    pub fn details_loading(&self) -> bool {
        self.collection.details_loading()
    }

    pub fn last_fetched(&self) -> Option<DateTime<Utc>> {
        self.collection.last_fetched()
    }

    pub fn cache_duration(&self) -> Duration {
        self.cache_duration
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Freshness gate: non-empty and fetched less than `cache_duration` ago.
    /// Evaluated against the clock on every call.
    pub fn has_recipes(&self) -> bool {
        if self.collection.is_empty() {
            return false;
        }
        self.collection
            .last_fetched()
            .is_some_and(|at| self.clock.now() - at < self.cache_duration)
    }

    pub fn current_recipe(&self) -> Option<&Recipe> {
        self.current.as_ref()
    }

    pub fn set_current_recipe(&mut self, recipe: Option<Recipe>) {
        self.current = recipe;
    }

    // --- Collection mutations ---

    pub fn set_basic_recipes(&mut self, list: Vec<Recipe>) {
        self.collection.set_basic(list, self.clock.now());
        self.save_session();
    }

    pub fn refresh_basic_recipes(&mut self, list: Vec<Recipe>) {
        self.collection.refresh_basic(list, self.clock.now());
        self.save_session();
    }

    pub fn set_recipes(&mut self, list: Vec<Recipe>) {
        self.collection.set_detailed(list, self.clock.now());
        self.save_session();
    }

    /// Merges a batch of detailed records. Returns how many matched.
    pub fn update_recipes(&mut self, list: Vec<Recipe>) -> usize {
        let ids: Vec<String> = list.iter().map(|r| r.id.clone()).collect();
        let merged = self.collection.update_many(list);
        for id in &ids {
            self.sync_derived(id);
        }
        merged
    }

    /// Field-level merge into the collection entry and the current recipe.
    /// Returns false when neither holds `id`.
    pub fn update_recipe(&mut self, id: &str, patch: RecipePatch) -> bool {
        let mut touched = false;
        if let Some(current) = self.current.as_mut().filter(|c| c.id == id) {
            current.apply(patch.clone());
            touched = true;
        }
        if self.collection.merge(id, patch).is_some() {
            if let Some(recipe) = self.collection.get(id) {
                self.categories.sync_recipe(recipe);
            }
            touched = true;
        }
        touched
    }

    /// Inserts a detailed record, merging if the id is already held.
    /// Returns the stored result of the merge.
    pub fn add_recipe(&mut self, recipe: Recipe) -> Recipe {
        let stored = self.collection.upsert(recipe).clone();
        self.sync_derived(&stored.id);
        stored
    }

    /// Deletes the record everywhere: collection, index, favorites, category
    /// caches, and the current recipe slot.
    pub fn remove_recipe(&mut self, id: &str) -> Option<Recipe> {
        let removed = self.collection.remove(id);
        if self.favorites.is_favorite(id) {
            self.favorites.remove(id);
        }
        self.categories.purge_recipe(id);
        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.current = None;
        }
        removed
    }

    /// Idempotent: a category already present by id is not added twice.
    pub fn add_category_to_recipe(&mut self, recipe_id: &str, category: CategoryRef) -> bool {
        self.mutate_recipe(recipe_id, |recipe| {
            if recipe.has_category(&category.id) {
                false
            } else {
                recipe.recipe_category.push(category.clone());
                true
            }
        })
    }

    pub fn remove_category_from_recipe(&mut self, recipe_id: &str, category_id: &str) -> bool {
        let changed = self.mutate_recipe(recipe_id, |recipe| {
            let before = recipe.recipe_category.len();
            recipe.recipe_category.retain(|c| c.id != category_id);
            recipe.recipe_category.len() != before
        });
        self.categories.forget(category_id, recipe_id);
        changed
    }

    // --- Categories ---

    pub fn categories(&self) -> &[Category] {
        self.categories.categories()
    }

    pub fn set_categories(&mut self, list: Vec<Category>) {
        self.categories.set_categories(list);
    }

    pub fn add_category(&mut self, category: Category) {
        self.categories.add_category(category);
    }

    pub fn remove_category(&mut self, id: &str) -> Option<Category> {
        let had_selection = self.categories.selected_category().is_some();
        let removed = self.categories.remove_category(id);
        if had_selection && self.categories.selected_category().is_none() {
            self.save_session();
        }
        removed
    }

    /// Caches `recipes` under the category and upserts each into the collection.
    pub fn update_recipes_for_category(&mut self, category_id: &str, recipes: Vec<Recipe>) {
        let recipes: Vec<Recipe> = recipes
            .into_iter()
            .map(|mut recipe| {
                recipe.mark(DetailState::Detailed);
                recipe
            })
            .collect();
        self.categories.cache_recipes(category_id, recipes.clone());
        for recipe in recipes {
            let id = recipe.id.clone();
            self.collection.upsert(recipe);
            self.sync_derived(&id);
        }
    }

    /// Cached list when there is a non-empty one, otherwise a fresh filter of
    /// the collection. The fallback is never cached.
    pub fn get_recipes_by_category(&self, category_id: &str) -> Vec<Recipe> {
        match self.categories.cached(category_id) {
            Some(cached) => cached.to_vec(),
            None => categories::filter_by_category(self.collection.recipes(), category_id),
        }
    }

    /// Derived on every call from the current collection.
    pub fn used_categories(&self) -> Vec<Category> {
        categories::used_categories(self.collection.recipes())
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.categories.selected_category()
    }

    pub fn select_category(&mut self, id: Option<String>) {
        self.categories.select(id);
        self.save_session();
    }

    // --- Favorites ---

    pub fn add_favorite(&mut self, id: &str) -> bool {
        self.favorites.add(id)
    }

    pub fn remove_favorite(&mut self, id: &str) -> bool {
        self.favorites.remove(id)
    }

    pub fn toggle_favorite(&mut self, id: &str) -> bool {
        self.favorites.toggle(id)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.is_favorite(id)
    }

    pub fn favorite_ids(&self) -> Vec<String> {
        self.favorites.ids().map(str::to_string).collect()
    }

    /// Loaded recipes that are favorites, in collection order.
    pub fn favorite_recipes(&self) -> Vec<&Recipe> {
        self.collection
            .recipes()
            .iter()
            .filter(|r| self.favorites.is_favorite(&r.id))
            .collect()
    }

    // --- Internals ---

    fn mutate_recipe(&mut self, id: &str, f: impl Fn(&mut Recipe) -> bool) -> bool {
        let mut changed = false;
        if let Some(current) = self.current.as_mut().filter(|c| c.id == id) {
            changed |= f(current);
        }
        if let Some(did) = self.collection.with_recipe_mut(id, &f) {
            changed |= did;
            if let Some(recipe) = self.collection.get(id) {
                self.categories.sync_recipe(recipe);
            }
        }
        changed
    }

    /// Pushes the collection's copy of `id` into the category caches and the
    /// current recipe slot.
    fn sync_derived(&mut self, id: &str) {
        let Some(recipe) = self.collection.get(id) else {
            return;
        };
        self.categories.sync_recipe(recipe);
        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.current = Some(recipe.clone());
        }
    }

    fn save_session(&self) {
        SessionState {
            last_fetched: self.collection.last_fetched(),
            selected_category: self.categories.selected_category().map(str::to_string),
        }
        .save(self.storage.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{Ingredient, RecipeDetails};
    use crate::storage::memory::MemStorage;

    fn soups() -> CategoryRef {
        CategoryRef::new("c1", "Soups", "soups")
    }

    fn store_with_clock() -> (RecipeStore, ManualClock) {
        let clock = ManualClock::default();
        let store = RecipeStore::with_clock(
            Rc::new(MemStorage::new()),
            &CacheConfig::default(),
            Rc::new(clock.clone()),
        );
        (store, clock)
    }

    fn detailed(id: &str, name: &str) -> Recipe {
        let mut recipe = Recipe::new(id, name);
        recipe.details = RecipeDetails {
            recipe_ingredient: Some(vec![Ingredient::note("water")]),
            ..RecipeDetails::default()
        };
        recipe.mark(DetailState::Detailed);
        recipe
    }

    #[test]
    fn freshness_gate_boundaries() {
        let (mut store, clock) = store_with_clock();
        assert!(!store.has_recipes());

        store.set_basic_recipes(vec![Recipe::new("a", "Soup")]);
        assert!(store.has_recipes());

        clock.advance(Duration::minutes(14));
        assert!(store.has_recipes());

        clock.advance(Duration::minutes(1));
        assert!(!store.has_recipes());
    }

    #[test]
    fn unbounded_cache_duration_stays_fresh() {
        let clock = ManualClock::default();
        let config = CacheConfig {
            cache_duration_secs: u64::MAX,
            ..CacheConfig::default()
        };
        let mut store =
            RecipeStore::with_clock(Rc::new(MemStorage::new()), &config, Rc::new(clock.clone()));
        store.set_basic_recipes(vec![Recipe::new("a", "Soup")]);

        clock.advance(Duration::days(365 * 100));
        assert!(store.has_recipes());
    }

    #[test]
    fn empty_collection_is_never_fresh() {
        let (mut store, _clock) = store_with_clock();
        store.set_basic_recipes(Vec::new());
        assert!(store.last_fetched().is_some());
        assert!(!store.has_recipes());
    }

    #[test]
    fn update_recipe_patches_current_too() {
        let mut store = RecipeStore::in_memory();
        store.set_recipes(vec![detailed("a", "Soup")]);
        store.set_current_recipe(store.get_recipe_by_id("a").cloned());

        assert!(store.update_recipe("a", RecipePatch::default().name("Stew")));

        assert_eq!(store.get_recipe_by_id("a").unwrap().name, "Stew");
        let current = store.current_recipe().unwrap();
        assert_eq!(current.name, "Stew");
        assert!(current.details.recipe_ingredient.is_some());
        assert!(!store.update_recipe("nope", RecipePatch::default()));
    }

    #[test]
    fn update_recipe_reaches_unmerged_current() {
        let mut store = RecipeStore::in_memory();
        store.set_current_recipe(Some(detailed("x", "Fresh")));
        assert!(store.update_recipe("x", RecipePatch::default().description("New")));
        assert_eq!(
            store.current_recipe().unwrap().description.as_deref(),
            Some("New")
        );
        assert!(store.get_recipe_by_id("x").is_none());
    }

    #[test]
    fn add_recipe_merges_existing() {
        let mut store = RecipeStore::in_memory();
        store.set_basic_recipes(vec![Recipe::new("a", "Soup")]);

        store.add_recipe(detailed("a", ""));
        store.add_recipe(detailed("b", "Cake"));

        assert_eq!(store.recipes().len(), 2);
        let a = store.get_recipe_by_id("a").unwrap();
        assert!(a.is_detailed());
        assert_eq!(a.name, "Soup");
        assert!(store.collection().is_consistent());
    }

    #[test]
    fn remove_recipe_cleans_everything() {
        let mut store = RecipeStore::in_memory();
        store.set_recipes(vec![detailed("a", "Soup").with_category(soups()), detailed("b", "Cake")]);
        store.update_recipes_for_category("c1", vec![detailed("a", "Soup").with_category(soups())]);
        store.add_favorite("a");
        store.set_current_recipe(store.get_recipe_by_id("a").cloned());

        let removed = store.remove_recipe("a").unwrap();

        assert_eq!(removed.id, "a");
        assert!(store.get_recipe_by_id("a").is_none());
        assert!(!store.is_favorite("a"));
        assert!(store.current_recipe().is_none());
        assert!(store.get_recipes_by_category("c1").is_empty());
        assert!(store.collection().is_consistent());
    }

    #[test]
    fn remove_unloaded_favorite() {
        let mut store = RecipeStore::in_memory();
        store.add_favorite("ghost");
        assert!(store.remove_recipe("ghost").is_none());
        assert!(!store.is_favorite("ghost"));
    }

    #[test]
    fn category_membership_is_idempotent_and_synced() {
        let mut store = RecipeStore::in_memory();
        store.set_recipes(vec![detailed("a", "Soup")]);
        store.set_current_recipe(store.get_recipe_by_id("a").cloned());

        assert!(store.add_category_to_recipe("a", soups()));
        assert!(!store.add_category_to_recipe("a", soups()));

        assert_eq!(store.get_recipe_by_id("a").unwrap().recipe_category.len(), 1);
        assert_eq!(store.current_recipe().unwrap().recipe_category.len(), 1);

        assert!(store.remove_category_from_recipe("a", "c1"));
        assert!(!store.remove_category_from_recipe("a", "c1"));
        assert!(store.current_recipe().unwrap().recipe_category.is_empty());
        assert!(!store.add_category_to_recipe("missing", soups()));
    }

    #[test]
    fn category_fallback_then_cache() {
        let mut store = RecipeStore::in_memory();
        store.set_basic_recipes(vec![
            Recipe::new("a", "Soup").with_category(soups()),
            Recipe::new("b", "Cake"),
            Recipe::new("c", "Stew").with_category(soups()),
        ]);

        let ids: Vec<_> = store
            .get_recipes_by_category("c1")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);

        // The server only knows about "c" in this category
        store.update_recipes_for_category("c1", vec![detailed("c", "Stew").with_category(soups())]);

        let cached = store.get_recipes_by_category("c1");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, "c");
        assert!(cached[0].is_detailed());
        assert!(store.get_recipe_by_id("c").unwrap().is_detailed());
    }

    #[test]
    fn update_recipes_for_category_inserts_unseen() {
        let mut store = RecipeStore::in_memory();
        store.update_recipes_for_category("c1", vec![Recipe::new("z", "Zucchini")]);
        let z = store.get_recipe_by_id("z").unwrap();
        assert!(z.is_detailed());
        assert!(store.collection().is_consistent());
    }

    #[test]
    fn fallback_reflects_later_changes() {
        let mut store = RecipeStore::in_memory();
        store.set_recipes(vec![detailed("a", "Soup")]);
        assert!(store.get_recipes_by_category("c1").is_empty());

        store.add_category_to_recipe("a", soups());
        assert_eq!(store.get_recipes_by_category("c1").len(), 1);
    }

    #[test]
    fn used_categories_are_derived_on_read() {
        let mut store = RecipeStore::in_memory();
        store.set_recipes(vec![detailed("a", "Soup").with_category(soups())]);
        assert_eq!(store.used_categories()[0].count, Some(1));

        store.add_recipe(detailed("b", "Stew").with_category(soups()));
        assert_eq!(store.used_categories()[0].count, Some(2));
    }

    #[test]
    fn remove_selected_category_clears_selection() {
        let mut store = RecipeStore::in_memory();
        store.set_categories(vec![Category::new("c1", "Soups", "soups")]);
        store.select_category(Some("c1".into()));

        store.remove_category("c1");
        assert_eq!(store.selected_category(), None);
        assert!(store.categories().is_empty());
    }

    #[test]
    fn favorite_recipes_follow_collection_order() {
        let mut store = RecipeStore::in_memory();
        store.set_recipes(vec![detailed("a", "A"), detailed("b", "B"), detailed("c", "C")]);
        store.add_favorite("c");
        store.add_favorite("a");
        store.add_favorite("not-loaded");

        let names: Vec<_> = store.favorite_recipes().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(store.favorite_ids().len(), 3);
    }

    #[test]
    fn session_survives_restart() {
        let storage: Rc<dyn StorageBackend> = Rc::new(MemStorage::new());
        let config = CacheConfig::default();
        let fetched_at = {
            let mut store = RecipeStore::new(storage.clone(), &config);
            store.set_basic_recipes(vec![Recipe::new("a", "Soup")]);
            store.select_category(Some("c1".into()));
            store.toggle_favorite("a");
            store.last_fetched()
        };

        let store = RecipeStore::new(storage, &config);
        assert_eq!(store.last_fetched(), fetched_at);
        assert_eq!(store.selected_category(), Some("c1"));
        assert!(store.is_favorite("a"));
        // Timestamps alone don't make an empty cache fresh
        assert!(!store.has_recipes());
    }

    #[test]
    fn find_by_slug() {
        let mut store = RecipeStore::in_memory();
        store.set_basic_recipes(vec![Recipe::new("a", "Soup").with_slug("tomato-soup")]);
        assert_eq!(store.find("tomato-soup").unwrap().id, "a");
        assert_eq!(store.find("a").unwrap().id, "a");
        assert!(store.find("nope").is_none());
    }

    #[test]
    fn search_matches_names() {
        let mut store = RecipeStore::in_memory();
        store.set_basic_recipes(vec![Recipe::new("a", "Tomato Soup"), Recipe::new("b", "Cake")]);
        let hits: Vec<_> = store.search("soup").iter().map(|r| r.id.clone()).collect();
        assert_eq!(hits, vec!["a"]);
    }
}
