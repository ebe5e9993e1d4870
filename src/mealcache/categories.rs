//! # Category Registry
//!
//! Holds the known category list and a per-category cache of recipes.
//!
//! The cache is not authoritative. A missing entry means "not loaded for this
//! category yet", not "no recipes". Readers that find no cached entry fall
//! back to filtering the collection, and that fallback is never written back
//! into the cache (it would go stale as soon as a recipe's categories change).

use crate::model::{Category, CategoryId, Recipe};
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
    category_recipes: HashMap<CategoryId, Vec<Recipe>>,
    selected_category: Option<CategoryId>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn set_categories(&mut self, list: Vec<Category>) {
        self.categories = list;
    }

    /// Insert, or replace the entry with the same id in place.
    pub fn add_category(&mut self, category: Category) {
        match self.categories.iter_mut().find(|c| c.id == category.id) {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    /// Drops the category, its cache entry, and the selection if it pointed here.
    pub fn remove_category(&mut self, id: &str) -> Option<Category> {
        let pos = self.categories.iter().position(|c| c.id == id)?;
        let removed = self.categories.remove(pos);
        self.category_recipes.remove(id);
        if self.selected_category.as_deref() == Some(id) {
            self.selected_category = None;
        }
        Some(removed)
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    pub fn select(&mut self, id: Option<CategoryId>) {
        self.selected_category = id;
    }

    pub fn cache_recipes(&mut self, category_id: &str, recipes: Vec<Recipe>) {
        self.category_recipes
            .insert(category_id.to_string(), recipes);
    }

    /// The cached list, only when present and non-empty.
    pub fn cached(&self, category_id: &str) -> Option<&[Recipe]> {
        self.category_recipes
            .get(category_id)
            .filter(|list| !list.is_empty())
            .map(Vec::as_slice)
    }

    /// Replace every cached copy of `recipe` with this one.
    pub fn sync_recipe(&mut self, recipe: &Recipe) {
        for list in self.category_recipes.values_mut() {
            if let Some(cached) = list.iter_mut().find(|r| r.id == recipe.id) {
                *cached = recipe.clone();
            }
        }
    }

    /// Drop one recipe from one category's cache.
    pub fn forget(&mut self, category_id: &str, recipe_id: &str) {
        if let Some(list) = self.category_recipes.get_mut(category_id) {
            list.retain(|r| r.id != recipe_id);
        }
    }

    pub fn purge_recipe(&mut self, recipe_id: &str) {
        for list in self.category_recipes.values_mut() {
            list.retain(|r| r.id != recipe_id);
        }
    }
}

/// Recipes whose category refs include `category_id`, in collection order.
pub fn filter_by_category(recipes: &[Recipe], category_id: &str) -> Vec<Recipe> {
    recipes
        .iter()
        .filter(|r| r.has_category(category_id))
        .cloned()
        .collect()
}

/// Every category referenced by `recipes`, first-seen order, with counts.
pub fn used_categories(recipes: &[Recipe]) -> Vec<Category> {
    let mut used: IndexMap<&str, Category> = IndexMap::new();
    for recipe in recipes {
        for reference in &recipe.recipe_category {
            let category = used
                .entry(reference.id.as_str())
                .or_insert_with(|| Category::from(reference));
            category.count = Some(category.count.unwrap_or(0) + 1);
        }
    }
    used.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryRef;

    fn soups() -> CategoryRef {
        CategoryRef::new("c1", "Soups", "soups")
    }

    fn desserts() -> CategoryRef {
        CategoryRef::new("c2", "Desserts", "desserts")
    }

    #[test]
    fn add_category_upserts() {
        let mut registry = CategoryRegistry::new();
        registry.add_category(Category::new("c1", "Soup", "soup"));
        registry.add_category(Category::new("c1", "Soups", "soups"));
        registry.add_category(Category::new("c2", "Desserts", "desserts"));

        assert_eq!(registry.categories().len(), 2);
        assert_eq!(registry.categories()[0].name, "Soups");
    }

    #[test]
    fn remove_category_purges_cache_and_selection() {
        let mut registry = CategoryRegistry::new();
        registry.set_categories(vec![Category::new("c1", "Soups", "soups")]);
        registry.cache_recipes("c1", vec![Recipe::new("a", "Soup").with_category(soups())]);
        registry.select(Some("c1".into()));

        assert!(registry.remove_category("c1").is_some());
        assert!(registry.cached("c1").is_none());
        assert_eq!(registry.selected_category(), None);
        assert!(registry.remove_category("c1").is_none());
    }

    #[test]
    fn remove_other_category_keeps_selection() {
        let mut registry = CategoryRegistry::new();
        registry.set_categories(vec![
            Category::new("c1", "Soups", "soups"),
            Category::new("c2", "Desserts", "desserts"),
        ]);
        registry.select(Some("c1".into()));
        registry.remove_category("c2");
        assert_eq!(registry.selected_category(), Some("c1"));
    }

    #[test]
    fn empty_cache_entry_reads_as_absent() {
        let mut registry = CategoryRegistry::new();
        registry.cache_recipes("c1", Vec::new());
        assert!(registry.cached("c1").is_none());
    }

    #[test]
    fn sync_recipe_replaces_cached_copies() {
        let mut registry = CategoryRegistry::new();
        let soup = Recipe::new("a", "Soup").with_category(soups());
        registry.cache_recipes("c1", vec![soup.clone()]);
        registry.cache_recipes("c2", vec![Recipe::new("b", "Cake")]);

        let mut renamed = soup;
        renamed.name = "Stew".into();
        registry.sync_recipe(&renamed);
        assert_eq!(registry.cached("c1").unwrap()[0].name, "Stew");
        assert_eq!(registry.cached("c2").unwrap()[0].name, "Cake");

        registry.forget("c1", "a");
        assert!(registry.cached("c1").is_none());
    }

    #[test]
    fn used_categories_counts_references() {
        let recipes = vec![
            Recipe::new("a", "Soup").with_category(soups()),
            Recipe::new("b", "Cake").with_category(desserts()),
            Recipe::new("c", "Sweet soup")
                .with_category(soups())
                .with_category(desserts()),
            Recipe::new("d", "Plain"),
        ];

        let used = used_categories(&recipes);
        assert_eq!(used.len(), 2);
        assert_eq!(used[0].id, "c1");
        assert_eq!(used[0].count, Some(2));
        assert_eq!(used[1].id, "c2");
        assert_eq!(used[1].count, Some(2));
    }

    #[test]
    fn filter_by_category_keeps_order() {
        let recipes = vec![
            Recipe::new("a", "Soup").with_category(soups()),
            Recipe::new("b", "Cake").with_category(desserts()),
            Recipe::new("c", "Stew").with_category(soups()),
        ];
        let ids: Vec<_> = filter_by_category(&recipes, "c1")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
