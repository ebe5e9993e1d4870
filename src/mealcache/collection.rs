//! # Recipe Collection
//!
//! The ordered list of recipe records and the primary store of truth. Each
//! record is either basic (list-endpoint fields only) or detailed.
//!
//! Every mutator keeps the [`IdentityIndex`] in step with membership: bulk
//! operations rebuild it, point operations patch one entry. None of them lets
//! basic data erase detail fields that are already known.

use crate::index::IdentityIndex;
use crate::model::{DetailState, Recipe, RecipePatch};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct RecipeCollection {
    recipes: Vec<Recipe>,
    index: IdentityIndex,
    last_fetched: Option<DateTime<Utc>>,
    details_loading: bool,
}

impl RecipeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.index.position(id).map(|pos| &self.recipes[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn last_fetched(&self) -> Option<DateTime<Utc>> {
        self.last_fetched
    }

    pub(crate) fn restore_last_fetched(&mut self, at: Option<DateTime<Utc>>) {
        self.last_fetched = at;
    }

    pub fn details_loading(&self) -> bool {
        self.details_loading
    }

    pub fn detailed_count(&self) -> usize {
        self.recipes.iter().filter(|r| r.is_detailed()).count()
    }

    pub fn all_detailed(&self) -> bool {
        self.recipes.iter().all(Recipe::is_detailed)
    }

    /// Records still waiting for their detail fetch, in collection order.
    pub fn basic_recipes(&self) -> Vec<Recipe> {
        self.recipes
            .iter()
            .filter(|r| !r.is_detailed())
            .cloned()
            .collect()
    }

    /// True when the index mirrors membership exactly.
    pub fn is_consistent(&self) -> bool {
        self.index.mirrors(&self.recipes)
    }

    /// Full reload: everything becomes basic and detail loading starts over.
    pub fn set_basic(&mut self, list: Vec<Recipe>, now: DateTime<Utc>) {
        self.recipes = dedupe(list)
            .into_iter()
            .map(|mut recipe| {
                recipe.mark(DetailState::Basic);
                recipe
            })
            .collect();
        self.index.rebuild(&self.recipes);
        self.last_fetched = Some(now);
        self.details_loading = true;
    }

    /// Reconciles a fresh basic list against what is already held.
    ///
    /// Detailed records keep their detail fields and stay detailed; basic
    /// records take the new list data. Unseen ids are appended. Records the
    /// new list doesn't mention are kept as they are.
    pub fn refresh_basic(&mut self, list: Vec<Recipe>, now: DateTime<Utc>) {
        for mut incoming in dedupe(list) {
            match self.index.position(&incoming.id) {
                Some(pos) => {
                    let existing = &mut self.recipes[pos];
                    if existing.is_detailed() {
                        incoming.details = std::mem::take(&mut existing.details);
                        incoming.mark(DetailState::Detailed);
                    } else {
                        incoming.mark(DetailState::Basic);
                    }
                    *existing = incoming;
                }
                None => {
                    incoming.mark(DetailState::Basic);
                    self.recipes.push(incoming);
                }
            }
        }
        self.index.rebuild(&self.recipes);
        self.last_fetched = Some(now);
        self.details_loading = !self.all_detailed();
    }

    /// Wholesale replace with records already known to be complete.
    pub fn set_detailed(&mut self, list: Vec<Recipe>, now: DateTime<Utc>) {
        self.recipes = dedupe(list)
            .into_iter()
            .map(|mut recipe| {
                recipe.mark(DetailState::Detailed);
                recipe
            })
            .collect();
        self.index.rebuild(&self.recipes);
        self.last_fetched = Some(now);
        self.details_loading = false;
    }

    /// Merges each record into its existing entry and marks it detailed.
    /// Ids not in the collection are ignored. Returns how many were merged.
    pub fn update_many(&mut self, list: Vec<Recipe>) -> usize {
        let mut merged = 0;
        for recipe in list {
            match self.index.position(&recipe.id) {
                Some(pos) => {
                    self.recipes[pos].absorb(recipe);
                    merged += 1;
                }
                None => tracing::debug!(id = %recipe.id, "update for unknown recipe ignored"),
            }
        }
        if self.all_detailed() {
            self.details_loading = false;
        }
        merged
    }

    /// Field-level merge into one record. O(1), the index is untouched.
    pub fn merge(&mut self, id: &str, patch: RecipePatch) -> Option<&Recipe> {
        let pos = self.index.position(id)?;
        let recipe = &mut self.recipes[pos];
        recipe.apply(patch);
        Some(recipe)
    }

    /// Merge if present, append otherwise. The result is always detailed.
    pub fn upsert(&mut self, recipe: Recipe) -> &Recipe {
        let pos = match self.index.position(&recipe.id) {
            Some(pos) => {
                self.recipes[pos].absorb(recipe);
                pos
            }
            None => {
                let mut recipe = recipe;
                recipe.mark(DetailState::Detailed);
                self.recipes.push(recipe);
                let pos = self.recipes.len() - 1;
                self.index.insert(&self.recipes[pos].id, pos);
                pos
            }
        };
        &self.recipes[pos]
    }

    pub fn remove(&mut self, id: &str) -> Option<Recipe> {
        let pos = self.index.position(id)?;
        let removed = self.recipes.remove(pos);
        self.index.rebuild(&self.recipes);
        Some(removed)
    }

    /// Point mutation with the index unchanged. The closure must not touch `id`.
    pub(crate) fn with_recipe_mut<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Recipe) -> T,
    ) -> Option<T> {
        let pos = self.index.position(id)?;
        Some(f(&mut self.recipes[pos]))
    }
}

/// Later duplicates replace earlier ones in place, so an id occurs once.
fn dedupe(list: Vec<Recipe>) -> Vec<Recipe> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(list.len());
    let mut out: Vec<Recipe> = Vec::with_capacity(list.len());
    for recipe in list {
        match seen.get(&recipe.id) {
            Some(&pos) => out[pos] = recipe,
            None => {
                seen.insert(recipe.id.clone(), out.len());
                out.push(recipe);
            }
        }
    }
    out
}
