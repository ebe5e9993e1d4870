//! # Identity Index
//!
//! Maps a recipe id to its position in the ordered collection so lookups are
//! O(1) without giving up the collection's ordering.
//!
//! Two maintenance paths exist and both are deliberate:
//!
//! - [`IdentityIndex::rebuild`] clears and repopulates from the full
//!   collection. It is O(n) and is only paid when the collection changes
//!   shape (bulk replace, reconcile, removal). Do not call it in a loop.
//! - [`IdentityIndex::insert`] patches a single entry in O(1). Appends and
//!   in-place merges use this, since positions of other records don't move.

use crate::model::Recipe;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    positions: HashMap<String, usize>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full clear + repopulate. O(n).
    pub fn rebuild(&mut self, recipes: &[Recipe]) {
        self.positions.clear();
        self.positions.reserve(recipes.len());
        for (position, recipe) in recipes.iter().enumerate() {
            self.positions.insert(recipe.id.clone(), position);
        }
        tracing::debug!(entries = self.positions.len(), "identity index rebuilt");
    }

    pub fn insert(&mut self, id: &str, position: usize) {
        self.positions.insert(id.to_string(), position);
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True when every record has exactly one entry pointing at it and
    /// nothing else is indexed.
    pub fn mirrors(&self, recipes: &[Recipe]) -> bool {
        self.positions.len() == recipes.len()
            && recipes
                .iter()
                .enumerate()
                .all(|(position, recipe)| self.position(&recipe.id) == Some(position))
    }
}
