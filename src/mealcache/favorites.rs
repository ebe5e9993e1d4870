//! # Favorites Set
//!
//! A set of recipe ids with its own lifecycle: a favorite may point at a
//! recipe that is not loaded right now, and reloading the collection never
//! touches it.
//!
//! Every mutation is written through to [`StorageBackend`] under
//! [`FAVORITES_KEY`] as a JSON array. A failed write is retried once after
//! clearing the key; if that fails too the failure is logged and the
//! in-memory set stays authoritative. Callers never see a storage error.

use crate::storage::{StorageBackend, FAVORITES_KEY};
use indexmap::IndexSet;
use std::rc::Rc;

pub struct Favorites {
    ids: IndexSet<String>,
    storage: Rc<dyn StorageBackend>,
}

impl Favorites {
    /// Restore from storage. Anything that is not a JSON array is discarded
    /// and the key rewritten as empty.
    pub fn load(storage: Rc<dyn StorageBackend>) -> Self {
        let raw = match storage.get(FAVORITES_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "could not read favorites, starting empty");
                None
            }
        };

        let mut favorites = Self {
            ids: IndexSet::new(),
            storage,
        };

        let Some(raw) = raw else {
            return favorites;
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(items)) => {
                favorites.ids = items
                    .into_iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(id) => Some(id),
                        _ => None,
                    })
                    .collect();
            }
            _ => {
                tracing::warn!("persisted favorites are not an array, resetting");
                favorites.persist();
            }
        }
        favorites
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns true if the id was not already a favorite.
    pub fn add(&mut self, id: &str) -> bool {
        let added = self.ids.insert(id.to_string());
        self.persist();
        added
    }

    /// Returns true if the id was a favorite.
    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.ids.shift_remove(id);
        self.persist();
        removed
    }

    /// Flips membership and returns the new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.is_favorite(id) {
            self.remove(id);
            false
        } else {
            self.add(id);
            true
        }
    }

    /// Favorite ids in the order they were added.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn persist(&self) {
        let payload = match serde_json::to_string(&self.ids) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "could not encode favorites");
                return;
            }
        };

        if let Err(first) = self.storage.set(FAVORITES_KEY, &payload) {
            tracing::warn!(error = %first, "saving favorites failed, clearing key and retrying");
            if let Err(e) = self.storage.remove(FAVORITES_KEY) {
                tracing::debug!(error = %e, "clearing favorites key failed");
            }
            if let Err(second) = self.storage.set(FAVORITES_KEY, &payload) {
                tracing::error!(error = %second, "giving up on persisting favorites");
            }
        }
    }
}
