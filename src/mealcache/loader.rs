//! # Batched Detail Loader
//!
//! Enriches basic records with their full detail, a few at a time.
//!
//! Records are split into batches of `batch_size`. Within a batch every
//! fetch runs concurrently; batches run one after another. When a batch
//! settles, its successes go into the store in one `update_recipes` call, so
//! readers see the collection fill in progressively.
//!
//! Failures are per record: a failed fetch is logged, left basic, and reported
//! in [`LoadReport::failed`]. Nothing is retried here; the record stays basic
//! and the next load picks it up again.
//!
//! ## Cancellation
//!
//! The token is checked before each batch and before each fetch, and every
//! fetch is raced against it. Once it fires no further batch starts, in-flight
//! fetches resolve as cancelled, and the run ends quietly with
//! [`LoadReport::cancelled`] set. Cancellation is never an error.
//!
//! ## Skipping
//!
//! A record that is already detailed, either in the input or in the live
//! store at the moment its batch starts, is not fetched again. This is what
//! makes overlapping runs cheap: the newer run skips whatever the older one
//! finished.

use crate::error::{MealError, Result};
use crate::model::{Recipe, RecipeId};
use crate::source::{fetch_detail, RecipeSource};
use crate::store::SharedStore;
use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BATCH_SIZE: usize = 6;

/// Outcome of one loader run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Ids whose detail arrived and was merged, in completion order per batch.
    pub loaded: Vec<RecipeId>,
    /// Ids whose fetch failed. They remain basic.
    pub failed: Vec<RecipeId>,
    /// Records not fetched because they were already detailed.
    pub skipped: usize,
    /// Batches that ran to completion.
    pub batches: usize,
    pub cancelled: bool,
    /// The freshness gate answered and no loading happened.
    pub from_cache: bool,
}

impl LoadReport {
    pub fn cached() -> Self {
        Self {
            from_cache: true,
            ..Self::default()
        }
    }

    /// Everything requested is now detailed.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }
}

/// Reported after each batch settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based.
    pub batch: usize,
    pub total_batches: usize,
    pub loaded: usize,
    pub failed: usize,
}

impl BatchProgress {
    /// The first batch is where a view can switch from "loading" to "partial".
    pub fn is_first(&self) -> bool {
        self.batch == 1
    }
}

pub struct DetailLoader<'a, S: RecipeSource + ?Sized> {
    source: &'a S,
    store: SharedStore,
    batch_size: usize,
}

impl<'a, S: RecipeSource + ?Sized> DetailLoader<'a, S> {
    pub fn new(source: &'a S, store: SharedStore) -> Self {
        Self {
            source,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub async fn run(&self, recipes: &[Recipe], cancel: &CancellationToken) -> LoadReport {
        self.run_with_progress(recipes, cancel, |_| {}).await
    }

    pub async fn run_with_progress<F>(
        &self,
        recipes: &[Recipe],
        cancel: &CancellationToken,
        mut on_batch: F,
    ) -> LoadReport
    where
        F: FnMut(&BatchProgress),
    {
        let mut report = LoadReport::default();
        let total_batches = recipes.len().div_ceil(self.batch_size);

        for (n, batch) in recipes.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(batch = n + 1, "detail loading cancelled before batch");
                report.cancelled = true;
                break;
            }

            let pending = self.pending(batch);
            report.skipped += batch.len() - pending.len();
            tracing::debug!(
                batch = n + 1,
                total_batches,
                fetching = pending.len(),
                "loading detail batch"
            );

            let results = join_all(pending.iter().map(|r| self.fetch_one(r, cancel))).await;

            let mut progress = BatchProgress {
                batch: n + 1,
                total_batches,
                loaded: 0,
                failed: 0,
            };
            let mut fetched = Vec::with_capacity(results.len());
            for (recipe, result) in pending.iter().zip(results) {
                match result {
                    Ok(mut detail) => {
                        detail.id = recipe.id.clone();
                        fetched.push(detail);
                    }
                    Err(e) if e.is_cancelled() => {
                        tracing::info!(id = %recipe.id, "detail fetch cancelled");
                        report.cancelled = true;
                    }
                    Err(e) => {
                        tracing::warn!(id = %recipe.id, error = %e, "failed to load recipe details");
                        report.failed.push(recipe.id.clone());
                        progress.failed += 1;
                    }
                }
            }

            if !fetched.is_empty() {
                let ids: Vec<RecipeId> = fetched.iter().map(|r| r.id.clone()).collect();
                let mut store = self.store.borrow_mut();
                store.update_recipes(fetched);
                // A record removed while its fetch was in flight is not loaded
                for id in ids {
                    if store.get_recipe_by_id(&id).is_some() {
                        report.loaded.push(id);
                        progress.loaded += 1;
                    } else {
                        tracing::debug!(id = %id, "recipe removed during detail fetch");
                    }
                }
            }

            if report.cancelled {
                break;
            }
            report.batches += 1;
            on_batch(&progress);
        }

        tracing::debug!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            cancelled = report.cancelled,
            "detail loading finished"
        );
        report
    }

    /// Members of `batch` that still need fetching, judged against the live store.
    fn pending<'r>(&self, batch: &'r [Recipe]) -> Vec<&'r Recipe> {
        let store = self.store.borrow();
        batch
            .iter()
            .filter(|r| {
                let live_detailed = store
                    .get_recipe_by_id(&r.id)
                    .is_some_and(Recipe::is_detailed);
                !(r.is_detailed() || live_detailed)
            })
            .collect()
    }

    async fn fetch_one(&self, recipe: &Recipe, cancel: &CancellationToken) -> Result<Recipe> {
        if cancel.is_cancelled() {
            return Err(MealError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MealError::Cancelled),
            result = fetch_detail(self.source, recipe, cancel) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{numbered, RecipeFixture};
    use crate::source::memory::MemSource;
    use crate::store::RecipeStore;

    fn full(id: &str) -> Recipe {
        let mut recipe = Recipe::new(id, format!("Recipe {}", id));
        recipe.details.cook_time = Some(format!("{} minutes", id.len() * 10));
        recipe
    }

    fn seeded(ids: &[&str]) -> (MemSource, SharedStore, Vec<Recipe>) {
        let source = MemSource::with_recipes(ids.iter().map(|id| full(id)));
        let store = RecipeStore::in_memory().into_shared();
        let basic: Vec<Recipe> = ids
            .iter()
            .map(|id| Recipe::new(*id, format!("Recipe {}", id)))
            .collect();
        store.borrow_mut().set_basic_recipes(basic.clone());
        (source, store, basic)
    }

    #[tokio::test]
    async fn loads_every_record_in_batches() {
        let ids = ["a", "b", "c", "d", "e", "f", "g"];
        let (source, store, basic) = seeded(&ids);
        let mut seen = Vec::new();

        let report = DetailLoader::new(&source, store.clone())
            .batch_size(3)
            .run_with_progress(&basic, &CancellationToken::new(), |p| seen.push(*p))
            .await;

        assert!(report.is_complete());
        assert_eq!(report.loaded.len(), 7);
        assert_eq!(report.batches, 3);
        assert_eq!(seen.len(), 3);
        assert!(seen[0].is_first());
        assert_eq!(seen[2].batch, seen[2].total_batches);
        assert_eq!(seen[2].loaded, 1);

        let store = store.borrow();
        assert_eq!(store.recipes().len(), 7);
        assert!(store.recipes().iter().all(Recipe::is_detailed));
        assert!(!store.details_loading());
        assert!(store.collection().is_consistent());
    }

    #[tokio::test]
    async fn failures_stay_basic() {
        let (source, store, basic) = seeded(&["a", "b", "c"]);
        source.fail("b");

        let report = DetailLoader::new(&source, store.clone())
            .run(&basic, &CancellationToken::new())
            .await;

        assert_eq!(report.loaded, vec!["a", "c"]);
        assert_eq!(report.failed, vec!["b"]);
        assert!(!report.cancelled);

        let store = store.borrow();
        assert!(store.get_recipe_by_id("a").unwrap().is_detailed());
        let b = store.get_recipe_by_id("b").unwrap();
        assert!(!b.is_detailed());
        assert!(b.details.is_empty());
        assert!(store.details_loading());
    }

    #[tokio::test]
    async fn cancel_between_batches_stops_fetching() {
        let (source, store, basic) = seeded(&["a", "b", "c", "d"]);
        let token = CancellationToken::new();

        let report = DetailLoader::new(&source, store.clone())
            .batch_size(2)
            .run_with_progress(&basic, &token, |p| {
                if p.is_first() {
                    token.cancel();
                }
            })
            .await;

        assert!(report.cancelled);
        assert_eq!(report.batches, 1);
        assert_eq!(report.loaded, vec!["a", "b"]);
        assert_eq!(source.detail_calls(), vec!["a", "b"]);
        let store = store.borrow();
        assert!(store.get_recipe_by_id("a").unwrap().is_detailed());
        assert!(store.get_recipe_by_id("b").unwrap().is_detailed());
        assert!(!store.get_recipe_by_id("c").unwrap().is_detailed());
        assert!(!store.get_recipe_by_id("d").unwrap().is_detailed());
    }

    #[tokio::test]
    async fn recipe_removed_mid_fetch_is_not_reported_loaded() {
        let (source, store, basic) = seeded(&["a", "b"]);
        source.yield_on_fetch(true);
        let loader = DetailLoader::new(&source, store.clone());

        // The loader is polled first, so both fetches are in flight here
        let token = CancellationToken::new();
        let (report, _) = tokio::join!(loader.run(&basic, &token), async {
            store.borrow_mut().remove_recipe("b");
        });

        assert_eq!(source.detail_calls(), vec!["a", "b"]);
        assert_eq!(report.loaded, vec!["a"]);
        assert!(report.failed.is_empty());
        let store = store.borrow();
        assert!(store.get_recipe_by_id("b").is_none());
        assert!(store.collection().is_consistent());
    }

    #[tokio::test]
    async fn in_flight_fetch_resolves_on_cancel() {
        let (source, store, basic) = seeded(&["a", "b", "c"]);
        source.hang("b");
        let token = CancellationToken::new();
        let loader = DetailLoader::new(&source, store.clone()).batch_size(2);

        let (report, _) = tokio::join!(loader.run(&basic, &token), async {
            tokio::task::yield_now().await;
            token.cancel();
        });

        assert!(report.cancelled);
        assert_eq!(report.loaded, vec!["a"]);
        assert!(report.failed.is_empty());
        assert!(!source.detail_calls().contains(&"c".to_string()));
        assert!(store.borrow().get_recipe_by_id("a").unwrap().is_detailed());
    }

    #[tokio::test]
    async fn already_detailed_records_are_skipped() {
        let (source, store, basic) = seeded(&["a", "b"]);
        store.borrow_mut().update_recipes(vec![full("a")]);

        let report = DetailLoader::new(&source, store.clone())
            .run(&basic, &CancellationToken::new())
            .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(source.detail_calls(), vec!["b"]);
    }

    #[tokio::test]
    async fn soup_loads_and_cake_fails() {
        let soup = RecipeFixture::new("a", "Soup").without_slug();
        let cake = RecipeFixture::new("b", "Cake").without_slug();
        let source = MemSource::with_recipes([soup.clone().calories(100.0).full(), cake.full()]);
        source.fail("b");
        let store = RecipeStore::in_memory().into_shared();
        store
            .borrow_mut()
            .set_basic_recipes(vec![soup.basic(), cake.basic()]);
        let pending = store.borrow().collection().basic_recipes();

        let report = DetailLoader::new(&source, store.clone())
            .batch_size(1)
            .run(&pending, &CancellationToken::new())
            .await;

        assert_eq!(report.batches, 2);
        assert_eq!(report.failed, vec!["b"]);
        let store = store.borrow();
        let a = store.get_recipe_by_id("a").unwrap();
        assert!(a.is_detailed());
        assert_eq!(a.name, "Soup");
        assert_eq!(
            a.details.nutrition.as_ref().and_then(|n| n.calories),
            Some(100.0)
        );
        let b = store.get_recipe_by_id("b").unwrap();
        assert!(!b.is_detailed());
        assert_eq!(b.name, "Cake");
    }

    #[tokio::test]
    async fn interleaved_fetches_load_each_record_once() {
        let fixtures = numbered(20);
        let source = MemSource::with_recipes(fixtures.iter().map(RecipeFixture::full));
        source.yield_on_fetch(true);
        let store = RecipeStore::in_memory().into_shared();
        store
            .borrow_mut()
            .set_basic_recipes(fixtures.iter().map(RecipeFixture::basic).collect());
        let pending = store.borrow().collection().basic_recipes();

        let report = DetailLoader::new(&source, store.clone())
            .batch_size(6)
            .run(&pending, &CancellationToken::new())
            .await;

        assert_eq!(report.batches, 4);
        let mut calls = source.detail_calls();
        calls.sort();
        calls.dedup();
        assert_eq!(calls.len(), 20);
        let store = store.borrow();
        assert_eq!(store.recipes().len(), 20);
        assert_eq!(store.collection().detailed_count(), 20);
    }

    #[tokio::test]
    async fn fetch_prefers_slug() {
        let source = MemSource::with_recipes([full("a").with_slug("recipe-a")]);
        let store = RecipeStore::in_memory().into_shared();
        let basic = vec![Recipe::new("a", "Recipe a").with_slug("recipe-a")];
        store.borrow_mut().set_basic_recipes(basic.clone());

        let report = DetailLoader::new(&source, store.clone())
            .run(&basic, &CancellationToken::new())
            .await;

        assert_eq!(report.loaded, vec!["a"]);
        let store = store.borrow();
        let a = store.get_recipe_by_id("a").unwrap();
        assert_eq!(a.details.cook_time.as_deref(), Some("10 minutes"));
    }
}
