//! Recipe builders for tests.

use crate::model::{CategoryRef, Ingredient, Instruction, Nutrition, Recipe};
use crate::source::slugify;

#[derive(Debug, Clone)]
pub struct RecipeFixture {
    recipe: Recipe,
}

impl RecipeFixture {
    /// A recipe with a slug derived from `name` and no detail yet.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            recipe: Recipe::new(id, name).with_slug(slugify(name)),
        }
    }

    pub fn without_slug(mut self) -> Self {
        self.recipe.slug = None;
        self
    }

    pub fn category(mut self, id: &str, name: &str) -> Self {
        self.recipe
            .recipe_category
            .push(CategoryRef::new(id, name, slugify(name)));
        self
    }

    pub fn calories(mut self, calories: f64) -> Self {
        self.recipe.details.nutrition = Some(Nutrition {
            calories: Some(calories),
            ..Nutrition::default()
        });
        self
    }

    pub fn prep_time(mut self, time: &str) -> Self {
        self.recipe.details.prep_time = Some(time.to_string());
        self
    }

    pub fn ingredients(mut self, items: &[&str]) -> Self {
        self.recipe.details.recipe_ingredient =
            Some(items.iter().map(|i| Ingredient::note(*i)).collect());
        self
    }

    pub fn steps(mut self, steps: &[&str]) -> Self {
        self.recipe.details.recipe_instructions =
            Some(steps.iter().map(|s| Instruction::text(*s)).collect());
        self
    }

    /// What the list endpoint would return.
    pub fn basic(&self) -> Recipe {
        self.recipe.to_basic()
    }

    /// What the detail endpoint would return.
    pub fn full(&self) -> Recipe {
        self.recipe.clone()
    }
}

/// `count` recipes with ids `r0..`, each with a prep time.
pub fn numbered(count: usize) -> Vec<RecipeFixture> {
    (0..count)
        .map(|n| RecipeFixture::new(&format!("r{}", n), &format!("Recipe {}", n)).prep_time("5m"))
        .collect()
}
