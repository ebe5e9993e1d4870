//! Core data types: recipes, their detail payload, and categories.
//!
//! Field names on the wire follow the recipe server's camelCase JSON
//! (`recipeCategory`, `recipeIngredient`, ...). The detail state is carried
//! as the `_detailsLoaded` boolean so snapshots written by older clients
//! still load.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type RecipeId = String;
pub type CategoryId = String;

/// Whether a record holds only list-endpoint fields or its full detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetailState {
    #[default]
    Basic,
    Detailed,
}

impl DetailState {
    pub fn is_detailed(self) -> bool {
        matches!(self, DetailState::Detailed)
    }
}

impl Serialize for DetailState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.is_detailed())
    }
}

impl<'de> Deserialize<'de> for DetailState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let loaded = Option::<bool>::deserialize(deserializer)?.unwrap_or(false);
        Ok(if loaded {
            DetailState::Detailed
        } else {
            DetailState::Basic
        })
    }
}

/// The `{id, name, slug}` subset of a category embedded in a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl CategoryRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Number of loaded recipes referencing this category. Derived, never authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
            count: None,
        }
    }

    pub fn reference(&self) -> CategoryRef {
        CategoryRef::new(self.id.clone(), self.name.clone(), self.slug.clone())
    }
}

impl From<&CategoryRef> for Category {
    fn from(r: &CategoryRef) -> Self {
        Category::new(r.id.clone(), r.name.clone(), r.slug.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

impl Ingredient {
    pub fn note(text: impl Into<String>) -> Self {
        Self {
            note: Some(text.into()),
            ..Self::default()
        }
    }

    /// Best human-readable rendering the server gave us.
    pub fn label(&self) -> &str {
        self.display
            .as_deref()
            .or(self.original_text.as_deref())
            .or(self.note.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl Instruction {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Nutrition values. The server sends these as numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    #[serde(default, deserialize_with = "lenient_number")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fat_content: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub protein_content: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub carbohydrate_content: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fiber_content: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sodium_content: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sugar_content: Option<f64>,
}

/// Fields only the detail endpoint fills in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_ingredient: Option<Vec<Ingredient>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_instructions: Option<Vec<Instruction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perform_time: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub recipe_servings: Option<f64>,
}

impl RecipeDetails {
    pub fn is_empty(&self) -> bool {
        *self == RecipeDetails::default()
    }

    /// Takes every field `other` knows, keeps ours where it is silent.
    pub fn overlay(&mut self, other: RecipeDetails) {
        fn take<T>(slot: &mut Option<T>, incoming: Option<T>) {
            if incoming.is_some() {
                *slot = incoming;
            }
        }
        take(&mut self.recipe_ingredient, other.recipe_ingredient);
        take(&mut self.recipe_instructions, other.recipe_instructions);
        take(&mut self.nutrition, other.nutrition);
        take(&mut self.prep_time, other.prep_time);
        take(&mut self.cook_time, other.cook_time);
        take(&mut self.total_time, other.total_time);
        take(&mut self.perform_time, other.perform_time);
        take(&mut self.recipe_servings, other.recipe_servings);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub recipe_category: Vec<CategoryRef>,
    #[serde(flatten)]
    pub details: RecipeDetails,
    #[serde(rename = "_detailsLoaded", default)]
    pub detail_state: DetailState,
}

impl Recipe {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: None,
            name: name.into(),
            description: None,
            recipe_category: Vec::new(),
            details: RecipeDetails::default(),
            detail_state: DetailState::Basic,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_category(mut self, category: CategoryRef) -> Self {
        self.recipe_category.push(category);
        self
    }

    pub fn is_detailed(&self) -> bool {
        self.detail_state.is_detailed()
    }

    pub fn mark(&mut self, state: DetailState) {
        self.detail_state = state;
    }

    /// The list-endpoint view of this record: detail fields dropped, state basic.
    pub fn to_basic(&self) -> Recipe {
        Recipe {
            details: RecipeDetails::default(),
            detail_state: DetailState::Basic,
            ..self.clone()
        }
    }

    pub fn has_category(&self, category_id: &str) -> bool {
        self.recipe_category.iter().any(|c| c.id == category_id)
    }

    /// Field-level merge. Fields the patch leaves as `None` survive untouched.
    pub fn apply(&mut self, patch: RecipePatch) {
        if let Some(slug) = patch.slug {
            self.slug = Some(slug);
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(categories) = patch.recipe_category {
            self.recipe_category = categories;
        }
        self.details.overlay(patch.details);
        if let Some(state) = patch.detail_state {
            self.detail_state = state;
        }
    }

    /// Merges a fetched record into this one, then marks it detailed.
    pub fn absorb(&mut self, fetched: Recipe) {
        let mut patch = RecipePatch::from(fetched);
        patch.detail_state = Some(DetailState::Detailed);
        self.apply(patch);
    }

    /// Case-insensitive match against name, slug and description.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self
                .slug
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&term))
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term))
    }
}

/// A partial update. Every `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_category: Option<Vec<CategoryRef>>,
    #[serde(flatten)]
    pub details: RecipeDetails,
    #[serde(skip)]
    pub detail_state: Option<DetailState>,
}

impl RecipePatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn categories(mut self, categories: Vec<CategoryRef>) -> Self {
        self.recipe_category = Some(categories);
        self
    }

    pub fn state(mut self, state: DetailState) -> Self {
        self.detail_state = Some(state);
        self
    }
}

/// Treats a record as a patch of the fields it actually carries.
///
/// An empty name or category list counts as absent, so a sparse detail
/// response never blanks out what the list endpoint already told us.
impl From<Recipe> for RecipePatch {
    fn from(recipe: Recipe) -> Self {
        Self {
            slug: recipe.slug,
            name: Some(recipe.name).filter(|n| !n.is_empty()),
            description: recipe.description,
            recipe_category: Some(recipe.recipe_category).filter(|c| !c.is_empty()),
            details: recipe.details,
            detail_state: None,
        }
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
