use chrono::{DateTime, Utc};
use colored::Colorize;
use mealcache::loader::LoadReport;
use mealcache::model::{Category, Nutrition, Recipe};
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const STATE_WIDTH: usize = 8;
const FAVORITE_MARKER: &str = "★";

#[derive(Debug, Clone, Copy)]
pub(super) enum MessageLevel {
    Info,
    Success,
    Warning,
}

pub(super) fn print_message(level: MessageLevel, content: &str) {
    match level {
        MessageLevel::Info => println!("{}", content.dimmed()),
        MessageLevel::Success => println!("{}", content.green()),
        MessageLevel::Warning => println!("{}", content.yellow()),
    }
}

pub(super) fn print_recipes<F>(recipes: &[Recipe], is_favorite: F)
where
    F: Fn(&str) -> bool,
{
    if recipes.is_empty() {
        println!("No recipes found.");
        return;
    }

    for (i, recipe) in recipes.iter().enumerate() {
        let left_prefix = if is_favorite(&recipe.id) {
            format!("  {} ", FAVORITE_MARKER)
        } else {
            "    ".to_string()
        };
        let idx_str = format!("{}. ", i + 1);

        let fixed_width = left_prefix.width() + idx_str.width() + STATE_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed_width);
        let title = truncate_to_width(&recipe_title(recipe), available);
        let padding = available.saturating_sub(title.width());

        let state = if recipe.is_detailed() { "" } else { "basic" };

        println!(
            "{}{}{}{}{}",
            left_prefix.yellow(),
            idx_str,
            title,
            " ".repeat(padding),
            format!("{:>width$}", state, width = STATE_WIDTH).dimmed()
        );
    }
}

pub(super) fn print_recipe(recipe: &Recipe, favorite: bool) {
    let marker = if favorite {
        format!(" {}", FAVORITE_MARKER).yellow().to_string()
    } else {
        String::new()
    };
    println!("{}{}", recipe.name.bold(), marker);
    if let Some(slug) = &recipe.slug {
        println!("{}", slug.dimmed());
    }
    println!("--------------------------------");

    if let Some(description) = recipe.description.as_deref().filter(|d| !d.is_empty()) {
        println!("{}\n", description);
    }
    if !recipe.recipe_category.is_empty() {
        let names: Vec<&str> = recipe
            .recipe_category
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        println!("{} {}", "Categories:".bold(), names.join(", "));
    }

    let details = &recipe.details;
    let times: Vec<String> = [
        ("Prep", &details.prep_time),
        ("Cook", &details.cook_time),
        ("Total", &details.total_time),
    ]
    .iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
    .collect();
    if !times.is_empty() {
        println!("{}", times.join("   "));
    }
    if let Some(servings) = details.recipe_servings {
        println!("Servings: {}", servings);
    }

    if let Some(ingredients) = details.recipe_ingredient.as_ref().filter(|i| !i.is_empty()) {
        println!("\n{}", "Ingredients".bold());
        for ingredient in ingredients {
            println!("  - {}", ingredient.label());
        }
    }
    if let Some(steps) = details
        .recipe_instructions
        .as_ref()
        .filter(|s| !s.is_empty())
    {
        println!("\n{}", "Instructions".bold());
        for (n, step) in steps.iter().enumerate() {
            match &step.title {
                Some(title) => println!("  {}. {} {}", n + 1, title.bold(), step.text),
                None => println!("  {}. {}", n + 1, step.text),
            }
        }
    }
    if let Some(line) = details.nutrition.as_ref().and_then(nutrition_line) {
        println!("\n{} {}", "Nutrition:".bold(), line);
    }

    if !recipe.is_detailed() {
        println!("\n{}", "(details not loaded)".dimmed());
    }
}

pub(super) fn print_categories(categories: &[Category]) {
    if categories.is_empty() {
        println!("No categories found.");
        return;
    }
    let name_width = categories
        .iter()
        .map(|c| c.name.width())
        .max()
        .unwrap_or(0);
    for category in categories {
        let count = match category.count {
            Some(1) => "1 recipe".to_string(),
            Some(n) => format!("{} recipes", n),
            None => String::new(),
        };
        let padding = name_width.saturating_sub(category.name.width());
        println!(
            "    {}{}  {}  {}",
            category.name,
            " ".repeat(padding),
            category.slug.dimmed(),
            count.dimmed()
        );
    }
}

pub(super) fn print_load_report(report: &LoadReport) {
    if report.from_cache {
        print_message(MessageLevel::Info, "Served from cache.");
        return;
    }
    if !report.failed.is_empty() {
        print_message(
            MessageLevel::Warning,
            &format!(
                "Could not load details for {} recipe(s): {}",
                report.failed.len(),
                report.failed.join(", ")
            ),
        );
    }
    if report.cancelled {
        print_message(MessageLevel::Warning, "Detail loading was interrupted.");
    }
}

/// Name followed by category names, the way a list row shows it.
fn recipe_title(recipe: &Recipe) -> String {
    if recipe.recipe_category.is_empty() {
        return recipe.name.clone();
    }
    let names: Vec<&str> = recipe
        .recipe_category
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    format!("{} · {}", recipe.name, names.join(", "))
}

fn nutrition_line(nutrition: &Nutrition) -> Option<String> {
    let parts: Vec<String> = [
        (nutrition.calories, "kcal"),
        (nutrition.protein_content, "g protein"),
        (nutrition.fat_content, "g fat"),
        (nutrition.carbohydrate_content, "g carbs"),
    ]
    .iter()
    .filter_map(|(value, unit)| value.map(|v| format!("{} {}", v, unit)))
    .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

pub(super) fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(timestamp);
    Formatter::new().convert(duration.to_std().unwrap_or_default())
}
