//! # Seeding
//!
//! Loads categories and sample recipes into the store.
//!
//! ## Source
//! - A path to a JSON seed document, or an `http(s)` URL serving one.
//! - Shape: `{ "categories": [{ name, image }], "recipes": [{ name, description, email, ingredients, category, image }] }`
//!
//! ## Notes
//! - Categories are appended as given. Running twice duplicates them.
//! - Recipes get fresh ids, in document order, so the last recipe in the
//!   document is the newest.
use cookbook::{Seed, get_seed, get_seed_remote};
use indicatif::{ProgressBar, ProgressStyle};
use server::{
    database::RedisStore,
    store::{CategoryStore, RecipeStore},
};
use tracing::debug;

pub mod utils;

use utils::is_remote;

pub struct Loaded {
    pub categories: usize,
    pub recipes: usize,
}

pub async fn load(source: &str, redis_url: &str) -> anyhow::Result<Loaded> {
    let seed = read_seed(source).await?;

    println!("Loaded Categories: {}", seed.categories.len());
    println!("Loaded Recipes: {}\n", seed.recipes.len());

    let store = RedisStore::connect(redis_url).await?;

    seed_store(seed, &store, &store).await
}

pub async fn read_seed(source: &str) -> anyhow::Result<Seed> {
    if is_remote(source) {
        get_seed_remote(source).await
    } else {
        get_seed(source)
    }
}

pub async fn seed_store(
    seed: Seed,
    categories: &dyn CategoryStore,
    recipes: &dyn RecipeStore,
) -> anyhow::Result<Loaded> {
    let category_count = seed.categories.len();
    categories.insert_many(seed.categories).await?;

    let pb = ProgressBar::new(seed.recipes.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut recipe_count = 0;
    for recipe in seed.recipes {
        pb.set_message(format!("Inserting {}", recipe.name));

        let inserted = recipes.insert(recipe).await?;
        debug!(id = %inserted.id, "Inserted recipe");

        recipe_count += 1;
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    Ok(Loaded {
        categories: category_count,
        recipes: recipe_count,
    })
}
