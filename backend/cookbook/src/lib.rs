use std::{fmt, num::ParseIntError, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod remote;

pub use remote::get_seed_remote;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub image: String,
}

/// Store-assigned recipe identifier.
///
/// Identifiers only ever grow, so ordering by id is ordering by insertion.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RecipeId(pub u64);

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecipeId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(RecipeId)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: RecipeId,
    pub name: String,
    pub description: String,
    pub email: String,
    pub ingredients: Vec<String>,
    /// Category name. Not checked against the category collection.
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NewRecipe {
    pub name: String,
    pub description: String,
    pub email: String,
    pub ingredients: Vec<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NewRecipe {
    pub fn with_id(self, id: RecipeId) -> Recipe {
        Recipe {
            id,
            name: self.name,
            description: self.description,
            email: self.email,
            ingredients: self.ingredients,
            category: self.category,
            image: self.image,
        }
    }
}

/// Seed document loaded by the `seed` binary.
#[derive(Debug, Deserialize, Default)]
pub struct Seed {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub recipes: Vec<NewRecipe>,
}

pub fn get_seed(path: impl AsRef<Path>) -> anyhow::Result<Seed> {
    let data = std::fs::read(path)?;

    Ok(serde_json::from_slice(&data)?)
}
