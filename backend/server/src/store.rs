//! Category and recipe collections.
//!
//! Handlers only ever see the two traits. [`RedisStore`](crate::database::RedisStore)
//! backs production, [`MemoryStore`] backs tests and `STORE=memory`.
use std::collections::BTreeMap;

use async_trait::async_trait;
use cookbook::{Category, NewRecipe, Recipe, RecipeId};
use tokio::sync::RwLock;

use crate::{error::StoreError, search::TextQuery};

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// First `limit` categories in insertion order.
    async fn list(&self, limit: usize) -> Result<Vec<Category>, StoreError>;

    async fn insert_many(&self, categories: Vec<Category>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// First `limit` recipes whose category equals `category`, oldest first.
    async fn by_category(&self, category: &str, limit: usize) -> Result<Vec<Recipe>, StoreError>;

    /// First `limit` recipes, newest first.
    async fn latest(&self, limit: usize) -> Result<Vec<Recipe>, StoreError>;

    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Recipe at `offset` in insertion order.
    async fn nth(&self, offset: u64) -> Result<Option<Recipe>, StoreError>;

    async fn search(&self, query: &TextQuery) -> Result<Vec<Recipe>, StoreError>;

    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, StoreError>;
}

#[derive(Default)]
struct Collections {
    categories: Vec<Category>,
    recipes: BTreeMap<RecipeId, Recipe>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list(&self, limit: usize) -> Result<Vec<Category>, StoreError> {
        let inner = self.inner.read().await;

        Ok(inner.categories.iter().take(limit).cloned().collect())
    }

    async fn insert_many(&self, categories: Vec<Category>) -> Result<(), StoreError> {
        self.inner.write().await.categories.extend(categories);

        Ok(())
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn by_category(&self, category: &str, limit: usize) -> Result<Vec<Recipe>, StoreError> {
        let inner = self.inner.read().await;

        Ok(inner
            .recipes
            .values()
            .filter(|recipe| recipe.category == category)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Recipe>, StoreError> {
        let inner = self.inner.read().await;

        Ok(inner.recipes.values().rev().take(limit).cloned().collect())
    }

    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.inner.read().await.recipes.get(&id).cloned())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.recipes.len() as u64)
    }

    async fn nth(&self, offset: u64) -> Result<Option<Recipe>, StoreError> {
        let inner = self.inner.read().await;

        Ok(usize::try_from(offset)
            .ok()
            .and_then(|offset| inner.recipes.values().nth(offset))
            .cloned())
    }

    async fn search(&self, query: &TextQuery) -> Result<Vec<Recipe>, StoreError> {
        let inner = self.inner.read().await;

        Ok(inner
            .recipes
            .values()
            .filter(|recipe| query.matches(recipe))
            .cloned()
            .collect())
    }

    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        let mut inner = self.inner.write().await;

        inner.next_id += 1;
        let recipe = recipe.with_id(RecipeId(inner.next_id));
        inner.recipes.insert(recipe.id, recipe.clone());

        Ok(recipe)
    }
}
