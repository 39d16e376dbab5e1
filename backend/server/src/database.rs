//! # Redis
//!
//! Document store for categories and recipes.
//!
//! ## Layout
//!
//! - `categories`: list of JSON categories, insertion order
//! - `recipe:next_id`: counter, `INCR` hands out recipe ids
//! - `recipes`: hash of recipe id to JSON recipe
//! - `recipes:order`: sorted set of every recipe id, scored by id
//! - `recipes:category:<name>`: sorted set of recipe ids per category name
//!
//! ## Notes
//!
//! - Ids only grow, so the `recipes:order` score doubles as insertion order.
//!   Newest first is a reverse range over it.
//! - A recipe and its two index entries are written in one `MULTI`/`EXEC`.
//! - Search loads every recipe and filters in process. Fine for a blog sized dataset.
//! - [`RedisStore::with_prefix`] namespaces every key, so several stores can
//!   share one database.
use std::time::Duration;

use async_trait::async_trait;
use cookbook::{Category, NewRecipe, Recipe, RecipeId};
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::{
    error::StoreError,
    search::TextQuery,
    store::{CategoryStore, RecipeStore},
};

pub const CATEGORIES_KEY: &str = "categories";
pub const NEXT_RECIPE_ID_KEY: &str = "recipe:next_id";
pub const RECIPES_KEY: &str = "recipes";
pub const RECIPE_ORDER_KEY: &str = "recipes:order";

pub fn category_key(category: &str) -> String {
    format!("recipes:category:{category}")
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_secs(1));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self::with_prefix(connection, "")
    }

    pub fn with_prefix(connection: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            connection,
            prefix: prefix.into(),
        }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(init_redis(redis_url).await?))
    }

    /// Every key this store reads or writes.
    pub fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    async fn load(&self, ids: &[u64]) -> Result<Vec<Recipe>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut connection = self.connection.clone();
        let documents: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(self.key(RECIPES_KEY))
            .arg(ids)
            .query_async(&mut connection)
            .await?;

        ids.iter()
            .zip(documents)
            .map(|(&id, document)| -> Result<Recipe, StoreError> {
                let document = document.ok_or(StoreError::MissingDocument(RecipeId(id)))?;
                Ok(serde_json::from_str(&document)?)
            })
            .collect()
    }

    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Recipe>, StoreError> {
        let mut connection = self.connection.clone();
        let ids: Vec<u64> = connection.zrange(key, start, stop).await?;

        self.load(&ids).await
    }
}

/// Last index for a `limit` sized range, `None` when nothing should be fetched.
fn stop(limit: usize) -> Option<isize> {
    if limit == 0 {
        return None;
    }

    Some(isize::try_from(limit).unwrap_or(isize::MAX) - 1)
}

#[async_trait]
impl CategoryStore for RedisStore {
    async fn list(&self, limit: usize) -> Result<Vec<Category>, StoreError> {
        let Some(stop) = stop(limit) else {
            return Ok(Vec::new());
        };

        let mut connection = self.connection.clone();
        let documents: Vec<String> = connection.lrange(self.key(CATEGORIES_KEY), 0, stop).await?;

        documents
            .iter()
            .map(|document| serde_json::from_str(document).map_err(StoreError::from))
            .collect()
    }

    async fn insert_many(&self, categories: Vec<Category>) -> Result<(), StoreError> {
        if categories.is_empty() {
            return Ok(());
        }

        let documents = categories
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        let mut connection = self.connection.clone();
        let _: () = connection.rpush(self.key(CATEGORIES_KEY), documents).await?;

        Ok(())
    }
}

#[async_trait]
impl RecipeStore for RedisStore {
    async fn by_category(&self, category: &str, limit: usize) -> Result<Vec<Recipe>, StoreError> {
        let Some(stop) = stop(limit) else {
            return Ok(Vec::new());
        };

        self.range(&self.key(&category_key(category)), 0, stop).await
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Recipe>, StoreError> {
        let Some(stop) = stop(limit) else {
            return Ok(Vec::new());
        };

        let mut connection = self.connection.clone();
        let ids: Vec<u64> = connection.zrevrange(self.key(RECIPE_ORDER_KEY), 0, stop).await?;

        self.load(&ids).await
    }

    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let mut connection = self.connection.clone();
        let document: Option<String> = connection.hget(self.key(RECIPES_KEY), id.0).await?;

        document
            .map(|document| serde_json::from_str(&document))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.zcard(self.key(RECIPE_ORDER_KEY)).await?)
    }

    async fn nth(&self, offset: u64) -> Result<Option<Recipe>, StoreError> {
        let Ok(offset) = isize::try_from(offset) else {
            return Ok(None);
        };

        Ok(self
            .range(&self.key(RECIPE_ORDER_KEY), offset, offset)
            .await?
            .into_iter()
            .next())
    }

    async fn search(&self, query: &TextQuery) -> Result<Vec<Recipe>, StoreError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut connection = self.connection.clone();
        let documents: Vec<String> = connection.hvals(self.key(RECIPES_KEY)).await?;

        let mut matches = Vec::new();
        for document in documents {
            let recipe: Recipe = serde_json::from_str(&document)?;
            if query.matches(&recipe) {
                matches.push(recipe);
            }
        }
        matches.sort_by_key(|recipe| recipe.id);

        Ok(matches)
    }

    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        let mut connection = self.connection.clone();

        let id: u64 = connection.incr(self.key(NEXT_RECIPE_ID_KEY), 1).await?;
        let recipe = recipe.with_id(RecipeId(id));
        let document = serde_json::to_string(&recipe)?;

        let _: () = redis::pipe()
            .atomic()
            .hset(self.key(RECIPES_KEY), id, document)
            .ignore()
            .zadd(self.key(RECIPE_ORDER_KEY), id, id)
            .ignore()
            .zadd(self.key(&category_key(&recipe.category)), id, id)
            .ignore()
            .query_async(&mut connection)
            .await?;

        Ok(recipe)
    }
}
