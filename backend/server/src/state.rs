use std::sync::Arc;

use crate::{
    config::{Config, StoreKind},
    database::RedisStore,
    error::StoreError,
    render::{JsonRenderer, Renderer},
    store::{CategoryStore, MemoryStore, RecipeStore},
};

pub struct AppState {
    pub config: Config,
    pub categories: Arc<dyn CategoryStore>,
    pub recipes: Arc<dyn RecipeStore>,
    pub renderer: Arc<dyn Renderer>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, StoreError> {
        let state = match config.store {
            StoreKind::Redis => {
                let store = Arc::new(RedisStore::connect(&config.redis_url).await?);
                Self::with_stores(config, store.clone(), store)
            }
            StoreKind::Memory => {
                let store = Arc::new(MemoryStore::new());
                Self::with_stores(config, store.clone(), store)
            }
        };

        Ok(Arc::new(state))
    }

    pub fn with_stores(
        config: Config,
        categories: Arc<dyn CategoryStore>,
        recipes: Arc<dyn RecipeStore>,
    ) -> Self {
        Self {
            config,
            categories,
            recipes,
            renderer: Arc::new(JsonRenderer),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }
}
