//! Documentation of the cooking blog backend.
//!
//! Server-rendered recipe blog: every route is a store read followed by a
//! render, or a store write followed by a redirect.
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Template |
//! |---|---|---|
//! | GET | `/` | `index` |
//! | GET | `/categories` | `categories` |
//! | GET | `/categories/{id}` | `categories` |
//! | GET | `/recipe/{id}` | `recipe` |
//! | POST | `/search` | `search` |
//! | GET | `/explore-latest` | `explore-latest` |
//! | GET | `/explore-random` | `explore-random` |
//! | GET | `/submit-recipe` | `submit-recipe` |
//! | POST | `/submit-recipe` | redirects to `GET /submit-recipe` |
//!
//!
//!
//! # Notes
//!
//! ## Ordering
//! Recipe ids are handed out by the store in increasing order. "Latest" is
//! therefore descending id, there is no timestamp field.
//!
//! ## Uploads
//! Images are written to `UPLOADS_DIR` as `<unix millis><original name>`.
//! The file is written before the recipe and removed again if the recipe
//! cannot be stored. Serving that directory is left to the reverse proxy.
//!
//! ## Categories
//! A recipe names its category. Nothing checks that the category exists.
//!
//!
//!
//! # Setup
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 RUST_LOG=info cargo run -p cooking-blog
//! ```
//!
//! Run without Redis.
//! ```sh
//! STORE=memory cargo run -p cooking-blog
//! ```
//!
//! Seed categories and recipes.
//! ```sh
//! cargo run -p seed -- data/seed.json
//! ```
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod flash;
pub mod render;
pub mod routes;
pub mod search;
pub mod state;
pub mod store;
pub mod utils;

use config::Config;
use error::StartupError;
use routes::{
    explore_categories, explore_categories_by_id, explore_latest, explore_random, explore_recipe,
    homepage, search_recipe, submit_recipe, submit_recipe_on_post,
};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(homepage))
        .route("/categories", get(explore_categories))
        .route("/categories/{id}", get(explore_categories_by_id))
        .route("/recipe/{id}", get(explore_recipe))
        .route("/search", post(search_recipe))
        .route("/explore-latest", get(explore_latest))
        .route("/explore-random", get(explore_random))
        .route("/submit-recipe", get(submit_recipe).post(submit_recipe_on_post))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> Result<(), StartupError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
