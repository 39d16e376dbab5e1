use std::sync::Arc;

use axum::{
    Form,
    extract::{Multipart, Path, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use cookbook::{Category, Recipe, RecipeId};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    error::AppError,
    flash::{FLASH_PATH, Notices},
    render::View,
    search::TextQuery,
    state::AppState,
    utils::{image_name, read_submission, save_image, validate},
};

pub const HOME_LIMIT: usize = 5;
pub const LIST_LIMIT: usize = 20;

pub const SUBMITTED_MESSAGE: &str = "Recipe has been added.";
pub const SUBMIT_FAILED_MESSAGE: &str = "Recipe could not be saved.";

#[derive(Serialize)]
struct Food {
    latest: Vec<Recipe>,
    thai: Vec<Recipe>,
    american: Vec<Recipe>,
    chinese: Vec<Recipe>,
}

#[derive(Serialize)]
struct HomeContext {
    categories: Vec<Category>,
    food: Food,
}

#[derive(Serialize)]
struct CategoriesContext {
    categories: Vec<Category>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryByIdContext {
    category_by_id: Vec<Recipe>,
}

#[derive(Serialize)]
struct RecipeContext<T> {
    recipe: T,
}

#[derive(Serialize)]
struct SubmitContext {
    #[serde(rename = "infoErrorsObj")]
    errors: Vec<String>,
    #[serde(rename = "infoSubmitObj")]
    submitted: Vec<String>,
}

#[derive(Deserialize)]
pub struct SearchForm {
    #[serde(rename = "searchTerm", default)]
    search_term: String,
}

pub async fn homepage(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let categories = state.categories.list(HOME_LIMIT).await?;
    let latest = state.recipes.latest(HOME_LIMIT).await?;
    let thai = state.recipes.by_category("Thai", HOME_LIMIT).await?;
    let american = state.recipes.by_category("American", HOME_LIMIT).await?;
    let chinese = state.recipes.by_category("Chinese", HOME_LIMIT).await?;

    let context = HomeContext {
        categories,
        food: Food {
            latest,
            thai,
            american,
            chinese,
        },
    };

    state
        .renderer
        .render(View::new("index", "Cooking Blog - Home", &context)?)
}

pub async fn explore_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let categories = state.categories.list(LIST_LIMIT).await?;

    state.renderer.render(View::new(
        "categories",
        "Cooking Blog - Categories",
        &CategoriesContext { categories },
    )?)
}

pub async fn explore_categories_by_id(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Response, AppError> {
    let category_by_id = state.recipes.by_category(&category, LIST_LIMIT).await?;

    state.renderer.render(View::new(
        "categories",
        "Cooking Blog - Categories",
        &CategoryByIdContext { category_by_id },
    )?)
}

pub async fn explore_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Ok(recipe_id) = id.parse::<RecipeId>() else {
        return Err(AppError::MalformedId(id));
    };

    let recipe = state
        .recipes
        .get(recipe_id)
        .await?
        .ok_or(AppError::NotFound("Recipe not found"))?;

    state.renderer.render(View::new(
        "recipe",
        "Cooking Blog - Recipe",
        &RecipeContext { recipe },
    )?)
}

pub async fn search_recipe(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let query = TextQuery::parse(&form.search_term);
    let recipe = state.recipes.search(&query).await?;

    state.renderer.render(View::new(
        "search",
        "Cooking Blog - Search",
        &RecipeContext { recipe },
    )?)
}

pub async fn explore_latest(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let recipe = state.recipes.latest(LIST_LIMIT).await?;

    state.renderer.render(View::new(
        "explore-latest",
        "Cooking Blog - Explore Latest",
        &RecipeContext { recipe },
    )?)
}

pub async fn explore_random(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let count = state.recipes.count().await?;
    if count == 0 {
        return Err(AppError::NotFound("No recipes yet"));
    }

    let offset = fastrand::u64(0..count);
    let recipe = state
        .recipes
        .nth(offset)
        .await?
        .ok_or(AppError::NotFound("No recipes yet"))?;

    state.renderer.render(View::new(
        "explore-random",
        "Cooking Blog - Explore Random",
        &RecipeContext { recipe },
    )?)
}

pub async fn submit_recipe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let notices = Notices::from_headers(&headers);

    let page = state.renderer.render(View::new(
        "submit-recipe",
        "Cooking Blog - Submit Recipe",
        &SubmitContext {
            errors: notices.errors,
            submitted: notices.submitted,
        },
    )?)?;

    Ok((AppendHeaders([(SET_COOKIE, Notices::clear_cookie())]), page))
}

pub async fn submit_recipe_on_post(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let notices = match submit(&state, multipart).await {
        Ok(recipe) => {
            info!(id = %recipe.id, name = %recipe.name, "Recipe added");
            Notices::submitted(SUBMITTED_MESSAGE)
        }
        Err(AppError::Invalid(problems)) => {
            info!("Rejected recipe submission: {}", problems.join(", "));
            Notices::errors(problems)
        }
        Err(e) if e.status().is_client_error() => {
            warn!("Rejected recipe submission: {e}");
            Notices::errors(vec![e.public_message()])
        }
        Err(e) => {
            error!("Recipe submission failed: {e}");
            Notices::errors(vec![SUBMIT_FAILED_MESSAGE.to_string()])
        }
    };

    (
        AppendHeaders([(SET_COOKIE, notices.set_cookie())]),
        Redirect::to(FLASH_PATH),
    )
}

/// Writes the upload (if any) before the record and removes it again when
/// the record cannot be stored.
async fn submit(state: &AppState, multipart: Multipart) -> Result<Recipe, AppError> {
    let submission = read_submission(multipart).await?;
    let mut recipe = submission.recipe;
    validate(&recipe)?;

    let written = match submission.image {
        None => {
            info!("No image uploaded");
            None
        }
        Some(upload) => {
            let name = image_name(Utc::now().timestamp_millis(), &upload.file_name)
                .ok_or_else(|| AppError::Invalid(vec!["image file name is invalid".to_string()]))?;

            let path = save_image(&state.config.uploads_dir, &name, &upload.bytes).await?;
            recipe.image = Some(name);
            Some(path)
        }
    };

    match state.recipes.insert(recipe).await {
        Ok(recipe) => Ok(recipe),
        Err(e) => {
            if let Some(path) = written {
                if let Err(remove_error) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove {}: {remove_error}", path.display());
                }
            }

            Err(e.into())
        }
    }
}
