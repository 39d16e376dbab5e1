use std::path::{Path, PathBuf};

use axum::{
    body::Bytes,
    extract::{Multipart, multipart::Field},
};
use cookbook::NewRecipe;
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};

use crate::error::AppError::{self, Invalid, MalformedPayload};

pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

pub struct Submission {
    pub recipe: NewRecipe,
    pub image: Option<ImageUpload>,
}

pub async fn read_submission(mut multipart: Multipart) -> Result<Submission, AppError> {
    let mut recipe = NewRecipe::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| MalformedPayload)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "name" => recipe.name = text(field).await?,
            "description" => recipe.description = text(field).await?,
            "email" => recipe.email = text(field).await?,
            "category" => recipe.category = text(field).await?,
            "ingredients" => {
                let ingredient = text(field).await?;
                if !ingredient.is_empty() {
                    recipe.ingredients.push(ingredient);
                }
            }
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(|_| MalformedPayload)?;

                if !file_name.is_empty() && !bytes.is_empty() {
                    image = Some(ImageUpload { file_name, bytes });
                }
            }
            other => {
                debug!("Ignoring unknown submission field {other}");
            }
        }
    }

    Ok(Submission { recipe, image })
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    let value = field.text().await.map_err(|_| MalformedPayload)?;

    Ok(value.trim().to_string())
}

pub fn validate(recipe: &NewRecipe) -> Result<(), AppError> {
    let mut problems = Vec::new();

    for (field, value) in [
        ("name", &recipe.name),
        ("description", &recipe.description),
        ("email", &recipe.email),
        ("category", &recipe.category),
    ] {
        if value.trim().is_empty() {
            problems.push(format!("{field} is required"));
        }
    }

    if recipe.ingredients.is_empty() {
        problems.push("at least one ingredient is required".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Invalid(problems))
    }
}

/// Stored name for an upload: the upload time in unix millis followed by the
/// original file name, stripped of any directory part.
pub fn image_name(timestamp_millis: i64, original: &str) -> Option<String> {
    let base = original.rsplit(['/', '\\']).next()?.trim();

    if base.is_empty() || base == "." || base == ".." {
        return None;
    }

    Some(format!("{timestamp_millis}{base}"))
}

/// Writes a new file, failing with `AlreadyExists` rather than replacing one
/// another submission owns.
pub async fn save_image(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(name);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;

    if let Err(e) = write_all(&mut file, bytes).await {
        drop(file);
        if let Err(remove_error) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove partial upload {}: {remove_error}", path.display());
        }
        return Err(e);
    }

    Ok(path)
}

async fn write_all(file: &mut File, bytes: &[u8]) -> Result<(), std::io::Error> {
    file.write_all(bytes).await?;
    file.flush().await
}
