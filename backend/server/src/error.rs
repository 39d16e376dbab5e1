use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cookbook::RecipeId;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;

const GENERIC_MESSAGE: &str = "Error Occurred";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt document: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Recipe {0} is indexed but has no document")]
    MissingDocument(RecipeId),
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Malformed recipe id: {0}")]
    MalformedId(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{}", .0.join(", "))]
    Invalid(Vec<String>),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Render error: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Upload error: {0}")]
    Upload(#[from] std::io::Error),
}

impl AppError {
    /// Message that is safe to show to the visitor.
    pub fn public_message(&self) -> String {
        match self {
            AppError::MalformedPayload | AppError::NotFound(_) | AppError::Invalid(_) => {
                self.to_string()
            }
            AppError::MalformedId(_)
            | AppError::Store(_)
            | AppError::Render(_)
            | AppError::Upload(_) => GENERIC_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload | AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MalformedId(_)
            | AppError::Store(_)
            | AppError::Render(_)
            | AppError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_do_not_leak() {
        let err = AppError::MalformedId("abc".to_string());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), GENERIC_MESSAGE);

        let err = AppError::Store(StoreError::MissingDocument(RecipeId(3)));
        assert_eq!(err.public_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_validation_messages_are_public() {
        let err = AppError::Invalid(vec![
            "name is required".to_string(),
            "email is required".to_string(),
        ]);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "name is required, email is required");
    }
}
