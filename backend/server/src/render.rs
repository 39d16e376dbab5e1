//! Hand-off to the page renderer.
//!
//! Template rendering lives outside this crate. [`JsonRenderer`] returns the
//! view context as JSON so that any front end (or a test) can consume it.
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct View {
    pub template: &'static str,
    pub title: &'static str,
    pub context: Value,
}

impl View {
    pub fn new<T: Serialize>(
        template: &'static str,
        title: &'static str,
        context: &T,
    ) -> Result<Self, AppError> {
        Ok(Self {
            template,
            title,
            context: serde_json::to_value(context)?,
        })
    }
}

pub trait Renderer: Send + Sync {
    fn render(&self, view: View) -> Result<Response, AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, view: View) -> Result<Response, AppError> {
        let mut body = Map::new();
        body.insert("template".to_string(), Value::from(view.template));
        body.insert("title".to_string(), Value::from(view.title));

        match view.context {
            Value::Object(context) => body.extend(context),
            Value::Null => {}
            other => {
                body.insert("context".to_string(), other);
            }
        }

        Ok(Json(Value::Object(body)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_context_is_flattened() {
        let view = View::new(
            "categories",
            "Cooking Blog - Categories",
            &json!({ "categories": [] }),
        )
        .unwrap();

        assert_eq!(view.template, "categories");
        assert_eq!(view.context["categories"], json!([]));
        assert!(JsonRenderer.render(view).unwrap().status().is_success());
    }
}
