//! # One-shot notices
//!
//! Submission results travel to the next `GET /submit-recipe` in a cookie.
//! The form handler reads it once and expires it in the same response, so
//! nothing is kept on the server.
//!
//! Cookie value: form-urlencoded pairs, `error=<message>` or `info=<message>`.
use axum::http::{HeaderMap, header::COOKIE};
use serde::Serialize;
use url::form_urlencoded;

pub const FLASH_COOKIE: &str = "flash";
pub const FLASH_PATH: &str = "/submit-recipe";

const ERROR_KEY: &str = "error";
const INFO_KEY: &str = "info";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Notices {
    pub errors: Vec<String>,
    pub submitted: Vec<String>,
}

impl Notices {
    pub fn errors(messages: Vec<String>) -> Self {
        Self {
            errors: messages,
            submitted: Vec::new(),
        }
    }

    pub fn submitted(message: impl Into<String>) -> Self {
        Self {
            errors: Vec::new(),
            submitted: vec![message.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.submitted.is_empty()
    }

    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        for message in &self.errors {
            serializer.append_pair(ERROR_KEY, message);
        }
        for message in &self.submitted {
            serializer.append_pair(INFO_KEY, message);
        }

        serializer.finish()
    }

    pub fn decode(value: &str) -> Self {
        let mut notices = Notices::default();

        for (key, message) in form_urlencoded::parse(value.as_bytes()) {
            match key.as_ref() {
                ERROR_KEY => notices.errors.push(message.into_owned()),
                INFO_KEY => notices.submitted.push(message.into_owned()),
                _ => {}
            }
        }

        notices
    }

    /// Notices carried by the request's flash cookie, empty if there is none.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == FLASH_COOKIE)
            .map(|(_, value)| Self::decode(value))
            .unwrap_or_default()
    }

    pub fn set_cookie(&self) -> String {
        format!(
            "{FLASH_COOKIE}={}; Path={FLASH_PATH}; HttpOnly; SameSite=Lax",
            self.encode()
        )
    }

    pub fn clear_cookie() -> String {
        format!("{FLASH_COOKIE}=; Path={FLASH_PATH}; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}
