use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreKind::Redis),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store {other:?}, expected redis or memory")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub store: StoreKind,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let redis_url: String = try_load("REDIS_URL", "redis://127.0.0.1:6379")?;

        Ok(Self {
            port: try_load("BLOG_PORT", "3000")?,
            redis_url: with_password(&redis_url, read_secret("REDIS_PASSWORD"))?,
            store: try_load("STORE", "redis")?,
            uploads_dir: try_load("UPLOADS_DIR", "public/uploads")?,
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", "10485760")?,
        })
    }

    /// Config for an in-memory server writing uploads into `uploads_dir`.
    pub fn in_memory(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            port: 0,
            redis_url: String::new(),
            store: StoreKind::Memory,
            uploads_dir: uploads_dir.into(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    parse(key, &resolve(key, env::var(key).ok(), default))
}

/// Falls back to `default`, logging the fallback once.
fn resolve(key: &str, value: Option<String>, default: &str) -> String {
    value.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            message: e.to_string(),
        }
    })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|_| {
            info!("No {secret_name} secret found");
        })
        .ok()
}

fn with_password(redis_url: &str, password: Option<String>) -> Result<String, ConfigError> {
    let Some(password) = password else {
        return Ok(redis_url.to_string());
    };

    let invalid = |message: String| ConfigError::Invalid {
        key: "REDIS_URL",
        message,
    };

    let mut url = Url::parse(redis_url).map_err(|e| invalid(e.to_string()))?;
    url.set_password(Some(&password))
        .map_err(|_| invalid("cannot carry a password".to_string()))?;

    Ok(url.to_string())
}
