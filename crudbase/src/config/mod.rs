//! Configuration loaded from environment variables (and `.env` via dotenvy).

use std::env;

use anyhow::{Context, Result};

use crate::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuration shared by services built on crudbase
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,

    /// Maximum pooled connections
    pub database_max_connections: u32,

    /// Page size used when a list request does not ask for a positive one
    pub default_page_size: i64,

    /// Upper bound for any requested page size
    pub max_page_size: i64,

    /// Base URL of the sibling service called by [`ExternalService`](crate::external::ExternalService)
    pub service_domain: Option<String>,

    /// Token sent as `x-service-token` on service-to-service calls
    pub service_token: Option<String>,

    /// Directory holding `<locale>.json` phrase catalogs
    pub locales_dir: String,

    /// Locale used when a request does not name one
    pub default_locale: String,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/crudbase.db".to_string(),
            database_max_connections: 10,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            service_domain: None,
            service_token: None,
            locales_dir: "./locales".to_string(),
            default_locale: "en".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let default_page_size =
            positive(&lookup, "DEFAULT_PAGE_SIZE", defaults.default_page_size)?;
        let max_page_size = positive(&lookup, "MAX_PAGE_SIZE", defaults.max_page_size)?;

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("Invalid DATABASE_MAX_CONNECTIONS")?,
            None => defaults.database_max_connections,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => anyhow::bail!("Invalid LOG_FORMAT '{}': expected 'pretty' or 'json'", other),
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections,
            default_page_size,
            max_page_size,
            service_domain: lookup("SERVICE_DOMAIN"),
            service_token: lookup("X_SERVICE_TOKEN"),
            locales_dir: lookup("LOCALES_DIR").unwrap_or(defaults.locales_dir),
            default_locale: lookup("DEFAULT_LOCALE").unwrap_or(defaults.default_locale),
            log_format,
        })
    }
}

/// Parse a page size. Zero or negative sizes would disable the page bound.
fn positive<F>(lookup: &F, key: &str, default: i64) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value: i64 = raw.parse().with_context(|| format!("Invalid {}", key))?;
    if value <= 0 {
        anyhow::bail!("Invalid {} '{}': must be a positive integer", key, value);
    }
    Ok(value)
}
