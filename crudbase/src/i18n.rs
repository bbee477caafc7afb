//! Phrase catalog used to localize user-facing error messages.
//!
//! Catalogs are JSON documents, one per locale (`locales/en.json`,
//! `locales/vi.json`, ...). Nested objects are flattened into dotted phrases,
//! so `{"application": {"error": {"500": "..."}}}` answers the phrase
//! `application.error.500`. Messages may contain `{{name}}` placeholders.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

/// Phrase used when an error carries no phrase of its own.
pub const FALLBACK_PHRASE: &str = "application.error.something_went_wrong";

/// Locale used when the request does not name one.
pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone)]
pub struct I18n {
    default_locale: String,
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

impl I18n {
    /// Empty catalog; every lookup returns the phrase itself.
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            catalogs: HashMap::new(),
        }
    }

    /// Load every `*.json` file in `dir`, using the file stem as locale.
    pub fn load_dir(dir: impl AsRef<Path>, default_locale: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut i18n = Self::new(default_locale);

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read locales directory {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            i18n.add_json(locale, &content)
                .with_context(|| format!("Invalid locale file {}", path.display()))?;
        }

        debug!(
            locales = ?i18n.catalogs.keys().collect::<Vec<_>>(),
            "Loaded i18n catalogs"
        );
        Ok(i18n)
    }

    /// Merge a JSON catalog into `locale`.
    pub fn add_json(&mut self, locale: &str, json: &str) -> Result<()> {
        let value: Value = serde_json::from_str(json)?;
        let catalog = self.catalogs.entry(locale.to_string()).or_default();
        flatten_into(catalog, String::new(), &value);
        Ok(())
    }

    /// Builder form of [`add_json`](Self::add_json).
    pub fn with_json(mut self, locale: &str, json: &str) -> Result<Self> {
        self.add_json(locale, json)?;
        Ok(self)
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Look up `phrase` in `locale`, then in the default locale, and fall back
    /// to the phrase itself.
    pub fn translate(&self, phrase: &str, locale: &str) -> String {
        self.translate_with(phrase, locale, &HashMap::new())
    }

    /// Like [`translate`](Self::translate), substituting `{{key}}` placeholders.
    pub fn translate_with(
        &self,
        phrase: &str,
        locale: &str,
        replacements: &HashMap<String, String>,
    ) -> String {
        let message = self
            .lookup(locale, phrase)
            .or_else(|| self.lookup(&self.default_locale, phrase))
            .unwrap_or(phrase);

        replacements
            .iter()
            .fold(message.to_string(), |acc, (key, value)| {
                acc.replace(&format!("{{{{{}}}}}", key), value)
            })
    }

    fn lookup(&self, locale: &str, phrase: &str) -> Option<&str> {
        self.catalogs
            .get(locale)
            .and_then(|c| c.get(phrase))
            .map(String::as_str)
    }
}

fn flatten_into(catalog: &mut HashMap<String, String>, prefix: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(catalog, path, v);
            }
        }
        Value::String(s) => {
            catalog.insert(prefix, s.clone());
        }
        other => {
            catalog.insert(prefix, other.to_string());
        }
    }
}
