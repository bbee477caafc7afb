//! Conversion of application errors into GraphQL errors.

use std::collections::HashMap;

use async_graphql::ErrorExtensions;

use crate::error::{Error, ErrorCode};
use crate::i18n::{DEFAULT_LOCALE, FALLBACK_PHRASE, I18n};

/// Translation request for [`generate_graphql_error`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct I18nSpec {
    /// Defaults to `application.error.something_went_wrong`
    pub phrase: Option<String>,
    /// Defaults to `en`
    pub locale: Option<String>,
    pub replacements: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlErrorSpec {
    /// Raw message, used when `i18n` is not set
    pub message: Option<String>,
    pub code: ErrorCode,
    pub i18n: Option<I18nSpec>,
}

impl GraphqlErrorSpec {
    /// An error with a raw, untranslated message.
    pub fn message(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: Some(message.into()),
            code,
            i18n: None,
        }
    }

    /// An error whose message is the translation of `phrase`.
    pub fn phrase(phrase: impl Into<String>, locale: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: None,
            code,
            i18n: Some(I18nSpec {
                phrase: Some(phrase.into()),
                locale: Some(locale.into()),
                replacements: HashMap::new(),
            }),
        }
    }

    pub fn with_replacement(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.i18n
            .get_or_insert_with(I18nSpec::default)
            .replacements
            .insert(key.into(), value.into());
        self
    }
}

/// Build a GraphQL error with `extensions.code`.
pub fn generate_graphql_error(spec: GraphqlErrorSpec, i18n: &I18n) -> async_graphql::Error {
    let message = match spec.i18n {
        Some(config) => {
            let phrase = config
                .phrase
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| FALLBACK_PHRASE.to_string());
            let locale = config.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string());
            i18n.translate_with(&phrase, &locale, &config.replacements)
        }
        None => spec.message.unwrap_or_default(),
    };

    let code = spec.code;
    async_graphql::Error::new(message).extend_with(|_, e| e.set("code", code.as_str()))
}

/// Untranslated conversion for resolvers that do not go through the
/// combinator: `?` on a crate error keeps its code.
impl ErrorExtensions for Error {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code.as_str()))
    }
}
