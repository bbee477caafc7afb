//! Per-request context shared by resolvers.

use async_graphql::Context;
use reqwest::header::HeaderMap;

use crate::i18n::DEFAULT_LOCALE;
use crate::utils::accept_language;

/// Header carrying the token of service-to-service calls.
pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// Request data put into the schema context by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphqlContext {
    pub lang: Option<String>,
    /// Timezone of the requesting user
    pub timezone: Option<String>,
    pub uid: Option<String>,
    pub oid: Option<String>,
    pub sid: Option<String>,
    pub internal_token: Option<String>,
}

impl GraphqlContext {
    /// Language from `Accept-Language` and the internal token from
    /// `x-service-token`. Identity fields are left for the auth layer.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            lang: Some(accept_language(headers).to_string()),
            internal_token: headers
                .get(SERVICE_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            ..Self::default()
        }
    }

    /// Language used for error messages.
    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or(DEFAULT_LOCALE)
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }
}

/// Extension trait to read the request context from the GraphQL context
pub trait GraphqlContextExt {
    /// The request context, or an empty one when the server did not set it.
    fn request_context(&self) -> GraphqlContext;
}

impl<'a> GraphqlContextExt for Context<'a> {
    fn request_context(&self) -> GraphqlContext {
        self.data_opt::<GraphqlContext>().cloned().unwrap_or_default()
    }
}
