//! Client for service-to-service calls.
//!
//! Every call is a JSON `POST {domain}{path}` authenticated with the
//! `x-service-token` header.

use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, ErrorCode, Result};
use crate::graphql::SERVICE_TOKEN_HEADER;
use crate::utils::format_url;

/// Response of [`ExternalService::fetch_data`]. `status` is true only for
/// HTTP 200, in which case `data` holds the decoded body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult<T> {
    pub data: Option<T>,
    pub status: bool,
}

#[derive(Debug, Serialize)]
struct EventPayload<'a, T: Serialize> {
    event_name: &'a str,
    target: &'a T,
}

/// Base client for a sibling service
#[derive(Debug, Clone)]
pub struct ExternalService {
    domain: String,
    token: Option<String>,
    client: Client,
}

impl ExternalService {
    pub fn new(domain: impl Into<String>, token: Option<String>) -> Self {
        Self {
            domain: domain.into(),
            token,
            client: Client::new(),
        }
    }

    /// Domain from `SERVICE_DOMAIN`, token from `X_SERVICE_TOKEN`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.service_domain.clone().unwrap_or_default(),
            config.service_token.clone(),
        )
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// POST `payload` to `path`.
    ///
    /// Fails with `INTERNAL_SERVER_ERROR` before any request when the URL is
    /// invalid. Non-200 responses are reported through `status`; transport
    /// and decoding errors are returned.
    pub async fn fetch_data<T, P>(&self, path: &str, payload: Option<&P>) -> Result<FetchResult<T>>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let url = format_url(&format!("{}{}", self.domain, path)).ok_or_else(|| {
            warn!(domain = %self.domain, path = %path, "Invalid external service URL");
            Error::custom(ErrorCode::InternalServerError, "application.error.500")
        })?;

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(ref token) = self.token {
            request = request.header(SERVICE_TOKEN_HEADER, token);
        }
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url = %url, status = %status, "External service responded");

        if status != reqwest::StatusCode::OK {
            return Ok(FetchResult {
                data: None,
                status: false,
            });
        }

        Ok(FetchResult {
            data: Some(response.json().await?),
            status: true,
        })
    }

    /// POST `/health-check`; true on HTTP 200.
    pub async fn health_check(&self) -> Result<bool> {
        let result = self
            .fetch_data::<serde_json::Value, ()>("/health-check", None)
            .await?;
        Ok(result.status)
    }

    /// POST `/hook/event` with `{ event_name, target }`.
    pub async fn emit_event<T: Serialize>(&self, event_name: &str, target: &T) -> Result<bool> {
        let payload = EventPayload { event_name, target };
        let result = self
            .fetch_data::<serde_json::Value, _>("/hook/event", Some(&payload))
            .await?;
        Ok(result.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_invalid_url_fails_before_request() {
        let service = ExternalService::new("not a domain", None);
        let err = service.health_check().await.unwrap_err();

        assert_matches!(
            err,
            Error::Custom(ref e) if e.code == ErrorCode::InternalServerError
                && e.message == "application.error.500"
        );
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_lookup(|key| match key {
            "SERVICE_DOMAIN" => Some("http://users:4000".to_string()),
            "X_SERVICE_TOKEN" => Some("token".to_string()),
            _ => None,
        })
        .unwrap();

        let service = ExternalService::from_config(&config);
        assert_eq!(service.domain(), "http://users:4000");
        assert_eq!(service.token.as_deref(), Some("token"));
    }
}
