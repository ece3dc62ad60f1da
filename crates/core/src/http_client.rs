//! JSON-over-HTTP plumbing shared by the upstream adapters.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::HttpEndpointConfig;

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum HttpCallError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl HttpCallError {
    /// Whether repeating the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpCallError::Timeout | HttpCallError::ConnectionFailed(_) => true,
            HttpCallError::Status { status, .. } => *status >= 500 || *status == 429,
            HttpCallError::InvalidResponse(_) | HttpCallError::Request(_) => false,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpCallError::Timeout
        } else if e.is_connect() {
            HttpCallError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            HttpCallError::InvalidResponse(e.to_string())
        } else {
            HttpCallError::Request(e.to_string())
        }
    }
}

/// A base URL, an optional bearer key and a client with the endpoint's timeout.
#[derive(Clone)]
pub struct JsonClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl JsonClient {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self, HttpCallError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| HttpCallError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// An empty path addresses the base URL itself.
    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpCallError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.send(self.client.get(&url)).await?;
        response.json().await.map_err(|e| {
            HttpCallError::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, HttpCallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self.send(self.client.post(&url).json(body)).await?;
        response.json().await.map_err(|e| {
            HttpCallError::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }

    /// POST and ignore the response body.
    pub async fn post_discard<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), HttpCallError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        self.send(self.client.post(&url).json(body)).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, HttpCallError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(HttpCallError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HttpCallError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: &str, api_key: Option<&str>) -> HttpEndpointConfig {
        HttpEndpointConfig {
            url: url.to_string(),
            api_key: api_key.map(String::from),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_url_joining() {
        let client = JsonClient::new(&endpoint("http://content:8000/", None)).unwrap();
        assert_eq!(client.base_url(), "http://content:8000");
        assert_eq!(client.url("/v1/articles"), "http://content:8000/v1/articles");
        assert_eq!(client.url("v1/articles"), "http://content:8000/v1/articles");
        assert_eq!(client.url(""), "http://content:8000");
    }

    #[test]
    fn test_empty_api_key_ignored() {
        let client = JsonClient::new(&endpoint("http://x", Some(""))).unwrap();
        assert!(client.api_key.is_none());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(HttpCallError::Timeout.is_retryable());
        assert!(HttpCallError::ConnectionFailed("refused".into()).is_retryable());
        assert!(HttpCallError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(HttpCallError::Status {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!HttpCallError::Status {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(!HttpCallError::InvalidResponse("bad json".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_reported() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = JsonClient::new(&endpoint("http://127.0.0.1:9", None)).unwrap();
        let result: Result<serde_json::Value, _> = client.get_json("/status").await;
        assert!(result.is_err());
    }
}
