use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{header, Client};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::Value;
use std::sync::Arc;
use storechat_core::{extract_credits, ChatTurnRequest};
use tracing::debug;

use crate::auth::{Authenticator, BearerAuth, NoAuth};
use crate::backend::{ChatBackend, TurnResponse};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::stream::BodyFormat;

/// Backend reached over HTTP
pub struct HttpBackend {
    config: ClientConfig,
    client: Client,
    // Credit lookups are idempotent and safe to retry; chat turns are not,
    // since the backend charges for each one.
    credits_client: reqwest_middleware::ClientWithMiddleware,
    authenticator: Arc<dyn Authenticator>,
}

impl HttpBackend {
    pub fn new(config: ClientConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let retry_policy = ExponentialBackoff::builder()
            .base(2)
            .build_with_max_retries(3);
        let credits_client = reqwest_middleware::ClientBuilder::new(client.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            config,
            client,
            credits_client,
            authenticator,
        })
    }

    /// Backend authenticated with a bearer token
    pub fn with_bearer(config: ClientConfig, token: impl Into<String>) -> Result<Self> {
        Self::new(config, Arc::new(BearerAuth::new(token)))
    }

    /// Backend that sends no credentials
    pub fn without_auth(config: ClientConfig) -> Result<Self> {
        Self::new(config, Arc::new(NoAuth))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn build_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        if let Some((header_name, header_value)) = self.authenticator.get_auth_header().await? {
            let name = header::HeaderName::from_bytes(header_name.as_bytes())
                .map_err(|e| ClientError::Config(format!("Invalid auth header name: {}", e)))?;
            let value = header::HeaderValue::from_str(&header_value)
                .map_err(|e| ClientError::Auth(format!("Invalid auth header value: {}", e)))?;
            headers.insert(name, value);
        }

        for (key, value) in &self.config.headers {
            let header_name = header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ClientError::Config(format!("Invalid header name: {}", e)))?;
            let header_value = header::HeaderValue::from_str(value)
                .map_err(|e| ClientError::Config(format!("Invalid header value: {}", e)))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open_turn(&self, request: &ChatTurnRequest) -> Result<TurnResponse> {
        let url = self.config.chat_url();
        let headers = self.build_headers().await?;

        debug!(url = %url, history = request.chat_history.len(), "sending chat turn");
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let format = BodyFormat::from_content_type(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );
        debug!(status, ?format, "chat turn response");

        let body = response
            .bytes_stream()
            .map_err(|e| ClientError::Stream(e.to_string()))
            .boxed();

        Ok(TurnResponse::new(status, format, body))
    }

    async fn fetch_credits(&self) -> Result<Option<u64>> {
        let url = self.config.tokens_url();
        let headers = self.build_headers().await?;

        let response = self
            .credits_client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(extract_credits(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_headers() {
        let config = ClientConfig::new("http://localhost:5008/api").with_header("x-store-id", "42");
        let backend = HttpBackend::with_bearer(config, "test_token").unwrap();
        let headers = backend.build_headers().await.unwrap();

        assert_eq!(headers.get("authorization").unwrap(), "Bearer test_token");
        assert_eq!(headers.get("x-store-id").unwrap(), "42");
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_no_auth_headers() {
        let backend = HttpBackend::without_auth(ClientConfig::default()).unwrap();
        let headers = backend.build_headers().await.unwrap();
        assert!(!headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_invalid_custom_header_rejected() {
        let config = ClientConfig::default().with_header("bad header", "x");
        let backend = HttpBackend::without_auth(config).unwrap();
        assert!(matches!(
            backend.build_headers().await,
            Err(ClientError::Config(_))
        ));
    }
}
