//! HTTP transport using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{FetchError, Transport};

/// Transport that talks to the backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a new builder for configuring the transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        Self::read_body(response).await
    }

    async fn post(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.post(self.url(path)).send().await?;
        Self::read_body(response).await
    }
}

/// Builder for HttpTransport.
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTransportBuilder {
    /// Set the backend base URL (e.g., "http://homeassistant.local:5000").
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport, FetchError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| "http://localhost:5000".to_string());

        Ok(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}
