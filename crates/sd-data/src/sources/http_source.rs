//! HTTP analytics provider

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::debug;

use super::AnalyticsProvider;
use crate::config::ProviderConfig;
use crate::DataError;

/// Provider reached over HTTP
pub struct HttpProvider {
    client: Client,
    base_url: Url,
    name: String,
}

impl HttpProvider {
    /// Create a new HTTP provider
    pub fn new(config: &ProviderConfig) -> Result<Self, DataError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DataError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        // Paths are joined relative to the base, so it must end with '/'
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            name: base_url.to_string(),
            base_url,
        })
    }

    fn resolve(&self, path: &str) -> Result<Url, DataError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| DataError::Configuration(format!("cannot resolve {}: {}", path, e)))
    }

    async fn read(path: &str, response: Result<Response, reqwest::Error>) -> Result<Value, DataError> {
        let response = response.map_err(|e| DataError::Fetch {
            path: path.to_string(),
            status: e.status().map(|s| s.as_u16()),
            body: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| DataError::Fetch {
            path: path.to_string(),
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(DataError::Fetch {
                path: path.to_string(),
                status: Some(status.as_u16()),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| DataError::Parse(format!("{} returned invalid JSON: {}", path, e)))
    }
}

#[async_trait]
impl AnalyticsProvider for HttpProvider {
    async fn post_json(&self, path: &str, body: Value) -> Result<Value, DataError> {
        let url = self.resolve(path)?;
        debug!(%url, "POST");
        let response = self.client.post(url).json(&body).send().await;
        Self::read(path, response).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, DataError> {
        let url = self.resolve(path)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await;
        Self::read(path, response).await
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
