use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::FixtureSource;
use crate::error::AppError;

/// Fetches fixture files from a static site, e.g. `https://host/assets/data`.
pub struct HttpFixtureSource {
    client: Client,
    base_url: String,
}

impl HttpFixtureSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Fetch(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }
}

#[async_trait]
impl FixtureSource for HttpFixtureSource {
    async fn fetch(&self, name: &str) -> Result<Value, AppError> {
        let url = self.url_for(name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!("GET {} returned {}", url, response.status())));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to parse {}: {}", url, e)))
    }
}
