use serde_json::Value;
use thiserror::Error;

use crate::config::RelayConfig;

/// Body shown to the client when the image of the day cannot be fetched.
pub const APOD_ERROR: &str = "Error fetching data from NASA API";

#[derive(Debug, Error)]
pub enum ApodError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("NASA API responded with status {0}")]
    Status(u16),
}

/// Fetches the astronomy picture of the day on behalf of the browser, so the
/// NASA key never leaves the server.
#[derive(Debug, Clone)]
pub struct ApodProxy {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl ApodProxy {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.apod_url.clone(), config.nasa_api_key.clone())
    }

    /// Asks for one random entry and returns the document untouched.
    pub async fn fetch(&self) -> Result<Value, ApodError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("api_key", self.api_key.as_str()), ("count", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApodError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}
