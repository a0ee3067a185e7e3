#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

pub mod error;
pub mod message;
pub mod model;
pub mod request;
pub mod response;
pub mod sse;

// Re-export main types
pub use error::AnthropicRequestError;
pub use model::Model;
pub use request::ChatRequest;
pub use response::StreamEvent;

use bon::Builder;
use core::fmt;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::collections::HashMap;

const BASE_URL: &str = "https://api.anthropic.com";
const CHAT_URL: &str = "v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Events of one opened completion stream. Items that are `Err` happened after
/// the upstream accepted the request.
pub type EventStream = BoxStream<'static, Result<StreamEvent, AnthropicRequestError>>;

#[derive(Clone, Builder)]
pub struct Anthropic {
    #[builder(into)]
    pub(crate) api_key: String,
    #[builder(default)]
    pub(crate) client: reqwest::Client,
    #[builder(default = BASE_URL.to_string(), into)]
    pub(crate) base_url: String,
    #[builder(default = API_VERSION.to_string(), into)]
    pub(crate) api_version: String,
    #[builder(default)]
    pub(crate) headers: HashMap<String, String>,
}

impl Anthropic {
    /// Create a new Anthropic client with the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    pub fn load_from_env() -> Result<Self, std::env::VarError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")?;
        Ok(Self::builder().api_key(api_key).build())
    }

    /// Add a custom header to every request
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    fn build_request(&self, request: &ChatRequest) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), CHAT_URL);

        let mut req = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(request);

        for (key, value) in &self.headers {
            req = req.header(key, value);
        }

        req
    }

    /// Opens a streaming completion.
    ///
    /// Resolves once the upstream has answered with a success status, so a
    /// rejected key, an unreachable host or a malformed request all surface
    /// here as `Err` and never as a stream item. Whatever goes wrong after
    /// that is yielded from the returned stream, which then ends.
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<EventStream, AnthropicRequestError> {
        let mut request_data = request.clone();
        request_data.stream = Some(true);

        let response = self.build_request(&request_data).send().await?;
        let status = response.status();

        if !status.is_success() {
            let bytes = response.bytes().await?;
            return Err(error::parse_error_response(status, &bytes));
        }

        tracing::debug!(%status, model = %request_data.model, "upstream stream opened");

        let mut byte_stream = response.bytes_stream();

        Ok(Box::pin(async_stream::try_stream! {
            let mut decoder = sse::SseDecoder::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk?;
                for payload in decoder.feed(&chunk)? {
                    yield serde_json::from_str::<StreamEvent>(&payload)
                        .map_err(|e| AnthropicRequestError::InvalidEventData(e.to_string()))?;
                }
            }

            if let Some(payload) = decoder.finish()? {
                yield serde_json::from_str::<StreamEvent>(&payload)
                    .map_err(|e| AnthropicRequestError::InvalidEventData(e.to_string()))?;
            }
        }))
    }
}

impl fmt::Debug for Anthropic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anthropic")
            .field("api_key", &"[REDACTED]")
            .field("client", &self.client)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
