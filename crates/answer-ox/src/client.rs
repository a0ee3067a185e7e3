use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::consumer::StreamConsumer;
use crate::error::AnswerError;
use crate::render::{AnswerView, Renderer};

const ASK_URL: &str = "api/ask";
const APOD_URL: &str = "api/apod";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AskBody<'a> {
    question: &'a str,
    image_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// One entry of the image-of-the-day document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Picture {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
}

/// Talks to a running relay the way the page script does.
#[derive(Debug, Clone, Builder)]
pub struct AskClient {
    #[builder(into)]
    base_url: String,
    #[builder(default)]
    client: reqwest::Client,
}

impl AskClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder().base_url(base_url).build()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Asks `question` about the image at `image_url` and streams the answer
    /// into `renderer`. Every failure after the placeholder went up is also
    /// reported to the renderer, so the view never stays on "Thinking...".
    pub async fn ask<V: AnswerView>(
        &self,
        question: &str,
        image_url: &str,
        renderer: &mut Renderer<V>,
    ) -> Result<(), AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }

        renderer.begin();

        let response = match self
            .client
            .post(self.url(ASK_URL))
            .json(&AskBody {
                question,
                image_url,
            })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "ask request failed");
                renderer.fail();
                return Err(err.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            // best effort, the view only ever shows the fixed message
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .map(|body| body.error);
            tracing::warn!(%status, ?message, "ask rejected");
            renderer.fail();
            return Err(AnswerError::Status {
                status: status.as_u16(),
                message,
            });
        }

        StreamConsumer::new()
            .run(response.bytes_stream(), renderer)
            .await
    }

    /// Fetches the current image-of-the-day entry through the relay.
    pub async fn picture(&self) -> Result<Picture, AnswerError> {
        let response = self.client.get(self.url(APOD_URL)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .map(|body| body.error);
            return Err(AnswerError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let pictures: Vec<Picture> = response.json().await?;
        pictures.into_iter().next().ok_or(AnswerError::NoPicture)
    }
}
