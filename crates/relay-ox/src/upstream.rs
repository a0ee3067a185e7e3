//! The seam between the relay and whatever produces answer text.

use anthropic_ox::{Anthropic, AnthropicRequestError, ChatRequest, StreamEvent, message::Message};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::config::RelayConfig;
use crate::error::UpstreamError;
use crate::validate::AskRequest;

/// One element of an upstream answer stream. The relay forwards text and
/// drops everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    TextDelta(String),
    Other,
}

pub type ModelEvents = BoxStream<'static, Result<ModelEvent, UpstreamError>>;

#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Starts one answer. An `Err` here means nothing was streamed; errors
    /// inside the returned stream happened after streaming began.
    async fn open(&self, ask: &AskRequest) -> Result<ModelEvents, UpstreamError>;
}

/// Answers with Claude through the Messages streaming API.
#[derive(Debug, Clone)]
pub struct ClaudeSource {
    client: Anthropic,
    model: String,
    max_tokens: u32,
}

impl ClaudeSource {
    pub fn new(client: Anthropic, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        let client = Anthropic::builder()
            .api_key(config.anthropic_key.clone())
            .base_url(config.anthropic_base_url.clone())
            .build();
        Self::new(client, config.model.clone(), config.max_output_tokens)
    }

    fn request(&self, ask: &AskRequest) -> ChatRequest {
        ChatRequest::builder()
            .model(self.model.clone())
            .max_tokens(self.max_tokens)
            .message(Message::about_image(ask.image_url.clone(), ask.question.clone()))
            .build()
            .streaming()
    }
}

fn to_model_event(event: StreamEvent) -> Result<ModelEvent, UpstreamError> {
    if let StreamEvent::Error { error } = event {
        return Err(AnthropicRequestError::from(error).into());
    }
    Ok(event
        .text_delta()
        .map_or(ModelEvent::Other, |text| ModelEvent::TextDelta(text.to_owned())))
}

#[async_trait]
impl ModelSource for ClaudeSource {
    async fn open(&self, ask: &AskRequest) -> Result<ModelEvents, UpstreamError> {
        let events = self.client.open_stream(&self.request(ask)).await?;

        Ok(events
            .map(|event| event.map_err(UpstreamError::from).and_then(to_model_event))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthropic_ox::error::ErrorInfo;
    use anthropic_ox::response::{ContentBlockDelta, MessageDelta, StopReason};

    #[test]
    fn only_text_deltas_become_text() {
        let text = StreamEvent::ContentBlockDelta {
            index: 0,
            delta: ContentBlockDelta::TextDelta {
                text: "Hello".to_string(),
            },
        };
        assert_eq!(to_model_event(text).unwrap(), ModelEvent::TextDelta("Hello".to_string()));

        let json = StreamEvent::ContentBlockDelta {
            index: 1,
            delta: ContentBlockDelta::InputJsonDelta {
                partial_json: "{".to_string(),
            },
        };
        assert_eq!(to_model_event(json).unwrap(), ModelEvent::Other);
        assert_eq!(to_model_event(StreamEvent::Ping).unwrap(), ModelEvent::Other);
        assert_eq!(to_model_event(StreamEvent::Unknown).unwrap(), ModelEvent::Other);
    }

    #[test]
    fn unknown_stop_reason_is_not_a_failure() {
        let event = StreamEvent::MessageDelta {
            delta: MessageDelta {
                stop_reason: Some(StopReason::Unknown),
                stop_sequence: None,
            },
            usage: None,
        };
        assert_eq!(to_model_event(event).unwrap(), ModelEvent::Other);
    }

    #[test]
    fn error_event_is_a_stream_failure() {
        let event = StreamEvent::Error {
            error: ErrorInfo {
                r#type: "overloaded_error".to_string(),
                message: "Overloaded".to_string(),
            },
        };
        assert!(matches!(
            to_model_event(event),
            Err(UpstreamError::Api(AnthropicRequestError::Overloaded(_)))
        ));
    }

    #[test]
    fn request_is_a_single_multimodal_turn() {
        let source = ClaudeSource::new(Anthropic::new("key"), "claude-test", 256);
        let request = source.request(&AskRequest {
            question: "What is this?".to_string(),
            image_url: "https://example.com/a.jpg".to_string(),
        });

        assert_eq!(request.model, "claude-test");
        assert_eq!(request.max_tokens, 256);
        assert_eq!(request.stream, Some(true));
        assert_eq!(request.messages, vec![Message::about_image("https://example.com/a.jpg", "What is this?")]);
    }
}
