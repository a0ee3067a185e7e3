use std::time::Duration;

use anthropic_ox::AnthropicRequestError;
use http::StatusCode;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Body shown to the client for anything that fails before streaming starts.
pub const PROCESSING_ERROR: &str = "Error processing request";

/// A required field of the ask body is missing or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Question is required")]
    MissingQuestion,
    #[error("Image is required")]
    MissingImage,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport, status or framing failure of the Messages API
    #[error(transparent)]
    Api(#[from] AnthropicRequestError),

    /// Failure reported by a source other than the Messages API
    #[error("upstream failed: {0}")]
    Source(String),
}

impl UpstreamError {
    /// Whether the same ask could succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(err) => err.is_retryable(),
            Self::Source(_) => false,
        }
    }
}

/// Everything that can go wrong before the first byte of an answer is sent.
#[derive(Debug, Error)]
pub enum AskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("could not read request body: {0}")]
    Body(#[source] BoxError),

    #[error("upstream stream could not be opened: {0}")]
    UpstreamOpen(#[source] UpstreamError),
}

impl AskError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MalformedBody(_) | Self::Body(_) | Self::UpstreamOpen(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// What the client gets to see. Only validation failures name a cause.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            _ => PROCESSING_ERROR.to_string(),
        }
    }
}

/// Why an answer body was cut off instead of closed.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream failed mid-stream: {0}")]
    Upstream(#[source] UpstreamError),

    #[error("answer exceeded the {0:?} stream limit")]
    TimedOut(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_validation_errors_are_client_errors() {
        let missing = AskError::from(ValidationError::MissingImage);
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.public_message(), "Image is required");

        let malformed = AskError::MalformedBody("expected value at line 1 column 1".into());
        assert_eq!(malformed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(malformed.public_message(), PROCESSING_ERROR);

        let open = AskError::UpstreamOpen(UpstreamError::Api(AnthropicRequestError::RateLimit));
        assert_eq!(open.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(open.public_message(), PROCESSING_ERROR);
    }

    #[test]
    fn retryable_follows_the_api_error() {
        assert!(UpstreamError::Api(AnthropicRequestError::Overloaded("busy".into())).is_retryable());
        assert!(!UpstreamError::Api(AnthropicRequestError::Authentication("bad key".into())).is_retryable());
        assert!(!UpstreamError::Source("gone".into()).is_retryable());
    }
}
