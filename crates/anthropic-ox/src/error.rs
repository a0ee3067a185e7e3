use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categorizes errors by cause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limiting
    RateLimit,
    /// Authentication/authorization issues
    Auth,
    /// Invalid request format
    InvalidRequest,
    /// Server overloaded
    ServerOverloaded,
    /// Network/connection issues
    Network,
    /// API temporarily unavailable
    ServiceUnavailable,
    /// Malformed stream or anything else
    Other,
}

/// Error payload carried by an SSE `error` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub r#type: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Error)]
pub enum AnthropicRequestError {
    /// Errors from the HTTP client
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error("Invalid request error: {message}")]
    InvalidRequestError {
        message: String,
        param: Option<String>,
        code: Option<String>,
    },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("API overloaded: {0}")]
    Overloaded(String),

    #[error("API error: {0}")]
    Generic(String),

    #[error("Unexpected response from API: {0}")]
    UnexpectedResponse(String),

    /// Invalid event data in stream
    #[error("Invalid event data: {0}")]
    InvalidEventData(String),
}

impl AnthropicRequestError {
    /// Returns the error kind for categorizing errors
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimit => ErrorKind::RateLimit,
            Self::Authentication(_) | Self::PermissionDenied(_) => ErrorKind::Auth,
            Self::InvalidRequestError { .. } | Self::NotFound(_) => ErrorKind::InvalidRequest,
            Self::Overloaded(_) => ErrorKind::ServerOverloaded,
            Self::ReqwestError(e) => {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    ErrorKind::Network
                } else {
                    ErrorKind::Other
                }
            }
            Self::Generic(_) | Self::UnexpectedResponse(_) => ErrorKind::ServiceUnavailable,
            Self::SerdeError(_) | Self::InvalidEventData(_) => ErrorKind::Other,
        }
    }

    /// Whether a caller could reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimit
                | ErrorKind::ServerOverloaded
                | ErrorKind::Network
                | ErrorKind::ServiceUnavailable
        )
    }
}

impl From<ErrorInfo> for AnthropicRequestError {
    fn from(error: ErrorInfo) -> Self {
        from_typed(Some(error.r#type.as_str()), error.message, None, None)
    }
}

fn from_typed(
    kind: Option<&str>,
    message: String,
    param: Option<String>,
    code: Option<String>,
) -> AnthropicRequestError {
    match kind {
        Some("invalid_request_error") => AnthropicRequestError::InvalidRequestError {
            message,
            param,
            code,
        },
        Some("authentication_error") => AnthropicRequestError::Authentication(message),
        Some("permission_error") => AnthropicRequestError::PermissionDenied(message),
        Some("not_found_error") => AnthropicRequestError::NotFound(message),
        Some("rate_limit_error") => AnthropicRequestError::RateLimit,
        Some("api_error") => AnthropicRequestError::Generic(message),
        Some("overloaded_error") => AnthropicRequestError::Overloaded(message),
        _ => AnthropicRequestError::UnexpectedResponse(message),
    }
}

/// Parse an error response from the Anthropic API.
/// Handles both JSON format errors and plain text errors.
pub fn parse_error_response(status: reqwest::StatusCode, bytes: &[u8]) -> AnthropicRequestError {
    if let Ok(payload) = serde_json::from_slice::<ApiErrorResponse>(bytes) {
        let ApiErrorDetail {
            message,
            r#type,
            param,
            code,
        } = payload.error;
        return from_typed(r#type.as_deref(), message, param, code);
    }

    let error_text = String::from_utf8_lossy(bytes).to_string();
    match status.as_u16() {
        429 => AnthropicRequestError::RateLimit,
        401 => AnthropicRequestError::Authentication(error_text),
        403 => AnthropicRequestError::PermissionDenied(error_text),
        404 => AnthropicRequestError::NotFound(error_text),
        529 => AnthropicRequestError::Overloaded(error_text),
        _ => AnthropicRequestError::UnexpectedResponse(format!(
            "HTTP status {}: {}",
            status.as_u16(),
            error_text
        )),
    }
}
