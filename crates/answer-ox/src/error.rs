use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum AnswerError {
    /// Rejected locally, nothing was sent
    #[error("question must not be empty")]
    EmptyQuestion,

    /// The request never got a response
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The server answered, but not with a stream
    #[error("server answered HTTP {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status { status: u16, message: Option<String> },

    /// The body ended abnormally after streaming had begun
    #[error("answer stream broke: {0}")]
    Body(#[source] BoxError),

    #[error("image-of-the-day response held no entries")]
    NoPicture,
}
