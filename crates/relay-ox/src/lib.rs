#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Server side of the ask pipeline: validates a question about an image,
//! opens a streaming answer upstream and forwards its text to the browser as
//! a chunked response body.

pub mod apod;
pub mod config;
pub mod error;
pub mod page;
pub mod relay;
pub mod server;
pub mod upstream;
pub mod validate;

pub use apod::ApodProxy;
pub use config::RelayConfig;
pub use error::{AskError, RelayError, UpstreamError, ValidationError};
pub use relay::{Outcome, RelayBody, relay};
pub use server::{AppState, handle, serve};
pub use upstream::{ClaudeSource, ModelEvent, ModelEvents, ModelSource};
pub use validate::{AskRequest, parse_ask};
