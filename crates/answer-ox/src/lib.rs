#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Client side of the ask pipeline: reads a streamed answer body chunk by
//! chunk, keeps the page region showing the text received so far, and swaps
//! in sanitized markdown once the body has ended.

pub mod client;
pub mod consumer;
pub mod decode;
pub mod error;
pub mod render;

pub use client::{AskClient, Picture};
pub use consumer::{AccumulatedText, StreamConsumer};
pub use decode::Utf8Decoder;
pub use error::AnswerError;
pub use render::{AnswerView, FAILURE_MESSAGE, PLACEHOLDER, Panel, Renderer, render_markdown, sanitize};
