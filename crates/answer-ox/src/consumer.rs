use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::decode::Utf8Decoder;
use crate::error::{AnswerError, BoxError};
use crate::render::{AnswerView, Renderer};

/// The answer text received so far. Only ever grows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccumulatedText(String);

impl AccumulatedText {
    pub fn push(&mut self, piece: &str) {
        self.0.push_str(piece);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Reads one response body to its end. Owns the text and the decoder state
/// for that body alone, both dropped when [`StreamConsumer::run`] returns.
#[derive(Debug, Default)]
pub struct StreamConsumer {
    text: AccumulatedText,
    decoder: Utf8Decoder,
}

impl StreamConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulls chunks one at a time, pushing the full text so far to the
    /// renderer after each one that decoded to something. A clean end hands
    /// the final text to [`Renderer::finish`]; a failed read goes to
    /// [`Renderer::fail`] and is not retried.
    pub async fn run<S, E, V>(mut self, body: S, renderer: &mut Renderer<V>) -> Result<(), AnswerError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
        V: AnswerView,
    {
        let mut body = std::pin::pin!(body);
        let mut chunks = 0usize;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let err = err.into();
                    tracing::warn!(chunks, received = self.text.as_str().len(), error = %err, "answer stream broke");
                    renderer.fail();
                    return Err(AnswerError::Body(err));
                }
            };
            chunks += 1;

            let piece = self.decoder.decode(&chunk);
            if piece.is_empty() {
                continue;
            }
            self.text.push(&piece);
            renderer.update(self.text.as_str());
        }

        let tail = self.decoder.finish();
        if !tail.is_empty() {
            self.text.push(&tail);
            renderer.update(self.text.as_str());
        }

        tracing::debug!(chunks, received = self.text.as_str().len(), "answer stream ended");
        renderer.finish(self.text.into_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{FAILURE_MESSAGE, Panel, Phase};
    use futures_util::stream;

    fn ok(bytes: &'static [u8]) -> Result<Bytes, std::io::Error> {
        Ok(Bytes::from_static(bytes))
    }

    #[tokio::test]
    async fn accumulated_text_passes_through_every_prefix() {
        let body = stream::iter(vec![ok(b"Hello"), ok(b" "), ok(b"world")]);
        let mut renderer = Renderer::new(Panel::new());
        renderer.begin();

        StreamConsumer::new().run(body, &mut renderer).await.unwrap();

        let panel = renderer.view();
        assert_eq!(panel.text_updates(), ["Hello", "Hello ", "Hello world"]);
        assert_eq!(panel.html(), Some("<p>Hello world</p>\n"));
        assert_eq!(renderer.phase(), Phase::Finished);
    }

    #[tokio::test]
    async fn split_character_is_not_shown_half_decoded() {
        let bytes = "né".as_bytes();
        let body = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::copy_from_slice(&bytes[..2])),
            Ok(Bytes::copy_from_slice(&bytes[2..])),
        ]);
        let mut renderer = Renderer::new(Panel::new());

        StreamConsumer::new().run(body, &mut renderer).await.unwrap();

        assert_eq!(renderer.view().text_updates(), ["n", "né"]);
    }

    #[tokio::test]
    async fn broken_body_fails_once_and_keeps_partial_text() {
        let body = stream::iter(vec![
            ok(b"partial"),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            ok(b" never shown"),
        ]);
        let mut renderer = Renderer::new(Panel::new());
        renderer.begin();

        let err = StreamConsumer::new().run(body, &mut renderer).await.unwrap_err();
        assert!(matches!(err, AnswerError::Body(_)));

        let panel = renderer.view();
        assert_eq!(panel.text(), Some("partial"));
        assert_eq!(panel.error(), Some(FAILURE_MESSAGE));
        assert_eq!(panel.html_writes(), 0);
    }

    #[tokio::test]
    async fn empty_body_finishes_with_empty_answer() {
        let body = stream::iter(Vec::<Result<Bytes, std::io::Error>>::new());
        let mut renderer = Renderer::new(Panel::new());
        renderer.begin();

        StreamConsumer::new().run(body, &mut renderer).await.unwrap();

        assert_eq!(renderer.view().html(), Some(""));
        assert_eq!(renderer.phase(), Phase::Finished);
    }
}
