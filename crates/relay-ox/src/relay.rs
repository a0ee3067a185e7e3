//! Forwards an upstream answer into a chunked HTTP body.
//!
//! A forwarding task pulls one upstream event at a time and pushes one body
//! frame per text delta into a channel of capacity one, so the upstream is
//! never read further ahead than the client can absorb. The receiving half of
//! the channel is the response body.

use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http_body_util::{BodyExt, StreamBody, combinators::BoxBody};
use hyper::body::Frame;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::RelayError;
use crate::upstream::{ModelEvent, ModelEvents};

pub type RelayBody = BoxBody<Bytes, RelayError>;

type FrameSender = mpsc::Sender<Result<Frame<Bytes>, RelayError>>;

/// How a forwarded answer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Upstream finished; the body ended cleanly after `chunks` frames.
    Closed { chunks: usize },
    /// Upstream failed or ran past the limit; the body ended with an error.
    Aborted,
    /// The client went away before the answer was complete.
    Disconnected,
}

/// Starts forwarding `events` and returns the body to respond with.
///
/// Must be called inside a tokio runtime. The handle resolves once the
/// forwarding task is done and is only useful for logging and tests.
pub fn relay(events: ModelEvents, limit: Option<Duration>) -> (RelayBody, JoinHandle<Outcome>) {
    let (tx, rx) = mpsc::channel(1);
    let task = tokio::spawn(forward(events, tx, limit));
    let frames = FlushBeforeError {
        frames: ReceiverStream::new(rx),
        held: None,
    };
    (BodyExt::boxed(StreamBody::new(frames)), task)
}

/// Delays an error frame by one poll.
///
/// hyper drops the connection as soon as the body yields an error, without
/// flushing what it has buffered. Returning `Pending` first lets it write out
/// the response head and the frames that came before the error.
struct FlushBeforeError<S> {
    frames: S,
    held: Option<RelayError>,
}

impl<S> Stream for FlushBeforeError<S>
where
    S: Stream<Item = Result<Frame<Bytes>, RelayError>> + Unpin,
{
    type Item = Result<Frame<Bytes>, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(err) = self.held.take() {
            return Poll::Ready(Some(Err(err)));
        }

        match ready!(self.frames.poll_next_unpin(cx)) {
            Some(Err(err)) => {
                self.held = Some(err);
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            other => Poll::Ready(other),
        }
    }
}

async fn forward(mut events: ModelEvents, tx: FrameSender, limit: Option<Duration>) -> Outcome {
    let outcome = match limit {
        None => pump(&mut events, &tx).await,
        Some(limit) => match tokio::time::timeout(limit, pump(&mut events, &tx)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(?limit, "answer stream exceeded its time limit");
                abort(&tx, RelayError::TimedOut(limit)).await
            }
        },
    };

    match outcome {
        Outcome::Closed { chunks } => tracing::info!(chunks, "answer stream closed"),
        Outcome::Aborted => tracing::info!("answer stream aborted"),
        Outcome::Disconnected => tracing::info!("client disconnected; upstream dropped"),
    }
    outcome
}

async fn pump(events: &mut ModelEvents, tx: &FrameSender) -> Outcome {
    let mut chunks = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = tx.closed() => return Outcome::Disconnected,
            next = events.next() => next,
        };

        match next {
            // an empty data frame would read as end of body on the wire
            Some(Ok(ModelEvent::TextDelta(text))) if !text.is_empty() => {
                if tx.send(Ok(Frame::data(Bytes::from(text)))).await.is_err() {
                    return Outcome::Disconnected;
                }
                chunks += 1;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                tracing::warn!(error = %err, retryable = err.is_retryable(), chunks, "upstream failed mid-stream");
                return abort(tx, RelayError::Upstream(err)).await;
            }
            None => return Outcome::Closed { chunks },
        }
    }
}

async fn abort(tx: &FrameSender, err: RelayError) -> Outcome {
    match tx.send(Err(err)).await {
        Ok(()) => Outcome::Aborted,
        Err(_) => Outcome::Disconnected,
    }
}
