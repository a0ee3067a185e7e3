//! HTTP surface: routing, the ask endpoint and the static front end.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::apod::{APOD_ERROR, ApodProxy};
use crate::config::RelayConfig;
use crate::error::{AskError, BoxError, PROCESSING_ERROR};
use crate::page;
use crate::relay::{RelayBody, relay};
use crate::upstream::{ClaudeSource, ModelSource};
use crate::validate::parse_ask;

/// Everything a request handler needs. Shared read-only between requests.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn ModelSource>,
    apod: ApodProxy,
    stream_limit: Option<Duration>,
}

impl AppState {
    pub fn new(source: Arc<dyn ModelSource>, apod: ApodProxy) -> Self {
        Self {
            source,
            apod,
            stream_limit: None,
        }
    }

    #[must_use]
    pub fn with_stream_limit(mut self, limit: Option<Duration>) -> Self {
        self.stream_limit = limit;
        self
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            Arc::new(ClaudeSource::from_config(config)),
            ApodProxy::from_config(config),
        )
        .with_stream_limit(config.stream_limit())
    }
}

/// Accepts HTTP/1.1 connections until the listener fails.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let state = Arc::new(state);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) if is_transient(&err) => {
                tracing::warn!(error = %err, "failed to accept connection");
                continue;
            }
            Err(err) => return Err(err),
        };

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, Arc::clone(&state)));
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%peer, error = %err, "connection closed with error");
            }
        });
    }
}

fn is_transient(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted
    )
}

/// Routes one request.
pub async fn handle<B>(req: Request<B>, state: Arc<AppState>) -> Result<Response<RelayBody>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    tracing::debug!(%method, %path, "request");

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/api/ask") => ask(req, &state).await,
        (&Method::POST, "/api/render") => render(req).await,
        (&Method::GET, "/api/apod") => apod(&state).await,
        (&Method::GET, path) => match page::asset(path) {
            Some(asset) => full(StatusCode::OK, asset.content_type, asset.body),
            None => not_found(),
        },
        _ => not_found(),
    };
    Ok(response)
}

async fn ask<B>(req: Request<B>, state: &AppState) -> Response<RelayBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    match open_answer(req, state).await {
        Ok(body) => answer_response(body),
        Err(err @ AskError::Validation(_)) => {
            tracing::info!(reason = %err, "ask rejected");
            json_error(err.status_code(), &err.public_message())
        }
        Err(err @ AskError::UpstreamOpen(_)) => {
            if let AskError::UpstreamOpen(upstream) = &err {
                tracing::error!(error = %upstream, retryable = upstream.is_retryable(), "upstream stream could not be opened");
            }
            json_error(err.status_code(), &err.public_message())
        }
        Err(err) => {
            tracing::error!(error = %err, "ask failed before streaming");
            json_error(err.status_code(), &err.public_message())
        }
    }
}

/// Validates the ask and opens the upstream stream. The status of the
/// response is decided here; nothing after this point can change it.
async fn open_answer<B>(req: Request<B>, state: &AppState) -> Result<RelayBody, AskError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let bytes = read_body(req).await.map_err(AskError::Body)?;
    let ask = parse_ask(&bytes)?;
    tracing::info!(question_len = ask.question.len(), image_url = %ask.image_url, "ask accepted");

    let events = state.source.open(&ask).await.map_err(AskError::UpstreamOpen)?;
    let (body, _forwarding) = relay(events, state.stream_limit);
    Ok(body)
}

fn answer_response(body: RelayBody) -> Response<RelayBody> {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

async fn render<B>(req: Request<B>) -> Response<RelayBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    match read_body(req).await {
        Ok(bytes) => {
            let html = answer_ox::render_markdown(&String::from_utf8_lossy(&bytes));
            full(StatusCode::OK, "text/html; charset=utf-8", html)
        }
        Err(err) => {
            tracing::error!(error = %err, "could not read render body");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR)
        }
    }
}

async fn apod(state: &AppState) -> Response<RelayBody> {
    match state.apod.fetch().await {
        Ok(document) => json(StatusCode::OK, &document),
        Err(err) => {
            tracing::error!(error = %err, "image of the day fetch failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, APOD_ERROR)
        }
    }
}

async fn read_body<B>(req: Request<B>) -> Result<Bytes, BoxError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let collected = req.into_body().collect().await.map_err(Into::<BoxError>::into)?;
    Ok(collected.to_bytes())
}

fn full(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<RelayBody> {
    let body = Full::new(body.into()).map_err(|never| match never {}).boxed();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn json(status: StatusCode, value: &Value) -> Response<RelayBody> {
    full(status, "application/json", value.to_string())
}

fn json_error(status: StatusCode, message: &str) -> Response<RelayBody> {
    json(status, &json!({ "error": message }))
}

fn not_found() -> Response<RelayBody> {
    full(StatusCode::NOT_FOUND, "text/plain; charset=utf-8", "Not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::upstream::{ModelEvent, ModelEvents};
    use crate::validate::AskRequest;
    use async_trait::async_trait;
    use futures_util::{StreamExt, stream};

    struct Echo;

    #[async_trait]
    impl ModelSource for Echo {
        async fn open(&self, ask: &AskRequest) -> Result<ModelEvents, UpstreamError> {
            let events = vec![
                Ok(ModelEvent::Other),
                Ok(ModelEvent::TextDelta(ask.question.clone())),
            ];
            Ok(stream::iter(events).boxed())
        }
    }

    struct Refuses;

    #[async_trait]
    impl ModelSource for Refuses {
        async fn open(&self, _ask: &AskRequest) -> Result<ModelEvents, UpstreamError> {
            Err(UpstreamError::Source("invalid x-api-key".into()))
        }
    }

    fn state(source: impl ModelSource + 'static) -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(source),
            ApodProxy::new("http://127.0.0.1:1/apod", "DEMO_KEY"),
        ))
    }

    fn request(method: Method, path: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_owned())))
            .unwrap()
    }

    async fn body_text(response: Response<RelayBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn valid_ask_streams_plain_text() {
        let req = request(
            Method::POST,
            "/api/ask",
            r#"{"question":"Is it a comet?","imageUrl":"https://example.com/c.jpg"}"#,
        );
        let response = handle(req, state(Echo)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "Is it a comet?");
    }

    #[tokio::test]
    async fn open_failure_is_a_processing_error() {
        let req = request(
            Method::POST,
            "/api/ask",
            r#"{"question":"Is it a comet?","imageUrl":"https://example.com/c.jpg"}"#,
        );
        let response = handle(req, state(Refuses)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_text(response).await, r#"{"error":"Error processing request"}"#);
    }

    #[tokio::test]
    async fn validation_errors_are_json() {
        let req = request(Method::POST, "/api/ask", r#"{"question":"Why?"}"#);
        let response = handle(req, state(Echo)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"error":"Image is required"}"#);
    }

    #[tokio::test]
    async fn render_sanitizes_markdown() {
        let req = request(Method::POST, "/api/render", "# Title\n<img src=x onerror=alert(1)>");
        let response = handle(req, state(Echo)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<h1>Title</h1>"));
        assert!(!html.contains("onerror"));
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        for (method, path) in [
            (Method::GET, "/nonexistent"),
            (Method::GET, "/api/ask"),
            (Method::PUT, "/"),
            (Method::POST, "/api/apod"),
        ] {
            let response = handle(request(method.clone(), path, ""), state(Echo)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {path}");
            assert_eq!(body_text(response).await, "Not found");
        }
    }

    #[tokio::test]
    async fn pages_carry_their_content_type() {
        for (path, content_type) in [
            ("/", "text/html; charset=utf-8"),
            ("/about", "text/html; charset=utf-8"),
            ("/client.js", "application/javascript; charset=utf-8"),
            ("/styles.css", "text/css; charset=utf-8"),
        ] {
            let response = handle(request(Method::GET, path, ""), state(Echo)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
            assert_eq!(response.headers()[header::CONTENT_TYPE], content_type);
        }
    }
}
