//! HTTP request handler feeding the JSON-RPC engine

use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};
use turul_jsonrpc_engine::{BodyWriter, CompletionHook, JsonRpcEngine};

use crate::{CorsLayer, HttpError, Result, ServerConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sink output: status and serialized body
type Captured = serde_json::Result<(u16, Vec<u8>)>;

/// Routes HTTP requests to a [`JsonRpcEngine`]
#[derive(Clone)]
pub struct JsonRpcHttpHandler {
    pub(crate) config: Arc<ServerConfig>,
    engine: JsonRpcEngine,
}

impl JsonRpcHttpHandler {
    pub fn new(config: ServerConfig, engine: JsonRpcEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn engine(&self) -> &JsonRpcEngine {
        &self.engine
    }

    /// Handle one HTTP request, applying CORS headers when enabled
    pub async fn handle_request<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let mut response = self.route(req).await;
        if self.config.enable_cors {
            CorsLayer::apply_cors_headers(response.headers_mut());
        }
        response
    }

    async fn route<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        debug!("Handling {} {}", req.method(), req.uri().path());

        if req.uri().path() != self.config.path {
            return text_response(StatusCode::NOT_FOUND, "Not Found");
        }
        // A deactivated engine hides the endpoint
        if !self.engine.config().active {
            debug!("JSON-RPC endpoint inactive");
            return text_response(StatusCode::NOT_FOUND, "Not Found");
        }

        match *req.method() {
            Method::POST => self.handle_post(req).await,
            Method::OPTIONS => text_response(StatusCode::NO_CONTENT, ""),
            _ => {
                let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static("POST, OPTIONS"));
                response
            }
        }
    }

    async fn handle_post<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let payload = match self.read_body(req.into_body()).await {
            Ok(payload) => payload,
            Err(HttpError::BodyTooLarge(limit)) => {
                warn!("Request body exceeds {} bytes", limit);
                return text_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return text_response(StatusCode::BAD_REQUEST, "Failed to read request body");
            }
        };
        debug!("Received JSON-RPC payload of {} bytes", payload.len());

        match self.dispatch(&payload).await {
            Ok((status, body)) => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
                let mut response = Response::new(Full::new(Bytes::from(body)));
                *response.status_mut() = status;
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(err) => {
                error!("JSON-RPC dispatch failed: {}", err);
                text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    async fn read_body<B>(&self, body: B) -> Result<Bytes>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let limit = self.config.max_body_size;
        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(err) if err.is::<LengthLimitError>() => Err(HttpError::BodyTooLarge(limit)),
            Err(err) => Err(HttpError::Body(err.to_string())),
        }
    }

    /// Run the engine and wait for its single response.
    ///
    /// With `async_dispatch` the engine completes in the background and signals
    /// through a hook; otherwise it answers within its own timeout.
    async fn dispatch(&self, payload: &[u8]) -> Result<(u16, Vec<u8>)> {
        let (body_tx, body_rx) = oneshot::channel::<Captured>();
        let body_tx = Mutex::new(Some(body_tx));
        let sink = move |status: u16, body: BodyWriter| {
            if let Some(tx) = body_tx.lock().take() {
                let _ = tx.send(body.to_vec().map(|bytes| (status, bytes)));
            }
        };

        let async_dispatch = self.config.async_dispatch;
        self.engine
            .handle(payload, sink, move || {
                if !async_dispatch {
                    return None;
                }
                let hook: CompletionHook = Box::new(|| debug!("JSON-RPC response complete"));
                Some(hook)
            })
            .await;

        match body_rx.await {
            Ok(captured) => Ok(captured?),
            Err(_) => Err(HttpError::NoResponse),
        }
    }
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
