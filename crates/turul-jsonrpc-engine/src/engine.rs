//! The JSON-RPC protocol state machine.
//!
//! One incoming JSON value is parsed, classified as a single request or a batch,
//! validated, dispatched through the [`HandlerRegistry`] and rendered back as a
//! [`ResponseBody`]. Batches are dispatched concurrently and answered in request
//! order.

use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::error::{HandlerError, JsonRpcException, RegistryError};
use crate::error_codes;
use crate::registration::Registration;
use crate::registry::{Handler, HandlerRegistry, Unregisterable};
use crate::request::{Field, RequestEnvelope, value_type};
use crate::response::{ErrorResponse, Response, ResponseBody};
use crate::transport::{BodyWriter, CompletionHook, ResponseGuard, ResponseSink};

/// HTTP-style status used for every protocol outcome
pub const RESPONSE_STATUS: u16 = 200;

/// Dispatches JSON-RPC requests to registered handlers
#[derive(Debug, Clone)]
pub struct JsonRpcEngine {
    config: Arc<EngineConfig>,
    registry: HandlerRegistry,
}

impl Default for JsonRpcEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl JsonRpcEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(config, HandlerRegistry::new())
    }

    /// Share an existing registry, e.g. one populated by a wiring layer
    pub fn with_registry(config: EngineConfig, registry: HandlerRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn register(&self, registration: Registration) -> Result<Unregisterable, RegistryError> {
        self.registry.register(registration)
    }

    /// Transport entry point.
    ///
    /// Reads one JSON value from `reader` and answers through `sink` exactly once.
    /// A parse failure is answered immediately and `completion` is never consulted.
    /// Otherwise `completion` is asked for a hook: with one, dispatch continues in
    /// the background and the hook runs after the sink; without one, this call
    /// waits up to the configured timeout and answers "Execution timed-out" if the
    /// result is late. Handler panics never reach the caller.
    pub async fn handle<R, S, C>(&self, reader: R, sink: S, completion: C)
    where
        R: io::Read,
        S: ResponseSink + 'static,
        C: FnOnce() -> Option<CompletionHook>,
    {
        let request: Value = match serde_json::from_reader(reader) {
            Ok(request) => request,
            Err(e) => {
                debug!("Rejecting unparsable JSON-RPC payload: {}", e);
                sink.send(RESPONSE_STATUS, BodyWriter::new(self.parse_failure(&e).into()));
                return;
            }
        };

        let hook = completion();
        let asynchronous = hook.is_some();
        let guard = Arc::new(ResponseGuard::new(Arc::new(sink), hook));

        let engine = self.clone();
        let task_guard = Arc::clone(&guard);
        let task = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(engine.prepare_result_chain(request))
                .catch_unwind()
                .await;
            let body = match outcome {
                Ok(body) => body,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("JSON-RPC dispatch panicked: {}", message);
                    engine.create_response(error_codes::INTERNAL_ERROR, message).into()
                }
            };
            task_guard.respond(RESPONSE_STATUS, body);
        });

        if asynchronous {
            return;
        }

        match tokio::time::timeout(self.config.timeout(), task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_error)) => {
                // A panicking sink or a cancelled task
                error!("JSON-RPC dispatch task failed: {}", join_error);
                if !guard.has_responded() {
                    let response = self.create_response(error_codes::INTERNAL_ERROR, "Execution failed");
                    guard.respond(RESPONSE_STATUS, response.into());
                }
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.timeout_ms,
                    "JSON-RPC execution timed out"
                );
                let response = self.create_response(error_codes::INTERNAL_ERROR, "Execution timed-out");
                guard.respond(RESPONSE_STATUS, response.into());
            }
        }
    }

    /// Parse and dispatch `input` without a transport
    pub async fn handle_str(&self, input: &str) -> ResponseBody {
        match serde_json::from_str::<Value>(input) {
            Ok(request) => self.prepare_result_chain(request).await,
            Err(e) => self.parse_failure(&e).into(),
        }
    }

    /// Dispatch an already parsed request or batch
    pub async fn prepare_result_chain(&self, request: Value) -> ResponseBody {
        match request {
            Value::Object(object) => self.handle_request(&object).await.into(),
            Value::Array(items) => {
                let responses = join_all(items.iter().map(|item| async move {
                    match item {
                        Value::Object(object) => self.handle_request(object).await,
                        _ => Response::failure(
                            self.version(),
                            None,
                            JsonRpcException::invalid_request("Batch requests must be JSON objects").into(),
                        ),
                    }
                }))
                .await;
                responses.into()
            }
            other => Response::failure(
                self.version(),
                None,
                JsonRpcException::invalid_request(format!(
                    "Unknown request type: {}",
                    value_type(&other)
                ))
                .into(),
            )
            .into(),
        }
    }

    /// Validate and run one request object.
    ///
    /// A panicking handler is answered with `-32603` for this request only, so
    /// its batch siblings are unaffected.
    pub async fn handle_request(&self, request: &Map<String, Value>) -> Response {
        let envelope = RequestEnvelope::new(request);
        let id = envelope.id();

        let handler = match self.validate(&envelope) {
            Ok(handler) => handler,
            Err(error) => {
                debug!("Rejecting JSON-RPC request ({}): {}", error.error_code(), error.message);
                return Response::failure(self.version(), id, error.into());
            }
        };

        let outcome = AssertUnwindSafe(async { handler.call(envelope.params()).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(result)) => Response::success(self.version(), id, result),
            Ok(Err(error)) => Response::failure(self.version(), id, on_error(error)),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(method = %handler.method(), "JSON-RPC handler panicked: {}", message);
                Response::failure(
                    self.version(),
                    id,
                    JsonRpcException::internal_error(message).into(),
                )
            }
        }
    }

    /// Error response without an `id`
    pub fn create_response(&self, code: i64, message: impl Into<String>) -> Response {
        Response::failure(self.version(), None, ErrorResponse::new(code, message))
    }

    fn validate(&self, envelope: &RequestEnvelope<'_>) -> Result<Arc<Handler>, JsonRpcException> {
        match envelope.jsonrpc() {
            Field::Missing => return Err(JsonRpcException::invalid_request("Missing jsonrpc")),
            Field::Empty => return Err(JsonRpcException::invalid_request("Empty jsonrpc")),
            Field::Present(version) if version != self.config.jsonrpc_version => {
                return Err(JsonRpcException::invalid_request("invalid jsonrpc version"));
            }
            Field::Present(_) => {}
        }

        let method = match envelope.method() {
            Field::Missing => return Err(JsonRpcException::method_not_found("Missing method")),
            Field::Empty => return Err(JsonRpcException::method_not_found("Empty method")),
            Field::Present(method) => method,
        };

        self.registry
            .lookup(method)
            .ok_or_else(|| JsonRpcException::method_not_found("Unknown method"))
    }

    fn parse_failure(&self, error: &serde_json::Error) -> Response {
        Response::failure(
            self.version(),
            None,
            JsonRpcException::parse_error(error.to_string()).into(),
        )
    }

    fn version(&self) -> &str {
        &self.config.jsonrpc_version
    }
}

/// Protocol errors keep their code; anything that escaped the exception mapper
/// is reported as an uncategorized application failure
fn on_error(error: HandlerError) -> ErrorResponse {
    match error {
        HandlerError::Rpc(exception) => exception.into(),
        other => ErrorResponse::new(error_codes::DEFAULT_APPLICATION_ERROR, other.to_string()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
