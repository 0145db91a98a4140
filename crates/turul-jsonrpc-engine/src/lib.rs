//! # JSON-RPC 2.0 Dispatch Engine
//!
//! A transport-agnostic JSON-RPC 2.0 engine: a concurrent registry of typed
//! handlers and the protocol state machine that validates requests, binds
//! parameters, invokes handlers and renders responses.
//!
//! ## Features
//! - Single and batch requests, batch responses in request order
//! - Positional and named parameter binding with required/optional semantics
//! - Synchronous and asynchronous handlers behind one completion type
//! - Declarative error-kind to error-code mappings per method
//! - Timeout fallback for transports without asynchronous completion
//! - Self-description of registered methods and Asciidoc rendering
//!
//! ```rust
//! use turul_jsonrpc_engine::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = JsonRpcEngine::default();
//! engine
//!     .register(
//!         Registration::builder("test1")
//!             .returns(ReturnType::of::<String>())
//!             .invoke(|_| Invocation::ready("done_1".to_string()))
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let body = engine.handle_str(r#"{"jsonrpc":"2.0","method":"test1"}"#).await;
//! assert_eq!(body.to_json_string().unwrap(), r#"{"jsonrpc":"2.0","result":"done_1"}"#);
//! # }
//! ```

pub mod config;
pub mod documentation;
pub mod engine;
pub mod error;
pub mod kind;
pub mod prelude;
pub mod registration;
pub mod registry;
pub mod request;
pub mod response;
pub mod specification;
pub mod transport;

// Re-export main types
pub use config::EngineConfig;
pub use engine::JsonRpcEngine;
pub use error::{HandlerError, JsonRpcErrorCode, JsonRpcException, RegistryError};
pub use kind::ErrorKind;
pub use registration::{
    Arguments, ExceptionMapping, Invocation, Parameter, Registration, ReturnType,
};
pub use registry::{HandlerRegistry, Unregisterable};
pub use request::JsonRpcRequest;
pub use response::{ErrorResponse, Response, ResponseBody};
pub use specification::Specification;
pub use transport::{BodyWriter, CompletionHook, ResponseSink};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Result type for registration operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;

    /// Failures that reach the response without passing an exception mapper
    pub const DEFAULT_APPLICATION_ERROR: i64 = SERVER_ERROR_START;
}
