//! # JSON-RPC Engine Prelude
//!
//! Convenient re-exports of the types needed to register methods and drive
//! the engine.
//!
//! ```rust
//! use turul_jsonrpc_engine::prelude::*;
//! ```

// Wiring
pub use crate::kind::{self, ErrorKind};
pub use crate::registration::{
    Arguments, ExceptionMapping, Invocation, Parameter, Registration, ReturnType,
};
pub use crate::registry::{HandlerRegistry, Unregisterable};

// Engine and transport boundary
pub use crate::config::EngineConfig;
pub use crate::engine::JsonRpcEngine;
pub use crate::transport::{BodyWriter, CompletionHook, ResponseSink};

// Wire types and errors
pub use crate::error::{HandlerError, JsonRpcErrorCode, JsonRpcException, RegistryError};
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{ErrorResponse, Response, ResponseBody};

// Standard error codes
pub use crate::error_codes::*;
