//! # JSON-RPC HTTP Prelude
//!
//! ```rust
//! use turul_jsonrpc_http::prelude::*;
//! ```

pub use crate::cors::CorsLayer;
pub use crate::handler::JsonRpcHttpHandler;
pub use crate::server::{JsonRpcHttpServer, JsonRpcHttpServerBuilder, ServerConfig};

// Engine wiring types
pub use turul_jsonrpc_engine::prelude::*;

// Error types
pub use crate::{HttpError, Result};
